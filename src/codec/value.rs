//! Datum-level encoding shared by both row formats.

use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::{Error, Result};
use crate::types::{ColumnId, Datum};

/// NULL, no payload.
pub const FLAG_NIL: u8 = 0x00;
/// ZigZag varint.
pub const FLAG_INT: u8 = 0x01;
/// Unsigned varint.
pub const FLAG_UINT: u8 = 0x02;
/// Little-endian IEEE 754 bits.
pub const FLAG_FLOAT: u8 = 0x03;
/// Varint length followed by the bytes.
pub const FLAG_BYTES: u8 = 0x04;
/// Varint length followed by UTF-8 bytes.
pub const FLAG_STR: u8 = 0x05;
/// ZigZag varint of floored microseconds since the Unix epoch (UTC), then a
/// varint of the remaining nanoseconds (`0..1000`).
pub const FLAG_TIME: u8 = 0x06;

pub mod var {
    //! Unsigned varints and ZigZag signed integers.

    use crate::error::{Error, Result};

    /// Encodes a u64 as an unsigned varint.
    pub fn encode_u64(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    /// Decodes a u64 varint from `src`, advancing `off`.
    pub fn decode_u64(src: &[u8], off: &mut usize) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        for i in 0..10 {
            let byte = *src
                .get(*off)
                .ok_or(Error::Corruption("varint truncated"))?;
            *off += 1;
            let payload = (byte & 0x7f) as u64;
            if i == 9 && payload > 1 {
                return Err(Error::Corruption("varint overflow"));
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(Error::Corruption("varint too long"))
    }

    /// Encodes an i64 as a ZigZag varint.
    pub fn encode_i64(v: i64, out: &mut Vec<u8>) {
        encode_u64(((v << 1) ^ (v >> 63)) as u64, out);
    }

    /// Decodes a ZigZag varint.
    pub fn decode_i64(src: &[u8], off: &mut usize) -> Result<i64> {
        let zigzag = decode_u64(src, off)?;
        Ok(((zigzag >> 1) as i64) ^ (-((zigzag & 1) as i64)))
    }
}

/// Normalises `datum` for persistence: timestamps move from `loc` to UTC and
/// non-finite floats are rejected.
pub fn flatten(loc: UtcOffset, column: ColumnId, datum: &Datum) -> Result<Datum> {
    match datum {
        Datum::Float(v) if !v.is_finite() => Err(Error::InvalidValue {
            column: column.0,
            reason: "non-finite float",
        }),
        Datum::Timestamp(local) => {
            let shift = Duration::seconds(i64::from(loc.whole_seconds()));
            local
                .checked_sub(shift)
                .map(Datum::Timestamp)
                .ok_or(Error::InvalidValue {
                    column: column.0,
                    reason: "timestamp out of range",
                })
        }
        other => Ok(other.clone()),
    }
}

/// Appends the flag-prefixed encoding of an already flattened datum.
pub fn encode_datum(datum: &Datum, out: &mut Vec<u8>) {
    match datum {
        Datum::Null => out.push(FLAG_NIL),
        Datum::Int(v) => {
            out.push(FLAG_INT);
            var::encode_i64(*v, out);
        }
        Datum::Uint(v) => {
            out.push(FLAG_UINT);
            var::encode_u64(*v, out);
        }
        Datum::Float(v) => {
            out.push(FLAG_FLOAT);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Datum::Bytes(v) => {
            out.push(FLAG_BYTES);
            var::encode_u64(v.len() as u64, out);
            out.extend_from_slice(v);
        }
        Datum::Str(v) => {
            out.push(FLAG_STR);
            var::encode_u64(v.len() as u64, out);
            out.extend_from_slice(v.as_bytes());
        }
        Datum::Timestamp(utc) => {
            out.push(FLAG_TIME);
            let nanos = utc.assume_utc().unix_timestamp_nanos();
            var::encode_i64(nanos.div_euclid(1_000) as i64, out);
            var::encode_u64(nanos.rem_euclid(1_000) as u64, out);
        }
    }
}

/// Decodes one datum, converting timestamps from UTC back to `loc`.
pub fn decode_datum(src: &[u8], off: &mut usize, loc: UtcOffset) -> Result<Datum> {
    let flag = *src
        .get(*off)
        .ok_or(Error::Corruption("datum flag missing"))?;
    *off += 1;
    match flag {
        FLAG_NIL => Ok(Datum::Null),
        FLAG_INT => Ok(Datum::Int(var::decode_i64(src, off)?)),
        FLAG_UINT => Ok(Datum::Uint(var::decode_u64(src, off)?)),
        FLAG_FLOAT => {
            let raw = take(src, off, 8, "float payload truncated")?;
            let mut arr = [0u8; 8];
            arr.copy_from_slice(raw);
            Ok(Datum::Float(f64::from_le_bytes(arr)))
        }
        FLAG_BYTES => {
            let len = var::decode_u64(src, off)? as usize;
            Ok(Datum::Bytes(
                take(src, off, len, "bytes payload truncated")?.to_vec(),
            ))
        }
        FLAG_STR => {
            let len = var::decode_u64(src, off)? as usize;
            let raw = take(src, off, len, "string payload truncated")?;
            let s = std::str::from_utf8(raw)
                .map_err(|_| Error::Corruption("string payload not UTF-8"))?;
            Ok(Datum::Str(s.to_owned()))
        }
        FLAG_TIME => {
            let micros = var::decode_i64(src, off)?;
            let sub_micros = var::decode_u64(src, off)?;
            if sub_micros >= 1_000 {
                return Err(Error::Corruption("timestamp nanoseconds out of range"));
            }
            let local_nanos = i128::from(micros) * 1_000
                + i128::from(sub_micros)
                + i128::from(loc.whole_seconds()) * 1_000_000_000;
            let shifted = OffsetDateTime::from_unix_timestamp_nanos(local_nanos)
                .map_err(|_| Error::Corruption("timestamp out of range"))?;
            Ok(Datum::Timestamp(PrimitiveDateTime::new(
                shifted.date(),
                shifted.time(),
            )))
        }
        _ => Err(Error::Corruption("unknown datum flag")),
    }
}

fn take<'a>(src: &'a [u8], off: &mut usize, len: usize, what: &'static str) -> Result<&'a [u8]> {
    let end = off.checked_add(len).ok_or(Error::Corruption(what))?;
    let slice = src.get(*off..end).ok_or(Error::Corruption(what))?;
    *off = end;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn roundtrip(datum: &Datum) -> Datum {
        let mut out = Vec::new();
        encode_datum(datum, &mut out);
        let mut off = 0;
        let decoded = decode_datum(&out, &mut off, UtcOffset::UTC).unwrap();
        assert_eq!(off, out.len());
        decoded
    }

    #[test]
    fn varint_boundaries() {
        for v in [0u64, 127, 128, 16_383, 16_384, u64::MAX] {
            let mut out = Vec::new();
            var::encode_u64(v, &mut out);
            let mut off = 0;
            assert_eq!(var::decode_u64(&out, &mut off).unwrap(), v);
        }
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let mut out = Vec::new();
            var::encode_i64(v, &mut out);
            let mut off = 0;
            assert_eq!(var::decode_i64(&out, &mut off).unwrap(), v);
        }
    }

    #[test]
    fn truncated_varint_is_corruption() {
        let mut off = 0;
        assert!(matches!(
            var::decode_u64(&[0x80, 0x80], &mut off),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn scalar_values_survive_encoding() {
        for datum in [
            Datum::Null,
            Datum::Int(-42),
            Datum::Uint(u64::MAX),
            Datum::Float(2.5),
            Datum::Bytes(vec![0, 1, 2]),
            Datum::Str("héllo".into()),
        ] {
            assert_eq!(roundtrip(&datum), datum);
        }
    }

    #[test]
    fn flatten_rejects_nan_and_infinity() {
        for v in [f64::NAN, f64::INFINITY] {
            let err = flatten(UtcOffset::UTC, ColumnId(4), &Datum::Float(v)).unwrap_err();
            assert_eq!(
                err,
                Error::InvalidValue {
                    column: 4,
                    reason: "non-finite float"
                }
            );
        }
    }

    #[test]
    fn timestamps_are_stored_in_utc() {
        let loc = offset!(+8);
        let local = Datum::Timestamp(datetime!(2024-03-01 10:00:00));
        let flat = flatten(loc, ColumnId(1), &local).unwrap();
        assert_eq!(flat, Datum::Timestamp(datetime!(2024-03-01 02:00:00)));

        let mut out = Vec::new();
        encode_datum(&flat, &mut out);
        let mut off = 0;
        assert_eq!(decode_datum(&out, &mut off, loc).unwrap(), local);
    }

    #[test]
    fn timestamps_keep_nanosecond_precision() {
        for ts in [
            datetime!(2024-06-01 12:00:00.123456789),
            datetime!(1969-12-31 23:59:59.9999985),
            datetime!(1900-01-01 00:00:00.000000001),
        ] {
            assert_eq!(roundtrip(&Datum::Timestamp(ts)), Datum::Timestamp(ts));
        }
    }

    #[test]
    fn pre_epoch_timestamps_floor_to_the_microsecond() {
        let mut out = Vec::new();
        encode_datum(&Datum::Timestamp(datetime!(1969-12-31 23:59:59.9999985)), &mut out);
        let mut off = 1;
        assert_eq!(var::decode_i64(&out, &mut off).unwrap(), -2);
        assert_eq!(var::decode_u64(&out, &mut off).unwrap(), 500);
    }

    #[test]
    fn oversized_sub_microsecond_part_is_corruption() {
        let mut out = vec![FLAG_TIME];
        var::encode_i64(0, &mut out);
        var::encode_u64(1_000, &mut out);
        let mut off = 0;
        assert_eq!(
            decode_datum(&out, &mut off, UtcOffset::UTC),
            Err(Error::Corruption("timestamp nanoseconds out of range"))
        );
    }

    #[test]
    fn unknown_flag_is_corruption() {
        let mut off = 0;
        assert_eq!(
            decode_datum(&[0x7f], &mut off, UtcOffset::UTC),
            Err(Error::Corruption("unknown datum flag"))
        );
    }
}
