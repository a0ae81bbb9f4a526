use time::UtcOffset;
use tracing::trace;

use crate::config::EncoderConfig;
use crate::error::{Error, Result};
use crate::types::{ColVal, ColumnId, Datum, Handle};

use super::value::{decode_datum, encode_datum, flatten, var, FLAG_NIL};
use super::{RowChecksum, RowEncoder};

/// First byte of every compact row. Legacy rows start with a datum flag, which
/// is always below this value.
pub const COMPACT_ROW_VERSION: u8 = 0x80;
const ROW_FLAG_CHECKSUM: u8 = 0x01;
const CHECKSUM_LEN: usize = 4;

/// Default [`RowEncoder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StdRowEncoder;

impl RowEncoder for StdRowEncoder {
    fn encode_row(
        &self,
        loc: UtcOffset,
        row: &[ColVal],
        buf: &mut Vec<u8>,
        values: &mut Vec<Datum>,
        checksum: Option<&RowChecksum<'_>>,
        cfg: &EncoderConfig,
    ) -> Result<()> {
        if !cfg.compact {
            if checksum.is_some() {
                trace!(cols = row.len(), "rowbuf.codec.legacy_checksum_skipped");
            }
            return self.encode_legacy(loc, row, buf, values);
        }
        buf.clear();
        interleave(loc, row, values)?;
        buf.push(COMPACT_ROW_VERSION);
        buf.push(if checksum.is_some() {
            ROW_FLAG_CHECKSUM
        } else {
            0
        });
        var::encode_u64(row.len() as u64, buf);
        for pair in values[..row.len() * 2].chunks_exact(2) {
            if let Datum::Int(id) = pair[0] {
                var::encode_i64(id, buf);
            }
            encode_datum(&pair[1], buf);
        }
        if let Some(RowChecksum::Raw { handle }) = checksum {
            let crc = row_crc32(handle, buf);
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        trace!(
            cols = row.len(),
            bytes = buf.len(),
            checksum = checksum.is_some(),
            "rowbuf.codec.encode_compact"
        );
        Ok(())
    }

    fn encode_legacy(
        &self,
        loc: UtcOffset,
        row: &[ColVal],
        buf: &mut Vec<u8>,
        values: &mut Vec<Datum>,
    ) -> Result<()> {
        buf.clear();
        if row.is_empty() {
            buf.push(FLAG_NIL);
            return Ok(());
        }
        interleave(loc, row, values)?;
        for datum in &values[..row.len() * 2] {
            encode_datum(datum, buf);
        }
        trace!(cols = row.len(), bytes = buf.len(), "rowbuf.codec.encode_legacy");
        Ok(())
    }
}

/// Writes `[Int(id_1), v_1, Int(id_2), v_2, ...]` into the front of `values`.
fn interleave(loc: UtcOffset, row: &[ColVal], values: &mut Vec<Datum>) -> Result<()> {
    let needed = row.len() * 2;
    if values.len() < needed {
        values.resize(needed, Datum::Null);
    }
    for (i, col) in row.iter().enumerate() {
        values[2 * i] = Datum::Int(col.id.0);
        values[2 * i + 1] = flatten(loc, col.id, &col.value)?;
    }
    Ok(())
}

fn row_crc32(handle: &Handle, body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    match handle {
        Handle::Int(v) => hasher.update(&Handle::int_bytes(*v)),
        Handle::Common(bytes) => hasher.update(bytes),
    }
    hasher.update(body);
    hasher.finalize()
}

/// Decodes a row written by [`StdRowEncoder`] in either format.
///
/// Timestamps are returned in `loc`. When the row carries a checksum and
/// `handle` is given, the checksum is verified against it.
pub fn decode_row(bytes: &[u8], loc: UtcOffset, handle: Option<&Handle>) -> Result<Vec<ColVal>> {
    match bytes.first() {
        None => Err(Error::Corruption("row value empty")),
        Some(&COMPACT_ROW_VERSION) => decode_compact(bytes, loc, handle),
        Some(_) => decode_legacy(bytes, loc),
    }
}

fn decode_legacy(bytes: &[u8], loc: UtcOffset) -> Result<Vec<ColVal>> {
    if bytes == [FLAG_NIL] {
        return Ok(Vec::new());
    }
    let mut off = 0usize;
    let mut cols = Vec::new();
    while off < bytes.len() {
        let id = match decode_datum(bytes, &mut off, loc)? {
            Datum::Int(id) => ColumnId(id),
            _ => return Err(Error::Corruption("legacy column id is not an integer")),
        };
        if off >= bytes.len() {
            return Err(Error::Corruption("legacy row missing value"));
        }
        let value = decode_datum(bytes, &mut off, loc)?;
        cols.push(ColVal::new(id, value));
    }
    Ok(cols)
}

fn decode_compact(bytes: &[u8], loc: UtcOffset, handle: Option<&Handle>) -> Result<Vec<ColVal>> {
    let flags = *bytes
        .get(1)
        .ok_or(Error::Corruption("compact row flags missing"))?;
    let body = if flags & ROW_FLAG_CHECKSUM != 0 {
        if bytes.len() < 2 + CHECKSUM_LEN {
            return Err(Error::Corruption("compact row checksum truncated"));
        }
        let (body, footer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if let Some(handle) = handle {
            let mut arr = [0u8; CHECKSUM_LEN];
            arr.copy_from_slice(footer);
            if u32::from_be_bytes(arr) != row_crc32(handle, body) {
                return Err(Error::Corruption("row checksum mismatch"));
            }
        }
        body
    } else {
        bytes
    };
    let mut off = 2usize;
    let count = var::decode_u64(body, &mut off)? as usize;
    let mut cols = Vec::with_capacity(count.min(body.len()));
    for _ in 0..count {
        let id = ColumnId(var::decode_i64(body, &mut off)?);
        let value = decode_datum(body, &mut off, loc)?;
        cols.push(ColVal::new(id, value));
    }
    if off != body.len() {
        return Err(Error::Corruption("compact row has trailing bytes"));
    }
    Ok(cols)
}
