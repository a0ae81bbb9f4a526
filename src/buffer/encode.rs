use time::UtcOffset;
use tracing::{debug, trace};

use crate::codec::{RowChecksum, RowEncoder};
use crate::config::RowEncodingConfig;
use crate::errctx::ErrorHandler;
use crate::error::Result;
use crate::kv::{FlagsOp, MemBuffer};
use crate::types::{ColVal, ColumnId, Datum, Handle};

use super::reuse::ensure_capacity_and_reset;
use super::scratch::StmtBufs;

/// Encoder, configuration and session offset used to encode rows of one table.
#[derive(Clone, Copy)]
pub struct EncodeCtx<'a> {
    /// Row encoding configuration of the table.
    pub cfg: &'a RowEncodingConfig,
    /// Encoder that owns the byte format.
    pub encoder: &'a dyn RowEncoder,
    /// Session offset used to normalise timestamps.
    pub loc: UtcOffset,
}

impl<'a> EncodeCtx<'a> {
    /// Bundles the encoding inputs.
    pub fn new(cfg: &'a RowEncodingConfig, encoder: &'a dyn RowEncoder, loc: UtcOffset) -> Self {
        Self { cfg, encoder, loc }
    }
}

/// Staging handle for one row on its way into the write buffer.
///
/// Obtained from [`super::MutationBufferPool::encode_buffer`]. Holding the
/// handle keeps the pool mutably borrowed, so a second acquisition cannot
/// alias this row. [`EncodeRowBuffer::write_encoded`] consumes the handle.
#[derive(Debug)]
pub struct EncodeRowBuffer<'p> {
    row: &'p mut Vec<ColVal>,
}

impl<'p> EncodeRowBuffer<'p> {
    pub(crate) fn acquire(row: &'p mut Vec<ColVal>, capacity: usize) -> Self {
        let mut buffer = Self { row };
        buffer.reset(capacity);
        buffer
    }

    /// Clears the staged row, keeping room for at least `capacity` columns.
    pub fn reset(&mut self, capacity: usize) {
        if ensure_capacity_and_reset(self.row, 0, Some(capacity)) {
            debug!(capacity = self.row.capacity(), "rowbuf.encode.grow");
        }
    }

    /// Appends a column. Ids are not checked for uniqueness.
    pub fn add_col_val(&mut self, id: ColumnId, value: Datum) {
        self.row.push(ColVal::new(id, value));
    }

    /// Columns staged since the last reset, in insertion order.
    pub fn columns(&self) -> &[ColVal] {
        self.row.as_slice()
    }

    /// Number of staged columns.
    pub fn len(&self) -> usize {
        self.row.len()
    }

    /// Returns true if no column has been staged.
    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// Capacity of the backing storage.
    pub fn capacity(&self) -> usize {
        self.row.capacity()
    }

    /// Encodes the staged row and stages it in `store` under `key`.
    ///
    /// A checksum bound to `handle` is requested when the configuration
    /// enables row-level checksums. The encoded bytes stay in
    /// `scratch.row_val_buf` so the next row reuses the allocation. An
    /// encoding failure goes through `ec`; if `ec` suppresses it the store
    /// still receives the write with an empty value and decides the outcome
    /// ([`crate::InMemoryBuffer`] rejects it). With empty `flags` the row is
    /// written with [`MemBuffer::set`], otherwise with
    /// [`MemBuffer::set_with_flags`]. Store errors are returned unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn write_encoded(
        self,
        ctx: &EncodeCtx<'_>,
        scratch: &mut StmtBufs,
        ec: &mut dyn ErrorHandler,
        store: &mut dyn MemBuffer,
        key: &[u8],
        handle: &Handle,
        flags: &[FlagsOp],
    ) -> Result<()> {
        let checksum = ctx
            .cfg
            .row_level_checksum
            .then_some(RowChecksum::Raw { handle });

        // Null columns may be skipped by the caller, so the row length varies
        // between calls; the interleaved layout needs exactly two slots per column.
        ensure_capacity_and_reset(&mut scratch.add_row_values, self.row.len() * 2, None);

        let encoded = ctx.encoder.encode_row(
            ctx.loc,
            self.row.as_slice(),
            &mut scratch.row_val_buf,
            &mut scratch.add_row_values,
            checksum.as_ref(),
            &ctx.cfg.encoder,
        );
        if let Err(err) = encoded {
            ec.handle_error(err)?;
            // A suppressed failure still reaches the store, with no bytes.
            scratch.row_val_buf.clear();
            debug!(cols = self.row.len(), handle = %handle, "rowbuf.encode.write_suppressed");
        }

        debug!(
            cols = self.row.len(),
            bytes = scratch.row_val_buf.len(),
            flags = flags.len(),
            checksum = checksum.is_some(),
            "rowbuf.encode.write"
        );
        if flags.is_empty() {
            store.set(key, &scratch.row_val_buf)
        } else {
            store.set_with_flags(key, &scratch.row_val_buf, flags)
        }
    }

    /// Encodes the staged row in the legacy format for the replication log.
    ///
    /// The result owns its memory and shares nothing with pooled storage, so
    /// it can be cached or modified freely. This does not end the cycle: the
    /// same row can still be written with [`Self::write_encoded`]. If `ec`
    /// suppresses an encoding failure the result is empty.
    pub fn encode_for_replication_log(
        &self,
        ctx: &EncodeCtx<'_>,
        ec: &mut dyn ErrorHandler,
    ) -> Result<Vec<u8>> {
        let mut value = Vec::new();
        let mut values = Vec::new();
        match ctx
            .encoder
            .encode_legacy(ctx.loc, self.row.as_slice(), &mut value, &mut values)
        {
            Ok(()) => {
                trace!(cols = self.row.len(), bytes = value.len(), "rowbuf.encode.replication_log");
                Ok(value)
            }
            Err(err) => {
                ec.handle_error(err)?;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::codec::{decode_row, StdRowEncoder};
    use crate::config::EncoderConfig;
    use crate::errctx::{ErrorContext, ErrorLevel};
    use crate::error::Error;
    use crate::kv::InMemoryBuffer;

    /// Records what the encoder was handed instead of encoding anything real.
    #[derive(Default)]
    struct RecordingEncoder {
        calls: RefCell<Vec<(Vec<ColVal>, usize, bool)>>,
    }

    impl RowEncoder for RecordingEncoder {
        fn encode_row(
            &self,
            _loc: UtcOffset,
            row: &[ColVal],
            buf: &mut Vec<u8>,
            values: &mut Vec<Datum>,
            checksum: Option<&RowChecksum<'_>>,
            _cfg: &EncoderConfig,
        ) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((row.to_vec(), values.len(), checksum.is_some()));
            buf.clear();
            buf.push(row.len() as u8);
            Ok(())
        }

        fn encode_legacy(
            &self,
            _loc: UtcOffset,
            _row: &[ColVal],
            buf: &mut Vec<u8>,
            _values: &mut Vec<Datum>,
        ) -> Result<()> {
            buf.push(0xEE);
            Ok(())
        }
    }

    /// Accepts every write, including empty values.
    #[derive(Default)]
    struct RecordingStore {
        writes: Vec<(Vec<u8>, Vec<u8>, Vec<FlagsOp>)>,
    }

    impl MemBuffer for RecordingStore {
        fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
            self.set_with_flags(key, value, &[])
        }

        fn set_with_flags(&mut self, key: &[u8], value: &[u8], flags: &[FlagsOp]) -> Result<()> {
            self.writes
                .push((key.to_vec(), value.to_vec(), flags.to_vec()));
            Ok(())
        }
    }

    fn staged<'a>(row: &'a mut Vec<ColVal>, cols: &[(i64, Datum)]) -> EncodeRowBuffer<'a> {
        let mut buffer = EncodeRowBuffer::acquire(row, cols.len());
        for (id, value) in cols {
            buffer.add_col_val(ColumnId(*id), value.clone());
        }
        buffer
    }

    #[test]
    fn encoder_sees_columns_in_order_and_sized_scratch() {
        let cfg = RowEncodingConfig::new().row_level_checksum(true);
        let encoder = RecordingEncoder::default();
        let ctx = EncodeCtx::new(&cfg, &encoder, UtcOffset::UTC);
        let mut scratch = StmtBufs::new();
        scratch.add_row_values.resize(10, Datum::Int(0));
        let mut store = InMemoryBuffer::new();
        let mut storage = Vec::new();

        staged(&mut storage, &[(3, Datum::Int(1)), (1, Datum::Int(2)), (3, Datum::Int(9))])
            .write_encoded(
                &ctx,
                &mut scratch,
                &mut ErrorContext::strict(),
                &mut store,
                b"k",
                &Handle::Int(1),
                &[],
            )
            .unwrap();

        let calls = encoder.calls.borrow();
        let (cols, values_len, with_checksum) = &calls[0];
        let ids: Vec<i64> = cols.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![3, 1, 3]);
        assert_eq!(*values_len, 6);
        assert!(*with_checksum);
        assert_eq!(scratch.add_row_values.len(), 6);
        assert_eq!(store.get(b"k").unwrap().value, vec![3]);
    }

    #[test]
    fn encoded_bytes_stay_in_scratch() {
        let cfg = RowEncodingConfig::new();
        let ctx = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
        let mut scratch = StmtBufs::new();
        let mut store = InMemoryBuffer::new();
        let mut storage = Vec::new();

        staged(&mut storage, &[(1, Datum::from("a")), (2, Datum::from("b"))])
            .write_encoded(
                &ctx,
                &mut scratch,
                &mut ErrorContext::strict(),
                &mut store,
                b"row",
                &Handle::Int(7),
                &[],
            )
            .unwrap();
        assert_eq!(store.get(b"row").unwrap().value, scratch.row_val_buf);
        let decoded = decode_row(&scratch.row_val_buf, UtcOffset::UTC, None).unwrap();
        assert_eq!(decoded[1], ColVal::new(ColumnId(2), Datum::from("b")));
    }

    #[test]
    fn suppressed_encode_error_leaves_the_verdict_to_the_store() {
        let cfg = RowEncodingConfig::new();
        let ctx = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
        let mut scratch = StmtBufs::new();
        scratch.row_val_buf.extend_from_slice(b"previous row");
        let mut store = InMemoryBuffer::new();
        let mut ec = ErrorContext::new(ErrorLevel::Ignore);
        let mut storage = Vec::new();

        let err = staged(&mut storage, &[(1, Datum::Float(f64::NAN))])
            .write_encoded(&ctx, &mut scratch, &mut ec, &mut store, b"k", &Handle::Int(1), &[])
            .unwrap_err();
        assert_eq!(err, Error::EmptyValue(b"k".to_vec()));
        assert!(store.is_empty());
        assert!(scratch.row_val_buf.is_empty());
    }

    #[test]
    fn suppressed_encode_error_is_forwarded_with_empty_value() {
        let cfg = RowEncodingConfig::new();
        let ctx = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
        let mut scratch = StmtBufs::new();
        let mut store = RecordingStore::default();
        let mut ec = ErrorContext::new(ErrorLevel::Warn);
        let mut storage = Vec::new();

        staged(&mut storage, &[(1, Datum::Float(f64::NAN))])
            .write_encoded(
                &ctx,
                &mut scratch,
                &mut ec,
                &mut store,
                b"k",
                &Handle::Int(1),
                &[FlagsOp::AssertNotExist],
            )
            .unwrap();
        assert_eq!(
            store.writes,
            vec![(b"k".to_vec(), Vec::new(), vec![FlagsOp::AssertNotExist])]
        );
        assert_eq!(ec.warnings().len(), 1);
    }

    #[test]
    fn propagated_encode_error_is_returned() {
        let cfg = RowEncodingConfig::new();
        let ctx = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
        let mut storage = Vec::new();
        let err = staged(&mut storage, &[(8, Datum::Float(f64::INFINITY))])
            .write_encoded(
                &ctx,
                &mut StmtBufs::new(),
                &mut ErrorContext::strict(),
                &mut InMemoryBuffer::new(),
                b"k",
                &Handle::Int(1),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { column: 8, .. }));
    }

    #[test]
    fn replication_log_output_is_independent() {
        let cfg = RowEncodingConfig::new();
        let ctx = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
        let mut storage = Vec::new();
        let buffer = staged(&mut storage, &[(1, Datum::Int(5))]);
        let mut ec = ErrorContext::strict();
        let mut first = buffer.encode_for_replication_log(&ctx, &mut ec).unwrap();
        let expected = first.clone();
        first.clear();
        first.extend_from_slice(b"garbage");
        assert_eq!(buffer.encode_for_replication_log(&ctx, &mut ec).unwrap(), expected);
        assert_eq!(buffer.columns(), &[ColVal::new(ColumnId(1), Datum::Int(5))]);
    }

    #[test]
    fn suppressed_replication_log_error_yields_empty_value() {
        let cfg = RowEncodingConfig::new();
        let ctx = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
        let mut storage = Vec::new();
        let buffer = staged(&mut storage, &[(1, Datum::Float(f64::NAN))]);
        let mut ec = ErrorContext::new(ErrorLevel::Ignore);
        assert!(buffer
            .encode_for_replication_log(&ctx, &mut ec)
            .unwrap()
            .is_empty());
    }
}
