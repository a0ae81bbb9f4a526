use crate::types::Datum;

/// Per-statement scratch memory shared by the write path.
///
/// Owned by the statement context and lent to each operation that needs it.
/// The encode path reuses `row_val_buf` for encoded bytes and `add_row_values`
/// for the interleaved id/value sequence; index maintenance uses the other two.
#[derive(Debug, Default)]
pub struct StmtBufs {
    /// Encoded row bytes of the most recent write.
    pub row_val_buf: Vec<u8>,
    /// Interleaved `id, value` sequence consumed by the legacy encoder.
    pub add_row_values: Vec<Datum>,
    /// Index values of the row being written.
    pub index_vals_buf: Vec<Datum>,
    /// Encoded index key.
    pub index_key_buf: Vec<u8>,
}

impl StmtBufs {
    /// Creates empty scratch buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases every scratch allocation, typically when the statement ends.
    pub fn clean(&mut self) {
        *self = Self::default();
    }
}
