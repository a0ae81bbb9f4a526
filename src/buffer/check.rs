use tracing::debug;

use crate::types::Datum;

use super::reuse::ensure_capacity_and_reset;

/// Staging handle for the values of one row under constraint check.
///
/// Obtained from [`super::MutationBufferPool::check_buffer`];
/// [`CheckRowBuffer::row_view`] consumes it.
#[derive(Debug)]
pub struct CheckRowBuffer<'p> {
    row: &'p mut Vec<Datum>,
}

impl<'p> CheckRowBuffer<'p> {
    pub(crate) fn acquire(row: &'p mut Vec<Datum>, capacity: usize) -> Self {
        let mut buffer = Self { row };
        buffer.reset(capacity);
        buffer
    }

    /// Clears the staged values, keeping room for at least `capacity` of them.
    pub fn reset(&mut self, capacity: usize) {
        if ensure_capacity_and_reset(self.row, 0, Some(capacity)) {
            debug!(capacity = self.row.capacity(), "rowbuf.check.grow");
        }
    }

    /// Appends a value.
    pub fn add_col_val(&mut self, value: Datum) {
        self.row.push(value);
    }

    /// Number of staged values.
    pub fn len(&self) -> usize {
        self.row.len()
    }

    /// Returns true if no value has been staged.
    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// Capacity of the backing storage.
    pub fn capacity(&self) -> usize {
        self.row.capacity()
    }

    /// Ends the cycle and returns the staged values as a read-only row.
    ///
    /// The view borrows pooled storage, so the pool stays locked until the
    /// view is dropped.
    pub fn row_view(self) -> RowView<'p> {
        let row: &'p Vec<Datum> = self.row;
        RowView::new(row.as_slice())
    }
}

/// Read-only positional view of a row, as consumed by constraint checks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowView<'a> {
    values: &'a [Datum],
}

impl<'a> RowView<'a> {
    /// Wraps `values` as a row.
    pub fn new(values: &'a [Datum]) -> Self {
        Self { values }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true for a row without columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at position `idx`.
    pub fn get(&self, idx: usize) -> Option<&'a Datum> {
        self.values.get(idx)
    }

    /// Returns true if position `idx` is NULL or out of range.
    pub fn is_null(&self, idx: usize) -> bool {
        self.values.get(idx).map_or(true, Datum::is_null)
    }

    /// Iterates values in column order.
    pub fn iter(&self) -> std::slice::Iter<'a, Datum> {
        self.values.iter()
    }

    /// The underlying values.
    pub fn as_slice(&self) -> &'a [Datum] {
        self.values
    }

    /// Copies the row out of pooled storage.
    pub fn to_owned_row(&self) -> Vec<Datum> {
        self.values.to_vec()
    }
}

impl<'a> IntoIterator for RowView<'a> {
    type Item = &'a Datum;
    type IntoIter = std::slice::Iter<'a, Datum>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
