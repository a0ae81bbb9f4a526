use tracing::trace;

use crate::types::{ColVal, Datum};

use super::check::CheckRowBuffer;
use super::encode::EncodeRowBuffer;
use super::scratch::StmtBufs;

/// Reusable row storage for insert, update and delete of table rows.
///
/// The pool owns one encode row and one check row. Acquiring either resets
/// it to the requested capacity and returns a handle that borrows the pool
/// mutably; the next acquisition compiles only once the previous handle (or
/// the [`super::RowView`] it produced) is gone. Backing capacity only grows.
///
/// Usage:
/// 1. [`MutationBufferPool::encode_buffer`] to get the handle.
/// 2. [`EncodeRowBuffer::add_col_val`] for every column.
/// 3. [`EncodeRowBuffer::write_encoded`] to encode the row into the write buffer.
///
/// ```
/// use sombra_rowbuf::{
///     ColumnId, Datum, EncodeCtx, ErrorContext, Handle, InMemoryBuffer, MutateContext,
///     RowEncodingConfig, StdRowEncoder, StmtBufs,
/// };
/// use time::UtcOffset;
///
/// let cfg = RowEncodingConfig::new();
/// let encode = EncodeCtx::new(&cfg, &StdRowEncoder, UtcOffset::UTC);
/// let mut ctx = MutateContext::new(StmtBufs::new());
/// let mut store = InMemoryBuffer::new();
///
/// let (pool, scratch) = ctx.split();
/// let mut row = pool.encode_buffer(2);
/// row.add_col_val(ColumnId(1), Datum::from("a"));
/// row.add_col_val(ColumnId(2), Datum::Int(7));
/// row.write_encoded(
///     &encode,
///     scratch,
///     &mut ErrorContext::strict(),
///     &mut store,
///     b"t1_r1",
///     &Handle::Int(1),
///     &[],
/// )?;
/// assert_eq!(store.len(), 1);
///
/// let mut check = pool.check_buffer(2);
/// check.add_col_val(Datum::from("a"));
/// assert_eq!(check.row_view().len(), 1);
/// # Ok::<(), sombra_rowbuf::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MutationBufferPool {
    encode_row: Vec<ColVal>,
    check_row: Vec<Datum>,
}

impl MutationBufferPool {
    /// Creates a pool with no preallocated storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool whose rows can hold `capacity` columns without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            encode_row: Vec::with_capacity(capacity),
            check_row: Vec::with_capacity(capacity),
        }
    }

    /// Resets the encode row to `capacity` and hands it out.
    pub fn encode_buffer(&mut self, capacity: usize) -> EncodeRowBuffer<'_> {
        trace!(capacity, "rowbuf.pool.encode_buffer");
        EncodeRowBuffer::acquire(&mut self.encode_row, capacity)
    }

    /// Resets the check row to `capacity` and hands it out.
    pub fn check_buffer(&mut self, capacity: usize) -> CheckRowBuffer<'_> {
        trace!(capacity, "rowbuf.pool.check_buffer");
        CheckRowBuffer::acquire(&mut self.check_row, capacity)
    }

    /// Current capacity of the encode row.
    pub fn encode_capacity(&self) -> usize {
        self.encode_row.capacity()
    }

    /// Current capacity of the check row.
    pub fn check_capacity(&self) -> usize {
        self.check_row.capacity()
    }
}

/// Per-statement mutation state: the scratch buffers and the pool that
/// stages rows through them.
#[derive(Debug, Default)]
pub struct MutateContext {
    scratch: StmtBufs,
    pool: MutationBufferPool,
}

impl MutateContext {
    /// Binds a fresh pool to `scratch`.
    pub fn new(scratch: StmtBufs) -> Self {
        Self {
            scratch,
            pool: MutationBufferPool::new(),
        }
    }

    /// Scratch buffers, for collaborators that use them directly.
    pub fn scratch_buffers(&mut self) -> &mut StmtBufs {
        &mut self.scratch
    }

    /// The row pool.
    pub fn pool(&mut self) -> &mut MutationBufferPool {
        &mut self.pool
    }

    /// Lends the pool and the scratch buffers at the same time.
    pub fn split(&mut self) -> (&mut MutationBufferPool, &mut StmtBufs) {
        (&mut self.pool, &mut self.scratch)
    }

    /// Gives the scratch buffers back, dropping the pool.
    pub fn into_scratch(self) -> StmtBufs {
        self.scratch
    }
}
