//! Row staging buffers reused across the mutations of a statement.

mod check;
mod encode;
mod pool;
mod reuse;
mod scratch;

pub use check::{CheckRowBuffer, RowView};
pub use encode::{EncodeCtx, EncodeRowBuffer};
pub use pool::{MutateContext, MutationBufferPool};
pub use reuse::ensure_capacity_and_reset;
pub use scratch::StmtBufs;
