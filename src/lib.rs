//! Row staging buffers for the table write path.
//!
//! Every insert, update or delete serialises a row twice: once into its
//! persisted encoding for the transaction's write buffer and once into a
//! plain row for constraint checks. [`MutationBufferPool`] keeps the storage
//! for both and reuses it across every row of a statement, growing only when
//! a row is wider than anything seen before.
//!
//! The row format belongs to a [`RowEncoder`], the policy for encoding
//! failures to an [`ErrorHandler`] and the destination to a [`MemBuffer`];
//! default implementations of each are provided.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod errctx;
pub mod error;
pub mod kv;
pub mod types;

pub use buffer::{
    CheckRowBuffer, EncodeCtx, EncodeRowBuffer, MutateContext, MutationBufferPool, RowView,
    StmtBufs,
};
pub use codec::{decode_row, RowChecksum, RowEncoder, StdRowEncoder};
pub use config::{EncoderConfig, RowEncodingConfig};
pub use errctx::{ErrorContext, ErrorHandler, ErrorLevel};
pub use error::{Error, Result};
pub use kv::{Entry, FlagsOp, InMemoryBuffer, MemBuffer};
pub use types::{ColVal, ColumnId, Datum, Handle};
