use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the row codec, the write buffer and configuration loading.
///
/// The buffer pool itself never originates an error; it forwards what the
/// encoder, the error context and the key-value buffer report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A column value cannot be represented in the persisted encoding.
    #[error("invalid value for column {column}: {reason}")]
    InvalidValue {
        /// Column id whose value was rejected.
        column: i64,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// Encoded bytes could not be decoded.
    #[error("corruption detected: {0}")]
    Corruption(&'static str),
    /// The write buffer refuses empty values.
    #[error("cannot set an empty value for key {0:02x?}")]
    EmptyValue(Vec<u8>),
    /// The write buffer refuses an entry above its size limit.
    #[error("entry too large: {size} bytes exceeds limit of {limit}")]
    EntryTooLarge {
        /// Key plus value length.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
