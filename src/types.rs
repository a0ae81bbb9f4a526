use std::fmt;

use time::PrimitiveDateTime;

const SIGN_BIT: u64 = 1 << 63;

/// Identifier of a table column.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct ColumnId(pub i64);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ColumnId {
    fn from(value: i64) -> Self {
        ColumnId(value)
    }
}

impl From<ColumnId> for i64 {
    fn from(value: ColumnId) -> Self {
        value.0
    }
}

/// Unique identity of a row within its table.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Handle {
    /// Integer row id.
    Int(i64),
    /// Handle built from an encoded clustered primary key.
    Common(Vec<u8>),
}

impl Handle {
    /// Memcomparable form of an integer handle.
    pub fn int_bytes(v: i64) -> [u8; 8] {
        ((v as u64) ^ SIGN_BIT).to_be_bytes()
    }

    /// Appends the memcomparable form of the handle to `dst`.
    pub fn encode_into(&self, dst: &mut Vec<u8>) {
        match self {
            Handle::Int(v) => dst.extend_from_slice(&Self::int_bytes(*v)),
            Handle::Common(bytes) => dst.extend_from_slice(bytes),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Int(v) => write!(f, "{v}"),
            Handle::Common(bytes) => write!(f, "common(len={})", bytes.len()),
        }
    }
}

/// A single column value.
///
/// Timestamps are carried in the session's local offset; the row encoder
/// normalises them to UTC.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Datum {
    /// SQL NULL.
    #[default]
    Null,
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    Uint(u64),
    /// 64-bit floating point number.
    Float(f64),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 string.
    Str(String),
    /// Wall-clock timestamp in the session offset.
    Timestamp(PrimitiveDateTime),
}

impl Datum {
    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<u64> for Datum {
    fn from(value: u64) -> Self {
        Datum::Uint(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Str(value.to_owned())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Str(value)
    }
}

impl From<Vec<u8>> for Datum {
    fn from(value: Vec<u8>) -> Self {
        Datum::Bytes(value)
    }
}

/// One staged column: its id and its value, kept in insertion order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ColVal {
    /// Column id.
    pub id: ColumnId,
    /// Column value.
    pub value: Datum,
}

impl ColVal {
    /// Creates a column/value pair.
    pub fn new(id: ColumnId, value: Datum) -> Self {
        Self { id, value }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "null"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Uint(v) => write!(f, "{v}"),
            Datum::Float(v) => write!(f, "{v}"),
            Datum::Bytes(v) => write!(f, "bytes(len={})", v.len()),
            Datum::Str(v) => write!(f, "{v}"),
            Datum::Timestamp(v) => write!(f, "{v}"),
        }
    }
}
