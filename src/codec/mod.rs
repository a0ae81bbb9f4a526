//! Row codec consumed by the encode buffer.
//!
//! The buffer pool only stages inputs; [`RowEncoder`] owns the byte format.
//! [`StdRowEncoder`] ships two formats: the legacy interleaved
//! `id, value, id, value` layout and a compact layout that can carry a
//! row-level checksum.

mod row;
pub mod value;

use time::UtcOffset;

use crate::config::EncoderConfig;
use crate::error::Result;
use crate::types::{ColVal, Datum, Handle};

pub use row::{decode_row, StdRowEncoder, COMPACT_ROW_VERSION};

/// Checksum descriptor requested for a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowChecksum<'a> {
    /// CRC32 over the row handle followed by the encoded row.
    Raw {
        /// Row identity the checksum is bound to.
        handle: &'a Handle,
    },
}

/// Encodes staged rows into their persisted representation.
pub trait RowEncoder {
    /// Encodes `row` into `buf` (cleared first, capacity kept).
    ///
    /// `values` is scratch for the interleaved id/value sequence; the caller
    /// sizes it to `2 * row.len()`, and implementations grow it if it is shorter.
    fn encode_row(
        &self,
        loc: UtcOffset,
        row: &[ColVal],
        buf: &mut Vec<u8>,
        values: &mut Vec<Datum>,
        checksum: Option<&RowChecksum<'_>>,
        cfg: &EncoderConfig,
    ) -> Result<()>;

    /// Encodes `row` in the legacy interleaved format into `buf`.
    fn encode_legacy(
        &self,
        loc: UtcOffset,
        row: &[ColVal],
        buf: &mut Vec<u8>,
        values: &mut Vec<Datum>,
    ) -> Result<()>;
}
