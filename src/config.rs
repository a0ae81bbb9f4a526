//! Row encoding options, loadable from TOML.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options forwarded to the row encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Use the compact row format instead of the legacy interleaved one.
    pub compact: bool,
}

/// Row encoding configuration for the write path of a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowEncodingConfig {
    /// Whether to append a row-level checksum bound to the row handle.
    pub row_level_checksum: bool,
    /// Encoder options.
    pub encoder: EncoderConfig,
}

impl RowEncodingConfig {
    /// Creates a configuration with the legacy format and no checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables row-level checksums.
    pub fn row_level_checksum(mut self, enabled: bool) -> Self {
        self.row_level_checksum = enabled;
        self
    }

    /// Selects the compact row format.
    pub fn compact(mut self, enabled: bool) -> Self {
        self.encoder.compact = enabled;
        self
    }

    /// Parses a configuration from TOML text. Missing keys take their defaults.
    ///
    /// ```
    /// use sombra_rowbuf::RowEncodingConfig;
    ///
    /// let cfg = RowEncodingConfig::from_toml_str(
    ///     "row_level_checksum = true\n[encoder]\ncompact = true\n",
    /// )
    /// .unwrap();
    /// assert!(cfg.row_level_checksum);
    /// assert!(cfg.encoder.compact);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }
}
