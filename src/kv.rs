//! Transaction-local write buffer that receives encoded rows.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{Error, Result};

/// Per-key flags attached when staging a write.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FlagsOp {
    /// The key is presumed absent; the check is deferred to commit.
    PresumeKeyNotExists,
    /// Constraint check must run during prewrite.
    NeedConstraintCheckInPrewrite,
    /// Assert the key exists at commit.
    AssertExist,
    /// Assert the key does not exist at commit.
    AssertNotExist,
    /// Clear any existence assertion.
    AssertNone,
}

/// Destination for encoded rows.
///
/// `value` is borrowed: the caller keeps reusing its backing storage, so
/// implementations copy what they keep.
pub trait MemBuffer {
    /// Stages `value` under `key`.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Stages `value` under `key` and attaches `flags`.
    fn set_with_flags(&mut self, key: &[u8], value: &[u8], flags: &[FlagsOp]) -> Result<()>;
}

/// A staged write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    /// Staged value.
    pub value: Vec<u8>,
    /// Flags accumulated for the key.
    pub flags: Vec<FlagsOp>,
}

/// Ordered in-memory [`MemBuffer`].
#[derive(Debug, Default)]
pub struct InMemoryBuffer {
    entries: BTreeMap<Vec<u8>, Entry>,
    entry_size_limit: Option<usize>,
}

impl InMemoryBuffer {
    /// Creates an unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects entries whose key plus value exceed `limit` bytes.
    pub fn with_entry_size_limit(limit: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            entry_size_limit: Some(limit),
        }
    }

    /// Returns the staged entry for `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Number of staged keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates staged entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_slice(), e))
    }

    fn stage(&mut self, key: &[u8], value: &[u8]) -> Result<&mut Entry> {
        if value.is_empty() {
            return Err(Error::EmptyValue(key.to_vec()));
        }
        if let Some(limit) = self.entry_size_limit {
            let size = key.len() + value.len();
            if size > limit {
                return Err(Error::EntryTooLarge { size, limit });
            }
        }
        let entry = self.entries.entry(key.to_vec()).or_default();
        entry.value.clear();
        entry.value.extend_from_slice(value);
        Ok(entry)
    }
}

impl MemBuffer for InMemoryBuffer {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.stage(key, value)?;
        trace!(key_len = key.len(), value_len = value.len(), "rowbuf.kv.set");
        Ok(())
    }

    fn set_with_flags(&mut self, key: &[u8], value: &[u8], flags: &[FlagsOp]) -> Result<()> {
        let entry = self.stage(key, value)?;
        for flag in flags {
            if !entry.flags.contains(flag) {
                entry.flags.push(*flag);
            }
        }
        trace!(
            key_len = key.len(),
            value_len = value.len(),
            flags = flags.len(),
            "rowbuf.kv.set_with_flags"
        );
        Ok(())
    }
}
