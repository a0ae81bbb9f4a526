//! Statement-level policy for errors raised while staging rows.

use tracing::{trace, warn};

use crate::error::{Error, Result};

/// Decides whether an error aborts the current statement.
///
/// Implementations may propagate the error, translate it, or suppress it
/// (returning `Ok(())`). Callers treat the returned value as authoritative.
pub trait ErrorHandler {
    /// Applies the policy to `err`.
    fn handle_error(&mut self, err: Error) -> Result<()>;
}

/// How an [`ErrorContext`] treats the errors it is handed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorLevel {
    /// Propagate the error.
    #[default]
    Error,
    /// Record the error as a warning and continue.
    Warn,
    /// Drop the error silently.
    Ignore,
}

/// Default [`ErrorHandler`] that applies a single [`ErrorLevel`] and keeps warnings.
#[derive(Debug, Default)]
pub struct ErrorContext {
    level: ErrorLevel,
    warnings: Vec<Error>,
}

impl ErrorContext {
    /// Creates a context that applies `level` to every error.
    pub fn new(level: ErrorLevel) -> Self {
        Self {
            level,
            warnings: Vec::new(),
        }
    }

    /// Creates a context that propagates every error.
    pub fn strict() -> Self {
        Self::new(ErrorLevel::Error)
    }

    /// Returns the configured level.
    pub fn level(&self) -> ErrorLevel {
        self.level
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Removes and returns the recorded warnings.
    pub fn take_warnings(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.warnings)
    }
}

impl ErrorHandler for ErrorContext {
    fn handle_error(&mut self, err: Error) -> Result<()> {
        match self.level {
            ErrorLevel::Error => Err(err),
            ErrorLevel::Warn => {
                warn!(error = %err, warnings = self.warnings.len() + 1, "rowbuf.errctx.warn");
                self.warnings.push(err);
                Ok(())
            }
            ErrorLevel::Ignore => {
                trace!(error = %err, "rowbuf.errctx.ignore");
                Ok(())
            }
        }
    }
}
