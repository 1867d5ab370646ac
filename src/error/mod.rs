//! Error types for logcapture.
//!
//! Uses `thiserror` for structured failures. Every variant is an assertion
//! failure about captured logging; its `Display` text is what a failing test
//! prints.
//!
//! Misuse such as installing an installed session or uninstalling one that
//! is not installed is not an error; those calls are no-ops.

use thiserror::Error;

use crate::capture::{Entries, SequenceDiff};
use crate::core::Level;

/// Assertion failures raised by capture sessions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Captured sequence differs from the expected one.
    #[error("{0}")]
    Mismatch(Box<SequenceDiff>),

    /// Some expected entries were never captured.
    #[error("expected logging not present:\n\nmissing:\n{missing}\nactual:\n{actual}")]
    NotPresent { missing: Entries, actual: Entries },

    /// Records at or above the threshold were never asserted on.
    #[error("not asserted {threshold} or above logging:\n{entries}")]
    Unchecked { threshold: Level, entries: Entries },
}

impl CaptureError {
    /// The entries a test author most likely needs to look at: the
    /// unexpected actual entries, the missing ones, or the unchecked ones.
    #[must_use]
    pub fn entries(&self) -> &Entries {
        match self {
            Self::Mismatch(diff) => &diff.actual,
            Self::NotPresent { missing, .. } => missing,
            Self::Unchecked { entries, .. } => entries,
        }
    }
}

/// Result type alias for logcapture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
