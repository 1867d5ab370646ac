//! logcapture - capture and assert on log records emitted during tests.
//!
//! A [`Hierarchy`] is a tree of named loggers; tracing events reach it through
//! [`Hierarchy::layer`] or [`Hierarchy::set_default`]. A [`LogCapture`]
//! attaches to some of those loggers for a bounded scope and checks what was
//! logged by logger name, level and message.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod core;
pub mod error;

pub use capture::{
    ActiveCapture, CaptureBuilder, CaptureOptions, CaptureRegistry, Entry, LogCapture, NO_LOGGING,
    SessionId, log_capture, with_log_capture,
};
pub use crate::core::{Handler, Hierarchy, Level, Logger, Record};
pub use error::{CaptureError, Result};
