//! Log records as seen by handlers.

use std::error::Error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::level::Level;

/// Details of an error attached to a record.
///
/// `message` is the error's `Display` output, `debug` its `Debug` output and
/// `chain` the rendered `source()` chain, outermost cause first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    pub debug: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl ErrorInfo {
    /// Capture an error and its source chain.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: error.to_string(),
            debug: format!("{error:?}"),
            chain,
        }
    }
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the logger the event was emitted on.
    pub name: String,
    pub level: Level,
    /// Message after argument interpolation.
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level,
            message: message.into(),
            fields: Vec::new(),
            error: None,
            file: None,
            line: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach an error.
    #[must_use]
    pub fn with_error(mut self, error: &(dyn Error + 'static)) -> Self {
        self.error = Some(ErrorInfo::from_error(error));
        self
    }

    /// Attach a structured field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Look up a structured field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}
