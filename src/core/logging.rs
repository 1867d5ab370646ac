//! Stream output for records and its environment configuration.
//!
//! A [`StreamHandler`] is the ordinary destination that capture sessions
//! silence while installed.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use super::hierarchy::{Handler, Hierarchy};
use super::level::Level;
use super::record::Record;

pub const LOG_LEVEL_ENV: &str = "LOGCAPTURE_LOG";
pub const LOG_FORMAT_ENV: &str = "LOGCAPTURE_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "LOGCAPTURE_LOG_FILE";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Timestamp, level, logger, message and fields.
    #[default]
    Human,
    /// One JSON record per line.
    Json,
    /// Level, logger and message only.
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }

    /// Render one record without a trailing newline.
    #[must_use]
    pub fn render(self, record: &Record) -> String {
        match self {
            Self::Json => serde_json::to_string(record)
                .unwrap_or_else(|err| json_fallback(&record.name, &err.to_string())),
            Self::Compact => format!("{} {}: {}", record.level, record.name, record.message),
            Self::Human => {
                let mut line = format!(
                    "{} {:>5} {}: {}",
                    record.timestamp.format(TIMESTAMP_FORMAT),
                    record.level,
                    record.name,
                    record.message
                );
                for (key, value) in &record.fields {
                    let _ = write!(line, " {key}={value}");
                }
                if let Some(error) = &record.error {
                    let _ = write!(line, "\n  error: {}", error.message);
                    for cause in &error.chain {
                        let _ = write!(line, "\n  caused by: {cause}");
                    }
                }
                line
            }
        }
    }
}

/// Minimal JSON line used when a record cannot be serialized.
fn json_fallback(name: &str, error: &str) -> String {
    serde_json::json!({ "name": name, "serialization_error": error }).to_string()
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse log level from `LOGCAPTURE_LOG`.
#[must_use]
pub fn parse_log_level_from_env() -> Option<Level> {
    env_value(LOG_LEVEL_ENV).and_then(|value| Level::from_arg(&value))
}

/// Parse log format from `LOGCAPTURE_LOG_FORMAT`.
#[must_use]
pub fn parse_log_format_from_env() -> Option<LogFormat> {
    env_value(LOG_FORMAT_ENV).and_then(|value| LogFormat::from_arg(&value))
}

/// Parse log file path from `LOGCAPTURE_LOG_FILE`.
#[must_use]
pub fn parse_log_file_from_env() -> Option<PathBuf> {
    env_value(LOG_FILE_ENV).map(PathBuf::from)
}

/// Settings for a [`StreamHandler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfig {
    pub level: Option<Level>,
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl StreamConfig {
    /// Read settings from the environment. Unset, empty or unparseable
    /// values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            level: parse_log_level_from_env(),
            format: parse_log_format_from_env().unwrap_or_default(),
            file: parse_log_file_from_env(),
        }
    }

    /// Build the handler. A file that cannot be opened falls back to stderr.
    #[must_use]
    pub fn build(&self) -> StreamHandler {
        let file = self.file.as_ref().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| {
                    tracing::debug!(path = %path.display(), error = %err, "Log file unavailable, using stderr");
                })
                .ok()
        });

        let writer = file.map_or_else(|| BoxMakeWriter::new(std::io::stderr), BoxMakeWriter::new);
        StreamHandler {
            level: self.level,
            format: self.format,
            writer,
        }
    }
}

/// Handler that writes each record as one rendered line.
pub struct StreamHandler {
    level: Option<Level>,
    format: LogFormat,
    writer: BoxMakeWriter,
}

impl std::fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandler")
            .field("level", &self.level)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl StreamHandler {
    /// Handler writing to stderr.
    #[must_use]
    pub fn stderr(format: LogFormat) -> Self {
        Self::new(std::io::stderr, format)
    }

    /// Handler writing to any tracing `MakeWriter`.
    pub fn new<M>(writer: M, format: LogFormat) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            level: None,
            format,
            writer: BoxMakeWriter::new(writer),
        }
    }

    #[must_use]
    pub const fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }
}

impl Handler for StreamHandler {
    fn handle(&self, record: &Record) {
        let line = self.format.render(record);
        let mut writer = self.writer.make_writer();
        let _ = writeln!(writer, "{line}");
    }

    fn level(&self) -> Option<Level> {
        self.level
    }
}

impl Hierarchy {
    /// Attach a [`StreamHandler`] configured from the environment to the
    /// root logger. A configured level also becomes the root level.
    #[must_use]
    pub fn with_stream_from_env(self) -> Self {
        let config = StreamConfig::from_env();
        let root = self.root();
        if let Some(level) = config.level {
            root.set_level(Some(level));
        }
        root.add_handler(Arc::new(config.build()));
        self
    }
}
