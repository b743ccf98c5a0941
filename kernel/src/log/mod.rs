// Log Record Format
//
// One durable line per published message:
//
//     <YYYY-MM-DD HH:MM:SS> - <compact json>\n
//
// Lines are grouped by topic into `<topic>.log` files. Records are never
// mutated or removed once written.

use chrono::{Local, NaiveDateTime, Timelike};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Timestamp layout used at the start of every line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SEPARATOR: &str = " - ";

/// Length of `<timestamp> - `, the fixed prefix of every line.
pub const LINE_PREFIX_LEN: usize = 22;

/// File extension of per-topic log files.
pub const LOG_EXTENSION: &str = "log";

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub topic: String,
    pub timestamp: NaiveDateTime,
    pub message: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("missing ` - ` separator")]
    MissingSeparator,

    #[error("invalid timestamp `{0}`")]
    Timestamp(String, #[source] chrono::ParseError),

    #[error("invalid message payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl RecordError {
    /// Whether `line` failed to parse because it was cut short (a write torn
    /// by an abrupt exit) rather than because it holds foreign content.
    pub fn is_truncation(&self, line: &str) -> bool {
        match self {
            RecordError::Payload(e) => e.is_eof(),
            RecordError::MissingSeparator => {
                line.len() < LINE_PREFIX_LEN
                    && line.bytes().all(|b| b.is_ascii_digit() || b" -:".contains(&b))
            }
            RecordError::Timestamp(..) => false,
        }
    }
}

impl LogRecord {
    /// Stamp a message with the current local wall-clock time, truncated
    /// to whole seconds to match the on-disk precision.
    pub fn now(topic: impl Into<String>, message: Value) -> Self {
        Self {
            topic: topic.into(),
            timestamp: wall_clock(),
            message,
        }
    }

    /// Render the record as a single newline-terminated line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        format_line(&self.timestamp, &self.message)
    }

    /// Parse a line read back from `<topic>.log`. The trailing newline is
    /// optional.
    pub fn parse_line(topic: &str, line: &str) -> Result<Self, RecordError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (stamp, payload) = line
            .split_once(SEPARATOR)
            .ok_or(RecordError::MissingSeparator)?;

        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map_err(|e| RecordError::Timestamp(stamp.to_string(), e))?;
        let message = serde_json::from_str(payload)?;

        Ok(Self {
            topic: topic.to_string(),
            timestamp,
            message,
        })
    }
}

/// Current local time at second precision.
pub fn wall_clock() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Render `message` as a log line stamped with `timestamp`.
///
/// Compact JSON escapes control characters, so the payload never spans
/// more than one line.
pub fn format_line(timestamp: &NaiveDateTime, message: &Value) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string(message)?;
    Ok(format!(
        "{}{}{}\n",
        timestamp.format(TIMESTAMP_FORMAT),
        SEPARATOR,
        payload
    ))
}

/// Path of the log file for `topic` under `base_dir`.
pub fn log_file_path(base_dir: &Path, topic: &str) -> PathBuf {
    base_dir.join(format!("{topic}.{LOG_EXTENSION}"))
}
