// Publishing
//
// Sinks that consume published messages. Every sink implements the same
// two-operation capability (`publish`, `close`); the fan-out publisher
// composes a durable log sink with a table-store sink.

mod fanout;
mod file;
mod table;

pub use fanout::FanOutPublisher;
pub use file::{FileLogSink, LogSinkConfig};
pub use table::TableStoreSink;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Errors surfaced by sinks.
///
/// Parse degradation is never an error; only I/O on the durable log is.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("cannot create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o failure on topic `{topic}`: {source}")]
    Io {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize message for topic `{topic}`: {source}")]
    Serialize {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid sink configuration: {0}")]
    InvalidConfig(String),

    #[error("periodic flush task did not stop cleanly: {0}")]
    Join(String),
}

/// A publication target.
///
/// `publish` is synchronous and fully applied before it returns. `close`
/// releases any owned resources and must be called once at shutdown;
/// publishing after `close` is not supported.
#[async_trait]
pub trait Publisher: Send {
    fn publish(&mut self, topic: &str, message: &Value) -> Result<(), PublishError>;

    async fn close(&mut self) -> Result<(), PublishError>;
}
