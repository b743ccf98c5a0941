// Durable Log Sink
//
// Appends every raw message to `<base_dir>/<topic>.log` through an
// in-process write buffer. Buffered lines reach the file on whichever
// comes first:
//
// - the topic's pending count reaching `flush_limit` (inside `publish`)
// - the periodic flush task firing every `flush_interval`
// - an explicit `flush` / `flush_all`
// - `close`

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{PublishError, Publisher};
use crate::log::{format_line, log_file_path, wall_clock};

/// Runtime settings of a [`FileLogSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogSinkConfig {
    /// Directory holding one `<topic>.log` file per topic.
    pub base_dir: PathBuf,

    /// Period of the background flush.
    pub flush_interval: Duration,

    /// Pending records per topic that force an immediate flush.
    pub flush_limit: usize,

    /// Capacity of each topic's in-process write buffer (bytes).
    ///
    /// A full buffer is written through by the runtime regardless of the
    /// flush policy.
    pub write_buffer_size: usize,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("output"),
            flush_interval: Duration::from_secs(1),
            flush_limit: 10_000,
            write_buffer_size: 8 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FlushReason {
    Threshold,
    Manual,
    Periodic,
    Shutdown,
}

impl FlushReason {
    fn as_str(self) -> &'static str {
        match self {
            FlushReason::Threshold => "threshold",
            FlushReason::Manual => "manual",
            FlushReason::Periodic => "periodic",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

/// Open file and pending-write counter of one topic.
struct TopicLog {
    writer: BufWriter<File>,
    pending: usize,
}

impl TopicLog {
    fn open(config: &LogSinkConfig, topic: &str) -> Result<Self, PublishError> {
        let io_err = |source: std::io::Error| PublishError::Io {
            topic: topic.to_string(),
            source,
        };

        let path = log_file_path(&config.base_dir, topic);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        // A torn last line must not swallow the next record.
        if ends_mid_line(&mut file).map_err(io_err)? {
            warn!(topic, path = %path.display(), "terminating torn trailing line");
            file.write_all(b"\n").map_err(io_err)?;
        }

        info!(topic, path = %path.display(), "opened topic log");

        Ok(Self {
            writer: BufWriter::with_capacity(config.write_buffer_size, file),
            pending: 0,
        })
    }

    fn flush(&mut self, topic: &str, reason: FlushReason) -> Result<(), PublishError> {
        self.writer.flush().map_err(|source| PublishError::Io {
            topic: topic.to_string(),
            source,
        })?;
        debug!(topic, records = self.pending, reason = reason.as_str(), "flushed topic log");
        self.pending = 0;
        Ok(())
    }
}

/// Whether a non-empty file lacks a final newline.
fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

type TopicLogs = HashMap<String, TopicLog>;

/// Flush every open topic, returning the first failure after attempting all.
fn flush_all_topics(topics: &mut TopicLogs, reason: FlushReason) -> Result<(), PublishError> {
    let mut first_err = None;
    for (topic, log) in topics.iter_mut() {
        if let Err(e) = log.flush(topic, reason) {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

async fn flush_periodically(
    topics: Arc<Mutex<TopicLogs>>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("periodic flush stopping");
                break;
            }
            _ = ticker.tick() => {
                // Flushed inline on the runtime thread: each topic holds at
                // most `write_buffer_size` bytes, so the blocking write is short.
                let result = flush_all_topics(&mut topics.lock(), FlushReason::Periodic);
                if let Err(e) = result {
                    error!(error = %e, "periodic flush failed");
                }
            }
        }
    }
}

/// Append-only per-topic log with hybrid (count + time) flushing.
///
/// Must be opened from within a tokio runtime; it owns a background flush
/// task until [`Publisher::close`] is awaited.
pub struct FileLogSink {
    config: LogSinkConfig,
    topics: Arc<Mutex<TopicLogs>>,
    shutdown: CancellationToken,
    flush_task: Option<JoinHandle<()>>,
}

impl FileLogSink {
    /// Create the base directory and start the periodic flush task.
    pub fn open(config: LogSinkConfig) -> Result<Self, PublishError> {
        if config.flush_interval.is_zero() {
            return Err(PublishError::InvalidConfig("flush_interval must be positive".into()));
        }
        if config.flush_limit == 0 {
            return Err(PublishError::InvalidConfig("flush_limit must be at least 1".into()));
        }

        std::fs::create_dir_all(&config.base_dir).map_err(|source| PublishError::CreateDir {
            path: config.base_dir.clone(),
            source,
        })?;

        let topics = Arc::new(Mutex::new(TopicLogs::new()));
        let shutdown = CancellationToken::new();
        let flush_task = tokio::spawn(flush_periodically(
            topics.clone(),
            config.flush_interval,
            shutdown.clone(),
        ));

        info!(
            base_dir = %config.base_dir.display(),
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            flush_limit = config.flush_limit,
            "file log sink opened"
        );

        Ok(Self {
            config,
            topics,
            shutdown,
            flush_task: Some(flush_task),
        })
    }

    /// Force a topic's buffered lines into its file. No-op for a topic that
    /// has never been published.
    pub fn flush(&self, topic: &str) -> Result<(), PublishError> {
        match self.topics.lock().get_mut(topic) {
            Some(log) => log.flush(topic, FlushReason::Manual),
            None => Ok(()),
        }
    }

    /// Flush every open topic.
    pub fn flush_all(&self) -> Result<(), PublishError> {
        flush_all_topics(&mut self.topics.lock(), FlushReason::Manual)
    }

    /// Records written to `topic` since its last flush, if the topic is open.
    pub fn pending(&self, topic: &str) -> Option<usize> {
        self.topics.lock().get(topic).map(|log| log.pending)
    }

    /// Topics with an open log file.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.lock().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_closed(&self) -> bool {
        self.flush_task.is_none()
    }
}

#[async_trait]
impl Publisher for FileLogSink {
    fn publish(&mut self, topic: &str, message: &Value) -> Result<(), PublishError> {
        debug!(topic, "publishing to topic log");

        let line = format_line(&wall_clock(), message).map_err(|source| {
            PublishError::Serialize {
                topic: topic.to_string(),
                source,
            }
        })?;

        let mut topics = self.topics.lock();
        let log = match topics.entry(topic.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(TopicLog::open(&self.config, topic)?),
        };

        log.writer
            .write_all(line.as_bytes())
            .map_err(|source| PublishError::Io {
                topic: topic.to_string(),
                source,
            })?;
        log.pending += 1;

        if log.pending >= self.config.flush_limit {
            log.flush(topic, FlushReason::Threshold)?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PublishError> {
        self.shutdown.cancel();

        // The task must be gone before file handles are touched.
        let joined = match self.flush_task.take() {
            Some(task) => task.await.map_err(|e| PublishError::Join(e.to_string())),
            None => Ok(()),
        };

        let mut topics = self.topics.lock();
        let flushed = flush_all_topics(&mut topics, FlushReason::Shutdown);
        let count = topics.len();
        topics.clear();
        drop(topics);

        info!(topics = count, "file log sink closed");
        joined.and(flushed)
    }
}

impl Drop for FileLogSink {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
