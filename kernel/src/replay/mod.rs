// Log Replay
//
// Reads per-topic log files back into records and re-applies them to a
// table-store sink. Used for offline inspection of the durable history;
// the running system never restores its table store from the logs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::log::{log_file_path, LogRecord, RecordError};
use crate::publish::{PublishError, Publisher, TableStoreSink};
use crate::table::TableStore;

/// Errors that can occur during replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {source}", path.display())]
    Record {
        path: PathBuf,
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("{}:{line}: invalid utf-8", path.display())]
    Utf8 { path: PathBuf, line: usize },

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Read every record of `topic` under `base_dir`, in file order.
///
/// A missing file yields no records. Lines torn by an abrupt exit are
/// skipped: any unparseable final line, and earlier lines that were cut
/// short (a restarted sink terminates a torn line before appending).
/// Any other bad line is an error.
pub fn read_topic_log(base_dir: &Path, topic: &str) -> Result<Vec<LogRecord>, ReplayError> {
    let path = log_file_path(base_dir, topic);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(ReplayError::Io { path, source }),
    };

    let lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    let Some(last) = lines.iter().rposition(|line| !line.is_empty()) else {
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(last + 1);

    for (idx, raw) in lines[..=last].iter().enumerate() {
        if raw.is_empty() {
            continue;
        }
        let is_last = idx == last;

        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            // `error_len() == None`: the line ends inside a multi-byte character.
            Err(e) if is_last || e.error_len().is_none() => {
                warn!(topic, line = idx + 1, "skipping torn line (incomplete utf-8)");
                continue;
            }
            Err(_) => {
                return Err(ReplayError::Utf8 {
                    path: path.clone(),
                    line: idx + 1,
                })
            }
        };

        match LogRecord::parse_line(topic, line) {
            Ok(record) => records.push(record),
            Err(e) if is_last || e.is_truncation(line) => {
                warn!(topic, line = idx + 1, error = %e, "skipping torn line");
            }
            Err(source) => {
                return Err(ReplayError::Record {
                    path: path.clone(),
                    line: idx + 1,
                    source,
                })
            }
        }
    }

    debug!(topic, records = records.len(), "read topic log");
    Ok(records)
}

/// Re-publish the logged history of `topics` to a table-store sink.
///
/// Topics are applied in the order given, records in file order.
/// Returns the number of records applied.
pub fn replay_into<S: TableStore + ?Sized>(
    sink: &mut TableStoreSink<S>,
    base_dir: &Path,
    topics: &[&str],
) -> Result<usize, ReplayError> {
    let mut applied = 0;

    for topic in topics {
        for record in read_topic_log(base_dir, topic)? {
            sink.publish(&record.topic, &record.message)?;
            applied += 1;
        }
    }

    Ok(applied)
}
