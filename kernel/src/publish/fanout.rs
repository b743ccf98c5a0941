use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{FileLogSink, LogSinkConfig, PublishError, Publisher, TableStoreSink};
use crate::table::TableStore;

/// Publishes every message to a durable sink, then to a queryable sink.
///
/// The two writes are not atomic. If the durable publish fails the
/// queryable sink is not touched; if the queryable publish fails the
/// durable record stays. No rollback is attempted either way.
pub struct FanOutPublisher<D, Q> {
    durable: D,
    queryable: Q,
}

impl<D: Publisher, Q: Publisher> FanOutPublisher<D, Q> {
    pub fn new(durable: D, queryable: Q) -> Self {
        Self { durable, queryable }
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }

    pub fn queryable(&self) -> &Q {
        &self.queryable
    }
}

impl<S: TableStore + ?Sized> FanOutPublisher<FileLogSink, TableStoreSink<S>> {
    /// Log every message under `config.base_dir` and index it into `store`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn logged(config: LogSinkConfig, store: Arc<S>) -> Result<Self, PublishError> {
        Ok(Self::new(FileLogSink::open(config)?, TableStoreSink::new(store)))
    }
}

#[async_trait]
impl<D: Publisher, Q: Publisher> Publisher for FanOutPublisher<D, Q> {
    fn publish(&mut self, topic: &str, message: &Value) -> Result<(), PublishError> {
        self.durable.publish(topic, message)?;
        self.queryable.publish(topic, message)
    }

    /// Closes the queryable sink, then the durable one. Both are closed even
    /// if the first fails; the first error is returned.
    async fn close(&mut self) -> Result<(), PublishError> {
        let queryable = self.queryable.close().await;
        let durable = self.durable.close().await;
        queryable.and(durable)
    }
}
