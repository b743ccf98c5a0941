use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{PublishError, Publisher};
use crate::parse::ParserRegistry;
use crate::table::{InMemoryTableStore, TableStore};

/// Applies parsed messages to a shared table store.
///
/// No buffering: every record of a message is written before `publish`
/// returns.
pub struct TableStoreSink<S: TableStore + ?Sized = InMemoryTableStore> {
    store: Arc<S>,
    parsers: ParserRegistry,
}

impl<S: TableStore + ?Sized> TableStoreSink<S> {
    /// Sink using the reference topic parsers.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_parsers(store, ParserRegistry::default())
    }

    pub fn with_parsers(store: Arc<S>, parsers: ParserRegistry) -> Self {
        Self { store, parsers }
    }

    /// The store this sink writes to; clone the `Arc` to hand it to readers.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn parsers_mut(&mut self) -> &mut ParserRegistry {
        &mut self.parsers
    }
}

#[async_trait]
impl<S: TableStore + ?Sized> Publisher for TableStoreSink<S> {
    fn publish(&mut self, topic: &str, message: &Value) -> Result<(), PublishError> {
        let records = self.parsers.parse(topic, message);
        debug!(topic, records = records.len(), "applying message to table store");

        for record in records {
            self.store.write(&record.table, &record.key, record.value);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParsedRecord, TopicParser};
    use serde_json::json;

    fn exchange_info() -> Value {
        json!({
            "rateLimits": [{"rateLimitType": "ORDERS", "limit": 50}],
            "symbols": [{
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "filters": [
                    {
                        "filterType": "PRICE_FILTER",
                        "minPrice": "10000.00000000",
                        "maxPrice": "100000.00000000",
                        "tickSize": "0.01000000"
                    },
                    {
                        "filterType": "LOT_SIZE",
                        "minQty": "0.00100000",
                        "maxQty": "100.00000000",
                        "stepSize": "0.00100000"
                    }
                ]
            }]
        })
    }

    #[tokio::test]
    async fn exchange_info_populates_symbols_table() {
        let store = Arc::new(InMemoryTableStore::new());
        let mut sink = TableStoreSink::new(store.clone());

        sink.publish("exchange_info", &exchange_info()).unwrap();

        let btc = store.read("symbols", "BTCUSDT").unwrap();
        assert_eq!(btc["minPrice"], "10000.00000000");
        assert_eq!(btc["maxPrice"], "100000.00000000");
        assert_eq!(btc["tickSize"], "0.01000000");
        assert_eq!(btc["lotSize"]["minQty"], "0.00100000");
        assert_eq!(btc["lotSize"]["maxQty"], "100.00000000");
        assert_eq!(btc["lotSize"]["stepSize"], "0.00100000");
        assert_eq!(btc["baseAsset"], "BTC");
        assert_eq!(btc["quoteAsset"], "USDT");
        assert_eq!(btc["status"], "TRADING");

        assert_eq!(
            store.read("exchange_info", "rateLimits"),
            Some(json!([{"rateLimitType": "ORDERS", "limit": 50}]))
        );

        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn flat_topics_write_one_record_per_field() {
        let store = Arc::new(InMemoryTableStore::new());
        let mut sink = TableStoreSink::new(store.clone());

        sink.publish("system_status", &json!({"status": 1, "msg": "system maintenance"}))
            .unwrap();
        sink.publish("system_status", &json!({"status": 0}))
            .unwrap();

        let table = store.read_all("system_status").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["status"], json!(0));
        // Fields absent from a later snapshot are not removed.
        assert_eq!(table["msg"], json!("system maintenance"));
    }

    struct TickerParser;

    impl TopicParser for TickerParser {
        fn topic(&self) -> &str {
            "ticker"
        }

        fn parse(&self, message: &Value) -> Vec<ParsedRecord> {
            vec![ParsedRecord::new("prices", "last", message["price"].clone())]
        }
    }

    #[tokio::test]
    async fn custom_parsers_extend_the_sink() {
        let store = Arc::new(InMemoryTableStore::new());
        let mut sink = TableStoreSink::with_parsers(store.clone(), ParserRegistry::empty());

        sink.publish("system_status", &json!({"status": 0})).unwrap();
        assert!(store.read_all("system_status").is_none());

        sink.parsers_mut().register(TickerParser);
        sink.publish("ticker", &json!({"price": "42.0"})).unwrap();

        assert_eq!(sink.store().read("prices", "last"), Some(json!("42.0")));
    }

    #[tokio::test]
    async fn unknown_topic_leaves_store_untouched() {
        let store: Arc<dyn TableStore> = Arc::new(InMemoryTableStore::new());
        let mut sink = TableStoreSink::new(store.clone());

        sink.publish("ticker", &json!({"price": "1"})).unwrap();

        assert!(store.table_names().is_empty());
    }
}
