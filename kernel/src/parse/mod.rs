// Message Parsing
//
// Normalizes raw topic payloads into `(table, key, value)` triples ready
// for the table store. Parsers never fail: missing fields degrade to null
// values or to zero records.

mod exchange_info;
mod flat;

pub use exchange_info::{
    parse_symbols_info, ExchangeInfoParser, LotSize, SymbolInfo, EXCHANGE_INFO_TOPIC,
    RATE_LIMITS_KEY, SYMBOLS_TABLE,
};
pub use flat::FlatParser;

use serde_json::Value;
use std::collections::HashMap;

/// A single normalized record.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub table: String,
    pub key: String,
    pub value: Value,
}

impl ParsedRecord {
    pub fn new(table: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            value,
        }
    }
}

/// Trait implemented by all topic parsers.
///
/// Parsers must be:
/// - Pure
/// - Deterministic
/// - Infallible (degrade, never raise)
pub trait TopicParser: Send + Sync {
    fn topic(&self) -> &str;

    fn parse(&self, message: &Value) -> Vec<ParsedRecord>;
}

/// Registry mapping topic names to their parser.
pub struct ParserRegistry {
    parsers: HashMap<String, Box<dyn TopicParser>>,
}

impl ParserRegistry {
    /// Create a registry with no parsers.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register a parser, replacing any existing parser for the same topic.
    pub fn register<P: TopicParser + 'static>(&mut self, parser: P) {
        self.parsers
            .insert(parser.topic().to_string(), Box::new(parser));
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.parsers.contains_key(topic)
    }

    /// Parse a message for `topic`.
    ///
    /// Unregistered topics produce no records.
    pub fn parse(&self, topic: &str, message: &Value) -> Vec<ParsedRecord> {
        match self.parsers.get(topic) {
            Some(parser) => parser.parse(message),
            None => Vec::new(),
        }
    }
}

impl Default for ParserRegistry {
    /// Registry with the reference topics: `exchange_info`, `system_status`,
    /// `account_info`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ExchangeInfoParser);
        registry.register(FlatParser::new("system_status"));
        registry.register(FlatParser::new("account_info"));
        registry
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut topics: Vec<_> = self.parsers.keys().collect();
        topics.sort();
        f.debug_struct("ParserRegistry")
            .field("topics", &topics)
            .finish()
    }
}
