use serde_json::Value;

use super::{ParsedRecord, TopicParser};

/// Emits each top-level field of an object payload as its own record in a
/// table named after the topic, keyed by the field name.
///
/// Non-object payloads produce no records.
#[derive(Debug, Clone)]
pub struct FlatParser {
    topic: String,
}

impl FlatParser {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

impl TopicParser for FlatParser {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn parse(&self, message: &Value) -> Vec<ParsedRecord> {
        let Some(fields) = message.as_object() else {
            return Vec::new();
        };

        fields
            .iter()
            .map(|(key, value)| ParsedRecord::new(self.topic.as_str(), key.as_str(), value.clone()))
            .collect()
    }
}
