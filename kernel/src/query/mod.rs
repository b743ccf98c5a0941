// Query Views
//
// Read-side projections over the table store for the query-serving layer.
// Absent tables and keys are mapped to `QueryError::NotFound` so callers
// can translate them to their own not-found response.

use serde_json::{json, Value};

use crate::parse::{EXCHANGE_INFO_TOPIC, RATE_LIMITS_KEY, SYMBOLS_TABLE};
use crate::table::TableStore;

pub const SYSTEM_STATUS_TABLE: &str = "system_status";
pub const ACCOUNT_INFO_TABLE: &str = "account_info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0} not found")]
    NotFound(String),
}

/// Named views, as exposed by the query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    RateLimits,
    Symbols,
    ExchangeStatus,
    AccountInfo,
}

impl View {
    pub const ALL: [View; 4] = [
        View::RateLimits,
        View::Symbols,
        View::ExchangeStatus,
        View::AccountInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            View::RateLimits => "rate_limits",
            View::Symbols => "symbols",
            View::ExchangeStatus => "exchange_status",
            View::AccountInfo => "account_info",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    pub fn render(self, store: &dyn TableStore) -> Result<Value, QueryError> {
        match self {
            View::RateLimits => rate_limits(store),
            View::Symbols => symbols(store),
            View::ExchangeStatus => exchange_status(store),
            View::AccountInfo => account_info(store),
        }
    }
}

fn present(value: Option<Value>, what: &str) -> Result<Value, QueryError> {
    match value {
        Some(Value::Null) | None => Err(QueryError::NotFound(what.to_string())),
        Some(value) => Ok(value),
    }
}

/// Like `present`, but also rejects empty documents, `false`, `0` and `""`.
fn non_empty(value: Option<Value>, what: &str) -> Result<Value, QueryError> {
    let empty = match &value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
    };
    match value {
        Some(value) if !empty => Ok(value),
        _ => Err(QueryError::NotFound(what.to_string())),
    }
}

fn whole_table(store: &dyn TableStore, table: &str) -> Result<Value, QueryError> {
    store
        .read_all(table)
        .map(|t| Value::Object(t.into_iter().collect()))
        .ok_or_else(|| QueryError::NotFound(format!("table `{table}`")))
}

/// The exchange's rate-limit list.
pub fn rate_limits(store: &dyn TableStore) -> Result<Value, QueryError> {
    present(store.read(EXCHANGE_INFO_TOPIC, RATE_LIMITS_KEY), "rate limits")
}

/// `{"symbols": [...]}` listing every known instrument identifier.
pub fn symbols(store: &dyn TableStore) -> Result<Value, QueryError> {
    let table = store
        .read_all(SYMBOLS_TABLE)
        .ok_or_else(|| QueryError::NotFound(format!("table `{SYMBOLS_TABLE}`")))?;
    let names: Vec<String> = table.into_keys().collect();
    Ok(json!({ "symbols": names }))
}

/// Reference information for one instrument.
pub fn symbol_info(store: &dyn TableStore, symbol: &str) -> Result<Value, QueryError> {
    non_empty(store.read(SYMBOLS_TABLE, symbol), &format!("symbol `{symbol}`"))
}

pub fn exchange_status(store: &dyn TableStore) -> Result<Value, QueryError> {
    whole_table(store, SYSTEM_STATUS_TABLE)
}

pub fn account_info(store: &dyn TableStore) -> Result<Value, QueryError> {
    whole_table(store, ACCOUNT_INFO_TABLE)
}
