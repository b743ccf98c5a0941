// Exchange Info Parser
//
// Extracts per-instrument trading metadata (price and lot-size filters)
// from an exchange-info snapshot, plus the exchange's rate-limit list.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ParsedRecord, TopicParser};

pub const EXCHANGE_INFO_TOPIC: &str = "exchange_info";

/// Table holding one record per instrument.
pub const SYMBOLS_TABLE: &str = "symbols";

/// Key of the rate-limit record inside the `exchange_info` table.
pub const RATE_LIMITS_KEY: &str = "rateLimits";

/// Lot-size constraints of an instrument.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LotSize {
    pub min_qty: Value,
    pub max_qty: Value,
    pub step_size: Value,
}

/// Normalized metadata of a single instrument.
///
/// Fields are copied verbatim from the source payload; anything missing is
/// `Value::Null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolInfo {
    pub symbol: Value,
    pub base_asset: Value,
    pub quote_asset: Value,
    pub tick_size: Value,
    pub min_price: Value,
    pub max_price: Value,
    pub lot_size: LotSize,
    pub status: Value,
}

impl SymbolInfo {
    pub fn into_value(self) -> Value {
        json!({
            "symbol": self.symbol,
            "baseAsset": self.base_asset,
            "quoteAsset": self.quote_asset,
            "tickSize": self.tick_size,
            "minPrice": self.min_price,
            "maxPrice": self.max_price,
            "lotSize": {
                "minQty": self.lot_size.min_qty,
                "maxQty": self.lot_size.max_qty,
                "stepSize": self.lot_size.step_size,
            },
            "status": self.status,
        })
    }
}

fn field(object: &Value, name: &str) -> Value {
    object.get(name).cloned().unwrap_or(Value::Null)
}

fn list<'a>(object: &'a Value, name: &str) -> &'a [Value] {
    object
        .get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Extract per-instrument metadata from an exchange-info payload.
///
/// Returns `(identifier, info)` pairs in payload order. Instruments without
/// a string identifier are skipped. If a filter type appears more than
/// once, the last occurrence wins.
pub fn parse_symbols_info(response: &Value) -> Vec<(String, SymbolInfo)> {
    let mut out = Vec::new();

    for symbol_info in list(response, "symbols") {
        let Some(symbol) = symbol_info.get("symbol").and_then(Value::as_str) else {
            continue;
        };

        let mut info = SymbolInfo {
            symbol: Value::String(symbol.to_string()),
            base_asset: field(symbol_info, "baseAsset"),
            quote_asset: field(symbol_info, "quoteAsset"),
            status: field(symbol_info, "status"),
            ..SymbolInfo::default()
        };

        for filter in list(symbol_info, "filters") {
            match filter.get("filterType").and_then(Value::as_str) {
                Some("PRICE_FILTER") => {
                    info.min_price = field(filter, "minPrice");
                    info.max_price = field(filter, "maxPrice");
                    info.tick_size = field(filter, "tickSize");
                }
                Some("LOT_SIZE") => {
                    info.lot_size = LotSize {
                        min_qty: field(filter, "minQty"),
                        max_qty: field(filter, "maxQty"),
                        step_size: field(filter, "stepSize"),
                    };
                }
                _ => {}
            }
        }

        out.push((symbol.to_string(), info));
    }

    out
}

/// Parser for the `exchange_info` topic.
///
/// Emits one `symbols` record per instrument and one `exchange_info` record
/// under `rateLimits` holding the rate-limit list verbatim (null if missing).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeInfoParser;

impl TopicParser for ExchangeInfoParser {
    fn topic(&self) -> &str {
        EXCHANGE_INFO_TOPIC
    }

    fn parse(&self, message: &Value) -> Vec<ParsedRecord> {
        let mut records: Vec<ParsedRecord> = parse_symbols_info(message)
            .into_iter()
            .map(|(symbol, info)| ParsedRecord::new(SYMBOLS_TABLE, symbol, info.into_value()))
            .collect();

        records.push(ParsedRecord::new(
            EXCHANGE_INFO_TOPIC,
            RATE_LIMITS_KEY,
            field(message, RATE_LIMITS_KEY),
        ));

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> Value {
        json!({
            "rateLimits": [
                {"rateLimitType": "REQUEST_WEIGHT", "interval": "MINUTE", "limit": 6000}
            ],
            "symbols": [
                {
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
                }
            ]
        })
    }

    #[test]
    fn extracts_price_and_lot_size_filters() {
        let parsed = parse_symbols_info(&sample_response());
        assert_eq!(parsed.len(), 1);

        let (symbol, info) = &parsed[0];
        assert_eq!(symbol, "BTCUSDT");
        assert_eq!(
            info.clone().into_value(),
            json!({
                "symbol": "BTCUSDT",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "tickSize": "0.01000000",
                "minPrice": "10000.00000000",
                "maxPrice": "100000.00000000",
                "lotSize": {
                    "minQty": "0.00100000",
                    "maxQty": "100.00000000",
                    "stepSize": "0.00100000"
                },
                "status": "TRADING"
            })
        );
    }

    #[test]
    fn missing_filters_degrade_to_null() {
        let response = json!({
            "symbols": [
                {
                    "symbol": "ETHUSDT",
                    "status": "BREAK",
                    "filters": [{"filterType": "MIN_NOTIONAL", "minNotional": "10"}]
                }
            ]
        });

        let parsed = parse_symbols_info(&response);
        let (_, info) = &parsed[0];
        assert_eq!(info.status, json!("BREAK"));
        assert_eq!(info.base_asset, Value::Null);
        assert_eq!(info.tick_size, Value::Null);
        assert_eq!(info.lot_size, LotSize::default());
    }

    #[test]
    fn absent_symbols_list_yields_only_rate_limits() {
        let records = ExchangeInfoParser.parse(&json!({"timezone": "UTC"}));
        assert_eq!(
            records,
            vec![ParsedRecord::new(EXCHANGE_INFO_TOPIC, RATE_LIMITS_KEY, Value::Null)]
        );
    }

    #[test]
    fn instruments_without_identifier_are_skipped() {
        let response = json!({"symbols": [{"status": "TRADING"}, {"symbol": 42}]});
        assert!(parse_symbols_info(&response).is_empty());
    }

    #[test]
    fn parser_emits_symbol_and_rate_limit_records() {
        let response = sample_response();
        let records = ExchangeInfoParser.parse(&response);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].table, SYMBOLS_TABLE);
        assert_eq!(records[0].key, "BTCUSDT");
        assert_eq!(records[1].table, EXCHANGE_INFO_TOPIC);
        assert_eq!(records[1].value, response["rateLimits"]);
    }

    #[test]
    fn symbol_info_round_trips_through_serde() {
        let (_, info) = parse_symbols_info(&sample_response()).remove(0);
        let decoded: SymbolInfo = serde_json::from_value(info.clone().into_value()).unwrap();
        assert_eq!(decoded, info);
    }
}
