//! Builds canonical [`IndicatorRecord`]s from raw webhook records.

use serde_json::{Map, Value};

use super::coerce::{coerce_date_string, coerce_number, coerce_string};
use super::key::KeyNormalizer;
use super::locate::{PayloadLocator, unwrap_data};
use super::resolve::FieldResolver;
use crate::domain::{IndicatorRecord, WebhookRecord};

/// Accepted spellings per logical field, most preferred first.
pub mod fields {
    /// Instrument symbol.
    pub const TICKER: &[&str] = &["ticker", "symbol", "pair", "market_pair", "instrument"];
    /// Trading venue.
    pub const EXCHANGE: &[&str] = &["exchange", "venue", "market"];
    /// Chart timeframe.
    pub const TIMEFRAME: &[&str] = &["timeframe", "interval", "resolution"];
    /// Alert condition.
    pub const CONDITION: &[&str] = &["condition", "rule", "direction"];
    /// Price at alert time.
    pub const PRICE: &[&str] = &["price", "close", "last_price"];
    /// Bitcoin MVRV Z-score.
    pub const MVRVZ_BTC: &[&str] = &["mvrvz_btc", "mvrvzbtc", "mvrvz_btc_value"];
    /// Ether MVRV Z-score.
    pub const MVRVZ_ETH: &[&str] = &["mvrvz_eth", "mvrvzeth", "mvrvz_eth_value"];
    /// Free-form alert message.
    pub const MESSAGE: &[&str] = &[
        "message",
        "alert",
        "description",
        "payload_alert_message",
        "payload alert message",
    ];
    /// Originating channel.
    pub const SOURCE: &[&str] = &["source", "origin", "channel"];
    /// Primary asset of the alert.
    pub const PRIMARY_ASSET: &[&str] = &["message_mvrvz", "payload_alert_message_mvrvz", "asset"];
    /// Trigger time inside the payload.
    pub const TRIGGERED_AT: &[&str] = &["triggered_at", "time"];
    /// Receive time inside the payload.
    pub const RECEIVED_AT: &[&str] = &["received_at"];
}

/// Deterministic extractor of indicator records.
///
/// Holds the key normalizer (and its cache) and the payload locator. The
/// extractor has no other state: extracting the same input twice yields
/// identical records.
#[derive(Debug, Default)]
pub struct IndicatorExtractor {
    normalizer: KeyNormalizer,
    locator: PayloadLocator,
}

impl IndicatorExtractor {
    /// Creates an extractor with a cached normalizer and the default locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor from explicit parts.
    #[must_use]
    pub const fn with_parts(normalizer: KeyNormalizer, locator: PayloadLocator) -> Self {
        Self {
            normalizer,
            locator,
        }
    }

    /// The key normalizer used for field matching.
    #[must_use]
    pub const fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    /// Extracts an indicator from a stored webhook record.
    #[must_use]
    pub fn extract_webhook(&self, record: &WebhookRecord) -> Option<IndicatorRecord> {
        let value = serde_json::to_value(record).ok()?;
        self.extract(&value)
    }

    /// Extracts an indicator from any JSON-shaped webhook record.
    ///
    /// The search root is `record.payload`, else `record.data`, else the
    /// record itself. The single-level `data` unwrap of the root is used
    /// when it carries a ticker, MVRV Z-score or message; otherwise the
    /// first indicator-shaped object the locator finds under the root is
    /// used. Returns `None` when neither yields such content.
    #[must_use]
    pub fn extract(&self, record: &Value) -> Option<IndicatorRecord> {
        let envelope = record.as_object()?;
        let root = present(envelope, "payload")
            .or_else(|| present(envelope, "data"))
            .unwrap_or(record);

        let direct = unwrap_data(root).map(|payload| self.build(envelope, payload));
        if let Some(extracted) = direct.as_ref()
            && extracted.has_indicator_content()
        {
            return direct;
        }

        let located = self
            .locator
            .locate(root, &self.normalizer)
            .map(|payload| self.build(envelope, payload));
        match located {
            Some(extracted) if extracted.has_indicator_content() => Some(extracted),
            _ => {
                tracing::debug!(
                    id = envelope.get("id").and_then(serde_json::Value::as_str).unwrap_or("-"),
                    "webhook record carries no indicator data"
                );
                None
            }
        }
    }

    fn build(&self, envelope: &Map<String, Value>, payload: &Map<String, Value>) -> IndicatorRecord {
        let resolver = FieldResolver::new(payload, &self.normalizer);
        let text = |keys: &[&str]| non_empty(coerce_string(resolver.resolve(keys)));
        let number = |keys: &[&str]| coerce_number(resolver.resolve(keys));

        let triggered_at = coerce_date_string(
            present(envelope, "triggeredAt").or_else(|| resolver.resolve(fields::TRIGGERED_AT)),
        );
        let received_at = coerce_date_string(
            present(envelope, "receivedAt").or_else(|| resolver.resolve(fields::RECEIVED_AT)),
        );

        IndicatorRecord {
            id: non_empty(coerce_string(envelope.get("id"))),
            event: non_empty(coerce_string(envelope.get("event"))),
            ticker: text(fields::TICKER),
            exchange: text(fields::EXCHANGE),
            timeframe: text(fields::TIMEFRAME),
            condition: text(fields::CONDITION),
            price: number(fields::PRICE),
            mvrvz_btc: number(fields::MVRVZ_BTC),
            mvrvz_eth: number(fields::MVRVZ_ETH),
            message: text(fields::MESSAGE),
            source: text(fields::SOURCE),
            primary_asset: text(fields::PRIMARY_ASSET),
            triggered_at,
            received_at,
            raw_payload: Value::Object(payload.clone()).to_string(),
        }
    }
}

/// Value of `key` unless it is absent or `null`.
fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::WebhookEnvelope;
    use chrono::DateTime;
    use serde_json::json;

    fn extract(value: &Value) -> Option<IndicatorRecord> {
        IndicatorExtractor::new().extract(value)
    }

    #[test]
    fn empty_data_yields_no_indicator() {
        assert!(extract(&json!({"event": "x", "data": {}})).is_none());
    }

    #[test]
    fn non_objects_yield_no_indicator() {
        assert!(extract(&json!("alert")).is_none());
        assert!(extract(&json!({"payload": "opaque"})).is_none());
    }

    #[test]
    fn extracts_fuzzy_keys_from_envelope() {
        let envelope = json!({"event": "alert", "data": {"Ticker": "BTCUSD", "MVRVZ (BTC)": "0.41"}});
        let Some(record) = extract(&envelope) else {
            panic!("expected indicator");
        };
        assert_eq!(record.ticker.as_deref(), Some("BTCUSD"));
        assert_eq!(record.mvrvz_btc, Some(0.41));
        assert_eq!(record.mvrvz_eth, None);
        assert_eq!(record.event.as_deref(), Some("alert"));

        let Some(raw) = record.raw_payload_value() else {
            panic!("raw payload should be JSON");
        };
        assert!(raw.get("Ticker").is_some());
        assert!(raw.get("MVRVZ (BTC)").is_some());
    }

    #[test]
    fn extracts_from_stored_webhook_record() {
        let envelope = json!({
            "event": "alert",
            "id": "abc123",
            "triggeredAt": "1700000000000",
            "data": {"ticker": "ETHUSD", "price": "2520.45", "mvrvz_eth": "0.85", "Exchange": " BINANCE "}
        });
        let Ok(envelope) = WebhookEnvelope::from_value(envelope) else {
            panic!("valid envelope");
        };
        let Some(at) = DateTime::from_timestamp_millis(1_700_000_100_000) else {
            panic!("valid timestamp");
        };
        let webhook = envelope.into_record(at);

        let Some(record) = IndicatorExtractor::new().extract_webhook(&webhook) else {
            panic!("expected indicator");
        };
        assert_eq!(record.id.as_deref(), Some("abc123"));
        assert_eq!(record.ticker.as_deref(), Some("ETHUSD"));
        assert_eq!(record.exchange.as_deref(), Some("BINANCE"));
        assert_eq!(record.price, Some(2520.45));
        assert_eq!(record.mvrvz_eth, Some(0.85));
        assert_eq!(record.mvrvz_btc, None);
        assert_eq!(record.triggered_at.as_deref(), Some("2023-11-14T22:13:20.000Z"));
        assert_eq!(record.received_at.as_deref(), Some("2023-11-14T22:15:00.000Z"));
    }

    #[test]
    fn message_alone_is_enough() {
        let Some(record) = extract(&json!({"data": {"Payload Alert Message": "MVRVZ above 7"}})) else {
            panic!("expected indicator");
        };
        assert_eq!(record.message.as_deref(), Some("MVRVZ above 7"));
        assert_eq!(record.ticker, None);
    }

    #[test]
    fn price_without_identifying_fields_is_noise() {
        assert!(extract(&json!({"data": {"price": 100, "exchange": "X"}})).is_none());
    }

    #[test]
    fn unparsable_fields_degrade_individually() {
        let envelope = json!({"data": {"ticker": "BTC", "price": "n/a", "mvrvz_btc": {"v": 1}}});
        let Some(record) = extract(&envelope) else {
            panic!("expected indicator");
        };
        assert_eq!(record.ticker.as_deref(), Some("BTC"));
        assert_eq!(record.price, None);
        assert_eq!(record.mvrvz_btc, None);
    }

    #[test]
    fn finds_deeply_wrapped_payloads() {
        let envelope = json!({
            "event": "zap",
            "data": {"zap_meta": {"step": 2}, "result": {"fields": {"symbol": "SOLUSD", "close": 142.5}}}
        });
        let Some(record) = extract(&envelope) else {
            panic!("expected indicator");
        };
        assert_eq!(record.ticker.as_deref(), Some("SOLUSD"));
        assert_eq!(record.price, Some(142.5));
        assert_eq!(record.raw_payload, r#"{"symbol":"SOLUSD","close":142.5}"#);
    }

    #[test]
    fn unshaped_data_still_resolves_synonyms() {
        let Some(record) = extract(&json!({"data": {"pair": "BTC/USDT", "interval": "4h"}})) else {
            panic!("expected indicator");
        };
        assert_eq!(record.ticker.as_deref(), Some("BTC/USDT"));
        assert_eq!(record.timeframe.as_deref(), Some("4h"));
    }

    #[test]
    fn payload_time_is_used_without_envelope_time() {
        let envelope = json!({"data": {"ticker": "BTC", "Time": "2024-01-05 10:00"}});
        let Some(record) = extract(&envelope) else {
            panic!("expected indicator");
        };
        assert_eq!(record.triggered_at.as_deref(), Some("2024-01-05T10:00:00.000Z"));
        assert_eq!(record.received_at, None);
        assert_eq!(record.id, None);
    }

    #[test]
    fn data_fields_win_over_nested_price_object() {
        let envelope = json!({
            "event": "alert",
            "data": {"pair": "BTCUSD", "alert": "MVRVZ crossed 7", "quote": {"price": "68500"}}
        });
        let Some(record) = extract(&envelope) else {
            panic!("expected indicator");
        };
        assert_eq!(record.ticker.as_deref(), Some("BTCUSD"));
        assert_eq!(record.message.as_deref(), Some("MVRVZ crossed 7"));
        let Some(raw) = record.raw_payload_value() else {
            panic!("raw payload should be JSON");
        };
        assert!(raw.get("quote").is_some());
    }

    #[test]
    fn nested_message_does_not_hide_data_ticker() {
        let envelope = json!({"event": "alert", "data": {"pair": "BTCUSD", "meta": {"message": "hi"}}});
        let Some(record) = extract(&envelope) else {
            panic!("expected indicator");
        };
        assert_eq!(record.ticker.as_deref(), Some("BTCUSD"));
        assert_eq!(record.message, None);
        assert_eq!(record.raw_payload, r#"{"pair":"BTCUSD","meta":{"message":"hi"}}"#);
    }

    #[test]
    fn extraction_is_idempotent() {
        let envelope = json!({"event": "alert", "id": "a", "data": {"ticker": "X", "mvrvz_btc": 1.5, "time": 1_700_000_000_000_i64}});
        let extractor = IndicatorExtractor::new();
        assert_eq!(extractor.extract(&envelope), extractor.extract(&envelope));
    }
}
