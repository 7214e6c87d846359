//! Canonical indicator record derived from a webhook payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Flat, typed view of the indicator fields found in a webhook payload.
///
/// Produced by [`crate::normalize::IndicatorExtractor`] and stored as-is by
/// every persistence adapter. Text fields are `None` rather than empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IndicatorRecord {
    /// Id of the webhook record this indicator was derived from.
    pub id: Option<String>,
    /// Event name of the originating webhook.
    pub event: Option<String>,
    /// Instrument symbol, e.g. `"BTCUSD"`.
    pub ticker: Option<String>,
    /// Venue the alert refers to.
    pub exchange: Option<String>,
    /// Chart timeframe, e.g. `"1D"`.
    pub timeframe: Option<String>,
    /// Alert condition or direction.
    pub condition: Option<String>,
    /// Price at alert time.
    pub price: Option<f64>,
    /// Bitcoin MVRV Z-score.
    pub mvrvz_btc: Option<f64>,
    /// Ether MVRV Z-score.
    pub mvrvz_eth: Option<f64>,
    /// Free-form alert message.
    pub message: Option<String>,
    /// Originating channel or integration.
    pub source: Option<String>,
    /// Asset the alert is primarily about.
    pub primary_asset: Option<String>,
    /// When the source event fired (ISO-8601, or the raw text if unparsable).
    pub triggered_at: Option<String>,
    /// When the webhook was received (ISO-8601).
    pub received_at: Option<String>,
    /// JSON serialization of the exact object the fields were read from.
    pub raw_payload: String,
}

impl IndicatorRecord {
    /// Returns `true` when the record carries a ticker, an MVRV Z-score or a
    /// message. Records without any of these are noise and are not stored.
    #[must_use]
    pub fn has_indicator_content(&self) -> bool {
        self.ticker.is_some()
            || self.mvrvz_btc.is_some()
            || self.mvrvz_eth.is_some()
            || self.message.is_some()
    }

    /// Parses [`Self::raw_payload`] back into JSON.
    #[must_use]
    pub fn raw_payload_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.raw_payload).ok()
    }
}
