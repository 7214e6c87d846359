//! Request and response bodies of the webhook and indicator endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{IndicatorRecord, RecordId, WebhookRecord};

/// Webhook envelope as sent by the automation platform.
///
/// Documentation only: the handler parses the body itself so that malformed
/// JSON and envelope errors get distinct responses.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "event": "alert",
    "id": "abc123",
    "triggeredAt": "2024-01-05T10:00:00Z",
    "data": {"ticker": "ETHUSD", "price": "2520.45", "mvrvz_eth": "0.85"}
}))]
pub struct WebhookEnvelopeDoc {
    /// Event name, required and non-blank.
    pub event: String,
    /// Optional idempotency key.
    pub id: Option<String>,
    /// Optional trigger time.
    pub triggered_at: Option<String>,
    /// Arbitrary payload object.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// Response for an accepted webhook.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAcceptedResponse {
    /// Always `"accepted"`.
    pub status: &'static str,
    /// Id of the stored webhook record.
    #[schema(value_type = String)]
    pub id: RecordId,
}

impl WebhookAcceptedResponse {
    /// Acknowledges the record with `id`.
    #[must_use]
    pub const fn accepted(id: RecordId) -> Self {
        Self {
            status: "accepted",
            id,
        }
    }
}

/// Webhook history page.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookHistoryResponse {
    /// Records, most recent first.
    pub items: Vec<WebhookRecord>,
    /// Number of records returned.
    pub count: usize,
}

impl From<Vec<WebhookRecord>> for WebhookHistoryResponse {
    fn from(items: Vec<WebhookRecord>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Indicator history page.
#[derive(Debug, Serialize, ToSchema)]
pub struct IndicatorHistoryResponse {
    /// Records, most recently received first.
    pub items: Vec<IndicatorRecord>,
    /// Number of records returned.
    pub count: usize,
}

impl From<Vec<IndicatorRecord>> for IndicatorHistoryResponse {
    fn from(items: Vec<IndicatorRecord>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}
