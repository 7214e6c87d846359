//! Webhook envelope validation and the stored webhook record.
//!
//! The envelope is untrusted input: only `event` and `data` are required,
//! everything else is optional and unknown top-level keys are kept so the
//! payload locator can still inspect them.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::RecordId;
use crate::error::GatewayError;

/// A validated webhook envelope.
///
/// Construct with [`WebhookEnvelope::from_value`]; a value of this type
/// always has a non-blank `event` and an object-valued `data` field.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEnvelope {
    id: Option<String>,
    event: String,
    triggered_at: Option<String>,
    body: Value,
}

impl WebhookEnvelope {
    /// Validates a parsed request body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the body is not an
    /// object, `event` is missing or blank, or `data` is not an object.
    pub fn from_value(body: Value) -> Result<Self, GatewayError> {
        let Some(object) = body.as_object() else {
            return Err(GatewayError::InvalidRequest(
                "payload must be a JSON object".to_string(),
            ));
        };

        let event = match object.get("event") {
            Some(Value::String(event)) if !event.trim().is_empty() => event.clone(),
            _ => {
                return Err(GatewayError::InvalidRequest(
                    "field \"event\" is required".to_string(),
                ));
            }
        };

        if !matches!(object.get("data"), Some(Value::Object(_))) {
            return Err(GatewayError::InvalidRequest(
                "field \"data\" must be an object".to_string(),
            ));
        }

        let id = match object.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
            _ => None,
        };

        let triggered_at = match object.get("triggeredAt") {
            Some(Value::String(at)) if !at.trim().is_empty() => Some(at.clone()),
            _ => None,
        };

        Ok(Self {
            id,
            event,
            triggered_at,
            body,
        })
    }

    /// Caller-supplied idempotency key, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Event name.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Caller-supplied trigger time, if any.
    #[must_use]
    pub fn triggered_at(&self) -> Option<&str> {
        self.triggered_at.as_deref()
    }

    /// The complete envelope as received.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Turns the envelope into a stored record received at `received_at`.
    ///
    /// Uses the caller's id when present, otherwise generates one.
    #[must_use]
    pub fn into_record(self, received_at: DateTime<Utc>) -> WebhookRecord {
        WebhookRecord {
            id: RecordId::from_client(self.id.as_deref()),
            event: self.event,
            triggered_at: self.triggered_at,
            received_at: received_at.trunc_subsecs(3),
            payload: self.body,
        }
    }
}

/// A webhook call as stored: immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRecord {
    /// Caller-supplied or generated identifier.
    #[schema(value_type = String)]
    pub id: RecordId,
    /// Event name.
    pub event: String,
    /// Caller-supplied trigger time, verbatim.
    pub triggered_at: Option<String>,
    /// Server-assigned receive time.
    #[serde(with = "crate::domain::timestamp")]
    #[schema(value_type = String, format = DateTime)]
    pub received_at: DateTime<Utc>,
    /// The original envelope.
    #[schema(value_type = Object)]
    pub payload: Value,
}
