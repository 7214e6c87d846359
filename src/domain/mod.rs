//! Domain layer: record identity, webhook envelopes and records, and the
//! canonical indicator record.

pub mod indicator;
pub mod record_id;
pub mod timestamp;
pub mod webhook;

pub use indicator::IndicatorRecord;
pub use record_id::RecordId;
pub use webhook::{WebhookEnvelope, WebhookRecord};
