//! Webhook record identifier.
//!
//! [`RecordId`] is either the idempotency key supplied by the caller or a
//! freshly generated UUID v4. Keeping it a newtype stops record ids from
//! being confused with arbitrary payload strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a webhook record and of the indicator derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generates a new random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Uses a caller-supplied id when it is non-blank, otherwise generates one.
    ///
    /// The supplied value is kept as sent; only the blank check trims.
    #[must_use]
    pub fn from_client(candidate: Option<&str>) -> Self {
        match candidate {
            Some(id) if !id.trim().is_empty() => Self(id.to_string()),
            _ => Self::generate(),
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
