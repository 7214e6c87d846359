//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::normalize::parse_positive_int;

/// Query parameters for history endpoints.
///
/// `limit` is kept as text and read leniently: the leading digits of the
/// value count, anything non-positive or unparsable means "use the
/// default".
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Maximum number of records to return.
    #[param(value_type = Option<u32>, example = 20)]
    pub limit: Option<String>,
}

impl HistoryParams {
    /// The requested limit, if one was given and is positive.
    #[must_use]
    pub fn requested(&self) -> Option<usize> {
        self.limit.as_deref().and_then(parse_positive_int)
    }
}
