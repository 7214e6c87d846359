//! Payload normalization engine.
//!
//! Turns loosely structured webhook payloads into typed indicator records:
//!
//! ```text
//! WebhookRecord / JSON
//!     │
//!     ├── PayloadLocator (locate)   find the indicator-shaped object
//!     ├── FieldResolver (resolve)   synonym + normalized-key lookup
//!     ├── coercers (coerce)         string / number / boolean / timestamp
//!     │
//!     └── IndicatorExtractor (extract) → IndicatorRecord
//! ```
//!
//! Every stage is pure apart from the key normalizer's memo cache, which
//! never changes results.

pub mod coerce;
pub mod extract;
pub mod key;
pub mod locate;
pub mod resolve;

pub use coerce::{
    boolean_from_str, coerce_boolean, coerce_date_string, coerce_number, coerce_string,
    format_timestamp, parse_positive_int,
};
pub use extract::IndicatorExtractor;
pub use key::{KeyNormalizer, normalize_key};
pub use locate::PayloadLocator;
pub use resolve::{FieldResolver, resolve};
