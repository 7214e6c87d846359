//! # pulse-gateway
//!
//! Webhook ingestion gateway for trading-indicator alerts.
//!
//! Automation platforms post loosely structured JSON: keys vary in casing
//! and punctuation, values arrive as strings or numbers, and the interesting
//! object is wrapped in platform-specific layers. The gateway stores every
//! accepted webhook verbatim and runs it through a normalization engine
//! that maps the payload onto a fixed, typed indicator record.
//!
//! ## Architecture
//!
//! ```text
//! Automation platform / dashboard (HTTP)
//!     │
//!     ├── REST Handlers + token auth (api/)
//!     │
//!     ├── IngestService (service/)
//!     │     └── IndicatorExtractor (normalize/)
//!     │           locate → resolve → coerce
//!     │
//!     └── EventStore (persistence/)
//!           MemoryStore │ SqliteStore │ LayeredStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod persistence;
pub mod service;
pub mod telemetry;
