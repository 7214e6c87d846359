//! Service layer: business logic orchestration.
//!
//! [`IngestService`] accepts validated webhooks, runs the normalization
//! engine and routes both records to the configured
//! [`super::persistence::EventStore`].

pub mod ingest_service;

pub use ingest_service::{IngestService, Ingested, StorageMetadata};
