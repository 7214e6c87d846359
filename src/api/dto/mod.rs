//! Data Transfer Objects for REST request/response serialization.

pub mod common_dto;
pub mod webhook_dto;

pub use common_dto::*;
pub use webhook_dto::*;
