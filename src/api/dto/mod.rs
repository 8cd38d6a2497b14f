//! Data Transfer Objects for REST request/response serialization.

pub mod snapshot_dto;

pub use snapshot_dto::*;
