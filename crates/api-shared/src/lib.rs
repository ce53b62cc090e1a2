//! # API Shared
//!
//! Shared request and response types for the HTS dashboard APIs.
//!
//! Contains:
//! - Wire types with OpenAPI schemas (`dto` module)
//! - Conversions from the core dashboard types
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the workspace's server binary.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
