//! # API Shared
//!
//! Shared utilities and definitions for the greencard APIs.
//!
//! Contains:
//! - Wire response types with OpenAPI schemas (`pb` module)
//! - Shared services like `HealthService`
//! - API key validation
//!
//! Used by `api-rest` and the CLI for common functionality.

pub mod auth;
pub mod health;
pub mod pb;

pub use auth::{validate_api_key, AuthError};
pub use health::HealthService;
pub use pb::*;
