//! Shared utilities, configuration, and error handling for Duet
//!
//! This crate provides common functionality used across the Duet workspace:
//! - Configuration management following 12-factor principles
//! - Error types and their HTTP mapping
//! - Store timeout guard
//! - Request extractors

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;

pub use config::{Config, LogFormat};
pub use db::{bounded, RepositoryError, DEFAULT_STORE_TIMEOUT};
pub use error::{Error, Result};
pub use extractors::ValidatedJson;
