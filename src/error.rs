//! Error handling for the shadow portfolio pipeline
//!
//! Defines the domain error types and a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for portfolio operations
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("pricing error: {0}")]
    PricingError(String),

    #[error("config error: {0}")]
    ConfigError(String),
}

/// Result type alias for portfolio operations
pub type Result<T> = anyhow::Result<T>;
