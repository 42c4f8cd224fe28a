//! Custom error types for the application.
//!
//! `AppError` is the error type of everything above the property layer:
//! configuration loading, opening transports, building instruments from
//! configuration and running procedures. Property accesses themselves fail with
//! [`ScpiError`], which converts into `AppError::Instrument`.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically file parsing or type
//!   mismatches in the configuration.
//! - **`Configuration`**: Semantic errors that pass parsing but are logically
//!   invalid (duplicate ids, zero timeouts). Caught during validation.
//! - **`Instrument`**: Any failure reported by the property layer, including
//!   connection failures.
//! - **`Procedure`**: A procedure could not continue (empty sweep, zero input).
//! - **`UnknownInstrument`**: An instrument id not present in the configuration.

use scpi_core::ScpiError;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("Instrument error: {0}")]
    Instrument(#[from] ScpiError),

    #[error("Procedure error: {0}")]
    Procedure(String),

    #[error("Unknown instrument '{0}'")]
    UnknownInstrument(String),
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(Box::new(err))
    }
}
