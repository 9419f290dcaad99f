//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when an item is not found.
//! - [`RebuildTooLarge`] thrown when a historical edit would force an
//!   unconfirmed large snapshot rebuild.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`RebuildTooLarge`]: EngineError::RebuildTooLarge
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid classification: {0}")]
    InvalidClassification(String),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
    #[error("Rebuild too large: {0}")]
    RebuildTooLarge(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidClassification(a), Self::InvalidClassification(b)) => a == b,
            (Self::InvalidLink(a), Self::InvalidLink(b)) => a == b,
            (Self::RebuildTooLarge(a), Self::RebuildTooLarge(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
