use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::domain::product_validation::ValidationError;

/// Failures observable at the catalog boundary.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Network request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed gateway response: {0}")]
    Decode(String),

    #[error("Product not found: {id}")]
    NotFound { id: String },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Operation timed out after {duration_secs} seconds")]
    Timeout { duration_secs: u64 },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<ValidationError> for CatalogError {
    fn from(err: ValidationError) -> Self {
        CatalogError::Validation {
            field: err.field().to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Network(err)
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

/// Structured logging helpers
pub struct LogHelper;

impl LogHelper {
    pub fn log_gateway_failure(operation: &str, error: &CatalogError) {
        error!(
            operation = %operation,
            error = %error,
            "Catalog gateway operation failed"
        );
    }

    pub fn log_validation_failure(field: &str, value: impl fmt::Display, reason: &str) {
        warn!(
            field = %field,
            value = %value,
            reason = %reason,
            "Validation failed"
        );
    }

    pub fn log_stale_result(operation: &str, generation: u64, current: u64) {
        debug!(
            operation = %operation,
            generation = generation,
            current = current,
            "Discarding superseded result"
        );
    }
}

/// User-friendly error messages
pub struct UserErrorFormatter;

impl UserErrorFormatter {
    pub fn format_for_ui(error: &CatalogError) -> String {
        match error {
            CatalogError::Network(_) => {
                "Network connection error. Please check your internet connection and try again.".to_string()
            }
            CatalogError::Http { status, .. } if *status == 401 || *status == 403 => {
                "The catalog service rejected the credentials.".to_string()
            }
            CatalogError::Http { status, .. } => {
                format!("The catalog service returned an error (HTTP {}).", status)
            }
            CatalogError::Decode(_) => {
                "The catalog service sent an unreadable response.".to_string()
            }
            CatalogError::NotFound { .. } => {
                "The requested product could not be found.".to_string()
            }
            CatalogError::Validation { field, reason } => {
                format!("Invalid {}: {}", field, reason)
            }
            CatalogError::Database(_) => {
                "A database error occurred. Please try again.".to_string()
            }
            CatalogError::Configuration { message } => {
                format!("Configuration error: {}", message)
            }
            CatalogError::Timeout { duration_secs } => {
                format!("Operation timed out after {} seconds", duration_secs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting() {
        let error = CatalogError::NotFound { id: "42".to_string() };
        let formatted = UserErrorFormatter::format_for_ui(&error);
        assert!(formatted.contains("could not be found"));
    }

    #[test]
    fn test_timeout_message() {
        let error = CatalogError::Timeout { duration_secs: 30 };
        assert_eq!(
            UserErrorFormatter::format_for_ui(&error),
            "Operation timed out after 30 seconds"
        );
    }

    #[test]
    fn test_auth_failures_get_dedicated_message() {
        let error = CatalogError::Http { status: 401, body: "{}".to_string() };
        assert!(UserErrorFormatter::format_for_ui(&error).contains("credentials"));

        let error = CatalogError::Http { status: 500, body: "boom".to_string() };
        assert!(UserErrorFormatter::format_for_ui(&error).contains("HTTP 500"));
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: CatalogError = ValidationError::StockOutOfRange { stock: -3 }.into();
        match err {
            CatalogError::Validation { field, reason } => {
                assert_eq!(field, "stock");
                assert!(reason.contains("-3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
