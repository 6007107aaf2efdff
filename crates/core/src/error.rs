// Central Error Type for the data-access layer

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller configuration error, raised before any provider interaction
    #[error("Configuration error: {0}")]
    Config(#[from] crate::domain::ConfigError),

    /// Statement rejected by the provider (reads, staging, commit/rollback)
    #[error("Database error: {0}")]
    Database(String),

    /// Raw stored-procedure call rejected by the provider.
    /// Carries the executed statement text, never the parameter values.
    #[error("Stored procedure {procedure} failed ( {statement} ): {message}")]
    Procedure {
        procedure: String,
        statement: String,
        message: String,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a provider failure with the statement that produced it
    pub fn procedure(procedure: &str, statement: &str, source: AppError) -> Self {
        let message = match source {
            AppError::Database(msg) => msg,
            other => other.to_string(),
        };
        AppError::Procedure {
            procedure: procedure.to_string(),
            statement: statement.to_string(),
            message,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
