//! Comprehensive error handling for the Pipedrive/Xero sync system
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling.

use thiserror::Error;

use crate::models::quote::QuoteStatus;
use crate::models::report::ValidationSession;

/// Main error type for the sync system
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("Fix error: {0}")]
    Fix(#[from] FixError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tenant configuration and registry errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read tenant registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("tenant registry is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unknown tenant '{tenant_id}'")]
    UnknownTenant { tenant_id: String },

    #[error("duplicate tenant id '{tenant_id}' in registry")]
    DuplicateTenant { tenant_id: String },

    #[error("tenant '{tenant_id}' has no custom field mapping for '{field}'")]
    MissingFieldMapping { tenant_id: String, field: String },

    #[error("invalid tenant '{tenant_id}': {reason}")]
    InvalidTenant { tenant_id: String, reason: String },
}

/// Errors raised while pulling collections from the remote APIs
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Pipedrive request failed: {message}")]
    Pipedrive { message: String },

    #[error("Xero request failed: {message}")]
    Xero { message: String },

    #[error("unexpected response shape from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

/// Errors raised by the shared API budget gate
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("daily API budget exhausted: {remaining} calls left, buffer is {buffer}")]
    DailyBudgetExhausted { remaining: u32, buffer: u32 },
}

/// Quote status graph violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("no transition path from {from} to {to}")]
    NoPath { from: QuoteStatus, to: QuoteStatus },
}

/// Errors raised while applying fixes against Xero
#[derive(Error, Debug)]
pub enum FixError {
    #[error("quote {quote_number} is INVOICED and its line items cannot be modified")]
    InvoicedImmutable { quote_number: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("issue code {code} has no automated fix")]
    NotFixable { code: String },

    #[error("issue {code} is missing fix metadata: {detail}")]
    MissingMetadata { code: String, detail: String },

    #[error("write to Xero failed after {attempts} attempt(s): {message}")]
    WriteFailed { attempts: u32, message: String },

    #[error("fix target quote {quote_id} is not in the fetched collection")]
    QuoteNotLoaded { quote_id: String },

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

/// A validation run that aborted partway through.
///
/// Carries the session so callers keep the results of the steps that did
/// complete before the failing one.
#[derive(Error, Debug)]
#[error("validation run failed at step '{failed_step}': {message}")]
pub struct WorkflowFailure {
    pub failed_step: String,
    pub message: String,
    pub session: Box<ValidationSession>,
}

/// Result type aliases for convenience
pub type SyncResult<T> = Result<T, SyncError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type FetchResult<T> = Result<T, FetchError>;
pub type FixResult<T> = Result<T, FixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::UnknownTenant {
            tenant_id: "acme".to_string(),
        };
        assert_eq!(err.to_string(), "unknown tenant 'acme'");

        let err = RateLimitError::DailyBudgetExhausted {
            remaining: 12,
            buffer: 50,
        };
        assert!(err.to_string().contains("12 calls left"));
    }

    #[test]
    fn test_error_conversion() {
        let rate = RateLimitError::DailyBudgetExhausted {
            remaining: 0,
            buffer: 50,
        };
        let fetch: FetchError = rate.into();
        let sync: SyncError = fetch.into();
        assert!(matches!(sync, SyncError::Fetch(FetchError::RateLimit(_))));
    }

    #[test]
    fn test_transition_error_display() {
        let err = TransitionError::NoPath {
            from: QuoteStatus::Draft,
            to: QuoteStatus::Invoiced,
        };
        assert_eq!(err.to_string(), "no transition path from DRAFT to INVOICED");
    }
}
