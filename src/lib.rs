//! pipexero - cross-system data integrity validation for Pipedrive and Xero
//!
//! Sales deals live in Pipedrive; quotes and cost-tracking projects live
//! in Xero. Nothing keeps the two sides consistent, so this crate fetches
//! both, cross-references them under a per-tenant policy, and reports
//! every mismatch as a structured [`ValidationIssue`](models::ValidationIssue).
//! A small fix layer can repair the findings that are safe to automate
//! (quote status transitions).
//!
//! ## Architecture
//! One validation run flows through six sequential steps:
//! fetch deals -> fetch quotes -> fetch projects -> deal rules ->
//! cross-system rules -> assemble. All remote access goes through the
//! `#[async_trait]` collaborator traits in [`api`], so the whole engine
//! runs against in-memory fakes in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pipexero::api::NullProgress;
//! use pipexero::config::TenantRegistry;
//! use pipexero::pipedrive::PipedriveClient;
//! use pipexero::rate_limit::{RateGate, RateLimits};
//! use pipexero::xero::{StaticTokenProvider, XeroClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = TenantRegistry::load("tenants.yaml")?;
//! let tenant = registry.get("tenant-a")?.clone();
//!
//! let gate = Arc::new(RateGate::new(RateLimits::default()));
//! let pipedrive = Arc::new(PipedriveClient::from_env()?);
//! let tokens = Arc::new(StaticTokenProvider::from_env()?);
//! let xero = Arc::new(XeroClient::new(tokens, Arc::clone(&gate))?);
//!
//! let session = pipexero::execute_validation_workflow(
//!     tenant,
//!     pipedrive,
//!     Arc::clone(&xero) as Arc<dyn pipexero::api::QuoteApi>,
//!     xero,
//!     gate,
//!     Arc::new(NullProgress),
//! )
//! .await?;
//! if let Some(result) = &session.result {
//!     println!("{} issues found", result.issues.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

// Error taxonomy shared by every layer
pub mod error;

// Immutable snapshots of remote records, issues and run reports
pub mod models;

// Tenant registry and per-tenant validation policy
pub mod config;

// Title, project-key and quote-number parsing
pub mod parsing;

// Shared outbound API budget gate
pub mod rate_limit;

// Collaborator traits the engine runs against
pub mod api;

// Concrete REST clients
pub mod pipedrive;
pub mod xero;

// Pagination and fan-out over the collaborator traits
pub mod fetch;

// The rule engine and its orchestrator
pub mod validation;

// Write-back repair of auto-fixable findings
pub mod fix;

// Convenience re-exports for the common entry points
pub use error::{FetchError, FixError, RateLimitError, SyncError, TransitionError, WorkflowFailure};
pub use fix::{FixConfig, FixContext, FixOrchestrator, FixOutcome};
pub use models::{ValidationIssue, ValidationResult, ValidationSession, ValidationSummary};
pub use rate_limit::{RateGate, RateLimits};
pub use validation::ValidationOrchestrator;

use api::{DealApi, ProgressSink, ProjectApi, QuoteApi};
use config::TenantConfig;

/// Runs the full validation workflow for one tenant and returns the
/// finished session.
///
/// Thin wrapper over [`ValidationOrchestrator`]; a failed step returns
/// [`WorkflowFailure`] carrying the partial session.
pub async fn execute_validation_workflow(
    tenant: TenantConfig,
    deal_api: Arc<dyn DealApi>,
    quote_api: Arc<dyn QuoteApi>,
    project_api: Arc<dyn ProjectApi>,
    gate: Arc<RateGate>,
    progress: Arc<dyn ProgressSink>,
) -> Result<ValidationSession, WorkflowFailure> {
    ValidationOrchestrator::new(tenant, deal_api, quote_api, project_api, gate)
        .with_progress(progress)
        .run()
        .await
}
