//! Collaborator traits for the two upstream services
//!
//! The fetch, validation and fix layers only ever see these traits.
//! Production code wires in the HTTP clients from [`crate::pipedrive`]
//! and [`crate::xero`]; tests substitute in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Deal, DealProduct, LineItem, Project, Quote, QuoteStatus, StepRecord};

// ---------------------------------------------------------------------------
// CRM side
// ---------------------------------------------------------------------------

/// Status filter accepted by the CRM deal listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStatusFilter {
    Open,
    Won,
    Lost,
    /// Everything except deleted deals.
    AllNotDeleted,
}

impl DealStatusFilter {
    /// Value for the endpoint's `status` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::AllNotDeleted => "all_not_deleted",
        }
    }
}

/// One page of deals from the CRM's offset-based pagination.
#[derive(Debug, Clone)]
pub struct DealPage {
    pub deals: Vec<Deal>,
    pub more_items: bool,
    /// Offset to request next, when `more_items` is set.
    pub next_start: Option<u32>,
}

#[async_trait]
pub trait DealApi: Send + Sync {
    /// Fetch one page of deals in a pipeline.
    async fn fetch_deal_page(
        &self,
        pipeline_id: i64,
        status: DealStatusFilter,
        start: u32,
        limit: u32,
    ) -> anyhow::Result<DealPage>;

    /// Fetch the products attached to a deal.
    async fn fetch_deal_products(&self, deal_id: i64) -> anyhow::Result<Vec<DealProduct>>;
}

// ---------------------------------------------------------------------------
// Accounting side
// ---------------------------------------------------------------------------

/// One page of projects, with the page count the endpoint reports.
#[derive(Debug, Clone)]
pub struct ProjectPage {
    pub projects: Vec<Project>,
    pub page_count: u32,
}

#[async_trait]
pub trait QuoteApi: Send + Sync {
    /// Fetch one page of quotes, all statuses. Pages are 1-based; a
    /// short or empty page means the listing is exhausted.
    async fn fetch_quote_page(&self, page: u32) -> anyhow::Result<Vec<Quote>>;

    /// Look up a single quote by its id. `None` when the id is unknown.
    async fn fetch_quote_by_id(&self, quote_id: &Uuid) -> anyhow::Result<Option<Quote>>;

    /// Look up a single quote by its human-facing number.
    async fn fetch_quote_by_number(&self, quote_number: &str) -> anyhow::Result<Option<Quote>>;

    /// Persist a status change and return the server's representation.
    async fn update_quote_status(
        &self,
        quote_id: &Uuid,
        status: QuoteStatus,
    ) -> anyhow::Result<Quote>;

    /// Replace a quote's line items and return the server's
    /// representation.
    async fn update_quote_line_items(
        &self,
        quote_id: &Uuid,
        line_items: &[LineItem],
    ) -> anyhow::Result<Quote>;
}

#[async_trait]
pub trait ProjectApi: Send + Sync {
    /// Fetch one page of in-progress projects. Pages are 1-based.
    async fn fetch_project_page(&self, page: u32) -> anyhow::Result<ProjectPage>;
}

/// A token plus the tenant it resolved to.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
    pub effective_tenant_id: String,
}

/// Supplies a currently valid bearer token for the accounting API,
/// refreshing behind the scenes when needed.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn ensure_valid_token(&self) -> anyhow::Result<AccessGrant>;
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Receives step transitions while a validation session runs. The CLI
/// renders these; library callers usually pass [`NullProgress`].
pub trait ProgressSink: Send + Sync {
    fn on_step(&self, step: &StepRecord);
}

/// Sink that discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_step(&self, _step: &StepRecord) {}
}
