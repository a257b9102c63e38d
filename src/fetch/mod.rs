//! Paginated retrieval of the full record universe
//!
//! Validation needs every deal, quote and project, not just the first
//! page; the fetchers here loop until the upstream APIs report
//! exhaustion, calling the shared [`RateGate`](crate::rate_limit::RateGate)
//! before each request.
//!
//! Failure posture differs by source. A single pipeline failing during
//! the multi-pipeline deal fetch is logged and skipped; quotes and
//! projects are all-or-nothing and propagate their error to the
//! orchestrator.

mod deals;
mod xero;

pub use deals::DealFetcher;
pub use xero::XeroFetcher;

/// Page size requested from both upstream APIs.
pub(crate) const PAGE_LIMIT: u32 = 100;

/// Hard ceiling on pages per collection. A listing that paginates past
/// this is treated as a malformed response rather than looped forever.
pub(crate) const MAX_PAGES: u32 = 200;
