//! Domain models shared across the fetch, validation and fix paths
//!
//! Deals come from the CRM; quotes and projects come from the accounting
//! system. Each record is an immutable snapshot for the duration of a
//! validation run. The fix path writes back through the remote API, never
//! into these structs.

pub mod deal;
pub mod issue;
pub mod project;
pub mod quote;
pub mod report;

pub use deal::{Deal, DealProduct, DealStatus, ResolvedDealFields};
pub use issue::{IssueCode, Severity, ValidationIssue};
pub use project::{Project, ProjectStatus};
pub use quote::{LineItem, Quote, QuoteStatus, TrackingAssignment};
pub use report::{
    SessionStatus, StepRecord, StepStatus, ValidatedDeal, ValidatedProject, ValidatedQuote,
    ValidationResult, ValidationSession, ValidationSummary,
};
