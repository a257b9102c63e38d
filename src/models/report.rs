//! Validation run output: sessions, step records, joined records and
//! the summary recount

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::deal::{Deal, DealStatus, ResolvedDealFields};
use crate::models::issue::{Severity, ValidationIssue};
use crate::models::project::Project;
use crate::models::quote::{Quote, QuoteStatus};

// ---------------------------------------------------------------------------
// StepStatus / StepRecord
// ---------------------------------------------------------------------------

/// Execution status of one orchestrator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Progress record for one orchestrator step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Stable step id (e.g. `"fetch_deals"`).
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StepStatus,
    /// One-line result summary, set on completion.
    pub summary: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// SessionStatus - lifecycle state machine
// ---------------------------------------------------------------------------

/// Lifecycle status of a validation session.
///
/// ```text
/// Pending ──► Running ──► Completed
///                │
///                └──► Failed { error, failed_step }
/// ```
///
/// `Pending` exists only between construction and the first step; there
/// is no resume, a failed session is terminal and a new run starts from
/// scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,

    /// Currently executing steps.
    Running {
        /// Id of the step currently being executed.
        current_step: String,
    },

    /// All steps completed and the result was assembled.
    Completed { completed_at: DateTime<Utc> },

    /// A step raised and the run aborted.
    Failed {
        error: String,
        /// Step that failed (if known).
        failed_step: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// ValidationSession
// ---------------------------------------------------------------------------

/// One validation run from first fetch to assembled result.
///
/// Steps already completed keep their records when a later step fails,
/// so a failed session still tells the caller how far the run got.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSession {
    pub session_id: Uuid,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub steps: Vec<StepRecord>,
    pub result: Option<ValidationResult>,
}

impl ValidationSession {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            started_at: Utc::now(),
            status: SessionStatus::Pending,
            steps: Vec::new(),
            result: None,
        }
    }

    /// Opens a step record and moves the session to `Running`.
    pub fn begin_step(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) {
        let id = id.into();
        self.status = SessionStatus::Running {
            current_step: id.clone(),
        };
        self.steps.push(StepRecord {
            id,
            name: name.into(),
            description: description.into(),
            status: StepStatus::Running,
            summary: None,
            error: None,
            started_at: Some(Utc::now()),
            finished_at: None,
        });
    }

    /// Marks the named step completed with a one-line summary.
    pub fn complete_step(&mut self, id: &str, summary: impl Into<String>) {
        if let Some(step) = self.step_mut(id) {
            step.status = StepStatus::Completed;
            step.summary = Some(summary.into());
            step.finished_at = Some(Utc::now());
        }
    }

    /// Marks the named step failed and the whole session with it.
    pub fn fail_step(&mut self, id: &str, error: impl Into<String>) {
        let error = error.into();
        if let Some(step) = self.step_mut(id) {
            step.status = StepStatus::Failed;
            step.error = Some(error.clone());
            step.finished_at = Some(Utc::now());
        }
        self.status = SessionStatus::Failed {
            error,
            failed_step: Some(id.to_string()),
        };
    }

    /// Attaches the assembled result and closes the session.
    pub fn complete(&mut self, result: ValidationResult) {
        self.result = Some(result);
        self.status = SessionStatus::Completed {
            completed_at: Utc::now(),
        };
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SessionStatus::Failed { .. })
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    fn step_mut(&mut self, id: &str) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Validated records - raw records joined with their issues
// ---------------------------------------------------------------------------

/// A deal joined with its parse state, resolved fields and issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedDeal {
    pub deal: Deal,
    pub project_code: Option<String>,
    pub vessel_name: Option<String>,
    pub fields: ResolvedDealFields,
    /// Quote this deal resolved to, by id or number.
    pub matched_quote_id: Option<Uuid>,
    /// Derived key for joining with accounting-system projects.
    pub project_key: Option<String>,
    pub issues: Vec<ValidationIssue>,
}

/// A quote joined with the deal that links to it and its issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedQuote {
    pub quote: Quote,
    /// Set iff some deal's resolved quote id or number equals this
    /// quote's id or number.
    pub matched_deal_id: Option<i64>,
    pub issues: Vec<ValidationIssue>,
}

/// A project joined with its derived key and the deal it matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedProject {
    pub project: Project,
    pub project_key: String,
    pub matched_deal_id: Option<i64>,
    pub issues: Vec<ValidationIssue>,
}

// ---------------------------------------------------------------------------
// ValidationSummary
// ---------------------------------------------------------------------------

/// Counts over a finished run.
///
/// Always derived by [`ValidationSummary::compute`], never incremented
/// piecemeal, so the severity counts are exactly the partition of
/// `issues`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_deals: usize,
    pub total_quotes: usize,
    pub total_projects: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// Quotes some deal resolved to.
    pub matched_quotes: usize,
    /// Won deals that resolved to no quote at all.
    pub unmatched_deals: usize,
    /// Accepted quotes with no discoverable deal link.
    pub orphaned_accepted_quotes: usize,
    pub issues_by_code: BTreeMap<String, usize>,
}

impl ValidationSummary {
    pub fn compute(
        deals: &[ValidatedDeal],
        quotes: &[ValidatedQuote],
        projects: &[ValidatedProject],
        issues: &[ValidationIssue],
    ) -> Self {
        let mut summary = Self {
            total_deals: deals.len(),
            total_quotes: quotes.len(),
            total_projects: projects.len(),
            ..Default::default()
        };
        for issue in issues {
            match issue.severity {
                Severity::Error => summary.error_count += 1,
                Severity::Warning => summary.warning_count += 1,
                Severity::Info => summary.info_count += 1,
            }
            *summary
                .issues_by_code
                .entry(issue.code.as_str().to_string())
                .or_insert(0) += 1;
        }
        summary.matched_quotes = quotes.iter().filter(|q| q.matched_deal_id.is_some()).count();
        summary.unmatched_deals = deals
            .iter()
            .filter(|d| d.deal.status == DealStatus::Won && d.matched_quote_id.is_none())
            .count();
        summary.orphaned_accepted_quotes = quotes
            .iter()
            .filter(|q| q.quote.status == QuoteStatus::Accepted && q.matched_deal_id.is_none())
            .count();
        summary
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Aggregate root built once per run, read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub tenant_id: String,
    pub generated_at: DateTime<Utc>,
    pub deals: Vec<ValidatedDeal>,
    pub quotes: Vec<ValidatedQuote>,
    pub projects: Vec<ValidatedProject>,
    pub issues: Vec<ValidationIssue>,
    pub summary: ValidationSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::IssueCode;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn sample_deal(id: i64, status: DealStatus) -> ValidatedDeal {
        ValidatedDeal {
            deal: Deal {
                id,
                title: format!("NY{id}-Vessel"),
                status,
                value: Decimal::ZERO,
                currency: None,
                pipeline_id: 1,
                stage_id: None,
                org_name: None,
                custom_fields: HashMap::new(),
            },
            project_code: None,
            vessel_name: None,
            fields: ResolvedDealFields::default(),
            matched_quote_id: None,
            project_key: None,
            issues: vec![],
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = ValidationSession::new("tenant-a");
        assert!(matches!(session.status, SessionStatus::Pending));

        session.begin_step("fetch_deals", "Fetch deals", "Pull all configured pipelines");
        assert!(matches!(
            &session.status,
            SessionStatus::Running { current_step } if current_step == "fetch_deals"
        ));

        session.complete_step("fetch_deals", "12 deals");
        session.begin_step("fetch_quotes", "Fetch quotes", "Pull all quote pages");
        session.fail_step("fetch_quotes", "connection reset");

        assert!(session.is_failed());
        assert_eq!(session.completed_steps(), 1);
        assert_eq!(session.steps[0].summary.as_deref(), Some("12 deals"));
        assert_eq!(session.steps[1].error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_summary_is_partition_of_issues() {
        let deals = vec![sample_deal(1, DealStatus::Won), sample_deal(2, DealStatus::Open)];
        let issues = vec![
            ValidationIssue::error(IssueCode::QuoteNotFound, "a").with_deal(1),
            ValidationIssue::warning(IssueCode::ContactNameMismatch, "b").with_deal(1),
            ValidationIssue::warning(IssueCode::ContactNameMismatch, "c").with_deal(2),
            ValidationIssue::info(IssueCode::MissingQuoteLink, "d").with_deal(1),
        ];
        let summary = ValidationSummary::compute(&deals, &[], &[], &issues);

        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.warning_count, 2);
        assert_eq!(summary.info_count, 1);
        assert_eq!(
            summary.error_count + summary.warning_count + summary.info_count,
            issues.len()
        );
        assert_eq!(summary.issues_by_code["CONTACT_NAME_MISMATCH"], 2);
        // only the won deal counts as unmatched
        assert_eq!(summary.unmatched_deals, 1);
    }
}
