//! Deal pipeline placement rule

use crate::models::{DealStatus, IssueCode, ValidationIssue};
use crate::validation::ValidationContext;

pub fn check_pipeline_placement(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for deal in ctx.in_scope_deals() {
        match deal.status {
            DealStatus::Won => {
                if ctx.tenant.unqualified_pipeline_id == Some(deal.pipeline_id) {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::WonDealInUnqualifiedPipeline,
                            format!(
                                "won deal '{}' sits in the unqualified pipeline {}",
                                deal.title, deal.pipeline_id
                            ),
                        )
                        .with_deal(deal.id)
                        .with_suggested_fix("Move the deal to a delivery pipeline"),
                    );
                }
            }
            DealStatus::Open => {
                if ctx.tenant.closed_only_pipeline_ids.contains(&deal.pipeline_id) {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::OpenDealInWrongPipeline,
                            format!(
                                "open deal '{}' sits in closed-only pipeline {}",
                                deal.title, deal.pipeline_id
                            ),
                        )
                        .with_deal(deal.id)
                        .with_suggested_fix("Close the deal or move it back to an active pipeline"),
                    );
                }
            }
            DealStatus::Lost | DealStatus::Deleted => {}
        }
    }

    issues
}
