//! Required custom fields on won deals

use crate::models::{DealStatus, IssueCode, ValidationIssue};
use crate::validation::ValidationContext;

pub fn check_required_fields(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    if ctx.tenant.required_fields.is_empty() {
        return Vec::new();
    }

    let mut issues = Vec::new();
    for deal in ctx.in_scope_deals() {
        if deal.status != DealStatus::Won {
            continue;
        }
        let resolved = ctx.resolved(deal.id);
        for required in &ctx.tenant.required_fields {
            if resolved.get(&required.field).is_none() {
                issues.push(
                    ValidationIssue::new(
                        required.severity,
                        IssueCode::RequiredFieldMissing,
                        format!("required field '{}' is empty", required.field),
                    )
                    .with_deal(deal.id)
                    .with_field(required.field.clone()),
                );
            }
        }
    }
    issues
}
