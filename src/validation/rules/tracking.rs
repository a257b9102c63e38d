//! Tracking-category coverage rule
//!
//! Accepted quotes flow into job costing, which attributes each line
//! item through its tracking assignments. Untracked lines land in the
//! default bucket and skew departmental reporting.

use serde_json::json;

use crate::models::{IssueCode, QuoteStatus, ValidationIssue};
use crate::validation::ValidationContext;

pub fn check_tracking_categories(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for quote in ctx.quotes {
        if quote.status != QuoteStatus::Accepted || quote.line_items.is_empty() {
            continue;
        }

        let missing = quote
            .line_items
            .iter()
            .filter(|item| !item.has_tracking())
            .count();
        if missing == 0 {
            continue;
        }

        issues.push(
            ValidationIssue::error(
                IssueCode::MissingTrackingCategories,
                format!(
                    "quote '{}': {} of {} line items missing tracking assignments",
                    quote.display_number(),
                    missing,
                    quote.line_items.len()
                ),
            )
            .with_quote(quote.quote_id)
            .with_metadata("line_items_missing", json!(missing))
            .with_suggested_fix("Assign a tracking category to every line item"),
        );
    }

    issues
}
