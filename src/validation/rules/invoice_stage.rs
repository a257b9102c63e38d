//! Invoicing-stage readiness rule
//!
//! When a tenant designates a pipeline stage as "ready to invoice",
//! every deal sitting in that stage must be backed by a quote that has
//! actually reached INVOICED. Disabled for tenants without the stage.

use serde_json::json;

use crate::models::{IssueCode, QuoteStatus, ValidationIssue};
use crate::validation::{QuoteResolution, ValidationContext};

pub fn check_invoice_stage(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let stage_id = match ctx.tenant.invoice_stage_id {
        Some(stage_id) => stage_id,
        None => return Vec::new(),
    };

    let mut issues = Vec::new();

    for deal in ctx.in_scope_deals() {
        if deal.stage_id != Some(stage_id) {
            continue;
        }

        let resolved = ctx.resolved(deal.id);
        match ctx.resolve_quote(resolved) {
            QuoteResolution::Unlinked => {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::InvoiceStageMissingQuote,
                        format!("deal {} is in the invoicing stage with no linked quote", deal.id),
                    )
                    .with_deal(deal.id)
                    .with_suggested_fix("Link the quote before moving the deal to invoicing"),
                );
            }
            QuoteResolution::NotFound => {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::InvoiceStageQuoteNotFound,
                        format!(
                            "deal {} is in the invoicing stage but its linked quote was not found",
                            deal.id
                        ),
                    )
                    .with_deal(deal.id),
                );
            }
            QuoteResolution::Matched { quote, .. } => {
                if quote.status != QuoteStatus::Invoiced {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::InvoiceStageQuoteNotInvoiced,
                            format!(
                                "deal {} is in the invoicing stage but quote '{}' is {}",
                                deal.id,
                                quote.display_number(),
                                quote.status
                            ),
                        )
                        .with_deal(deal.id)
                        .with_quote(quote.quote_id)
                        .with_suggested_fix(format!(
                            "Transition quote '{}' from {} to INVOICED",
                            quote.display_number(),
                            quote.status
                        ))
                        .with_metadata("expected_status", json!(QuoteStatus::Invoiced.as_str()))
                        .with_metadata("current_status", json!(quote.status.as_str())),
                    );
                }
            }
        }
    }

    issues
}
