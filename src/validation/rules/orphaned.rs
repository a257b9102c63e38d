//! Orphaned accepted quotes
//!
//! Every ACCEPTED quote should trace back to a deal, either through a
//! deal's stored quote identifiers or through a deal id encoded in the
//! quote's reference text. A reference naming a deal that is absent
//! from the fetched universe is a stronger signal than a quote with no
//! link at all: the deal may exist but sit outside the validated
//! pipelines.

use rust_decimal::Decimal;
use serde_json::json;

use crate::models::{DealStatus, IssueCode, Quote, QuoteStatus, ValidationIssue};
use crate::parsing::extract_deal_id;
use crate::validation::ValidationContext;

/// Relative tolerance for quote-total vs deal-value drift.
const RELATIVE_TOLERANCE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Differences at or under this many currency units are rounding noise
/// regardless of the relative measure.
const ABSOLUTE_FLOOR: Decimal = Decimal::ONE;

pub fn check_orphaned_accepted_quotes(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for quote in ctx.quotes {
        if quote.status != QuoteStatus::Accepted {
            continue;
        }

        let deal = if let Some(deal) = ctx.linked_deal_for(quote) {
            deal
        } else if let Some(referenced) = quote.reference.as_deref().and_then(extract_deal_id) {
            match ctx.deal(referenced) {
                Some(deal) => deal,
                None => {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::QuoteReferencesMissingDeal,
                            format!(
                                "accepted quote '{}' references deal {} which is not in the fetched deal universe",
                                quote.display_number(),
                                referenced
                            ),
                        )
                        .with_quote(quote.quote_id)
                        .with_metadata("referenced_deal_id", json!(referenced)),
                    );
                    continue;
                }
            }
        } else {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::OrphanedAcceptedQuote,
                    format!(
                        "accepted quote '{}' is not linked to any deal",
                        quote.display_number()
                    ),
                )
                .with_quote(quote.quote_id),
            );
            continue;
        };

        if ctx.tenant.is_ignored_pipeline(deal.pipeline_id) {
            continue;
        }

        if !ctx.tenant.in_progress_pipeline_ids.is_empty()
            && !ctx.tenant.is_in_progress_pipeline(deal.pipeline_id)
        {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::AcceptedQuoteWrongPipeline,
                    format!(
                        "accepted quote '{}' links to deal '{}' outside the in-progress pipelines",
                        quote.display_number(),
                        deal.title
                    ),
                )
                .with_quote(quote.quote_id)
                .with_deal(deal.id),
            );
        }

        if deal.status == DealStatus::Lost {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::AcceptedQuoteLostDeal,
                    format!(
                        "accepted quote '{}' links to lost deal '{}'",
                        quote.display_number(),
                        deal.title
                    ),
                )
                .with_quote(quote.quote_id)
                .with_deal(deal.id),
            );
        }

        if exceeds_drift_tolerance(quote, deal.value) {
            let difference = (quote.total - deal.value).abs();
            issues.push(
                ValidationIssue::warning(
                    IssueCode::ValueMismatch,
                    format!(
                        "accepted quote '{}' total {} drifts from deal value {} by {}",
                        quote.display_number(),
                        quote.total,
                        deal.value,
                        difference
                    ),
                )
                .with_quote(quote.quote_id)
                .with_deal(deal.id)
                .with_metadata("quote_total", json!(quote.total))
                .with_metadata("deal_value", json!(deal.value)),
            );
        }
    }

    issues
}

/// True when the difference exceeds both the absolute floor and 10% of
/// the deal value.
fn exceeds_drift_tolerance(quote: &Quote, deal_value: Decimal) -> bool {
    let difference = (quote.total - deal_value).abs();
    let allowed = (deal_value.abs() * RELATIVE_TOLERANCE).max(ABSOLUTE_FLOOR);
    difference > allowed
}
