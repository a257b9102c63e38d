//! Deal to quote cross-reference rule
//!
//! Resolves each deal's stored quote identifiers (id first, number as
//! fallback) and then checks the matched pair along four axes:
//! reference text, status alignment, value alignment and contact name.

use serde_json::json;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Deal, DealStatus, IssueCode, Quote, QuoteStatus, ValidationIssue};
use crate::parsing::extract_deal_id;
use crate::validation::{QuoteResolution, ValidationContext};

/// Absolute tolerance for deal-value vs quote-total comparison, in
/// currency units. At or under passes, over fails.
const VALUE_TOLERANCE: rust_decimal::Decimal = rust_decimal::Decimal::from_parts(1, 0, 0, false, 2);

pub fn check_quote_cross_reference(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for deal in ctx.in_scope_deals() {
        let resolved = ctx.resolved(deal.id);
        match ctx.resolve_quote(resolved) {
            QuoteResolution::Unlinked => {
                if deal.status == DealStatus::Won {
                    issues.push(
                        ValidationIssue::info(
                            IssueCode::MissingQuoteLink,
                            format!("won deal '{}' has no quote id or number stored", deal.title),
                        )
                        .with_deal(deal.id),
                    );
                }
            }
            QuoteResolution::NotFound => {
                let (field, searched) = match resolved.xero_quote_id.as_deref() {
                    Some(id) => ("xero_quote_id", id),
                    None => (
                        "xero_quote_number",
                        resolved.xero_quote_number.as_deref().unwrap_or_default(),
                    ),
                };
                let mut issue = ValidationIssue::error(
                    IssueCode::QuoteNotFound,
                    format!("no quote matches '{searched}' stored on deal '{}'", deal.title),
                )
                .with_deal(deal.id)
                .with_field(field);
                if let Some(number) = resolved.xero_quote_number.as_deref() {
                    if let Some(candidate) = closest_quote_number(ctx, number) {
                        issue = issue.with_suggested_fix(format!(
                            "Closest existing quote number is '{candidate}'"
                        ));
                    }
                }
                issues.push(issue);
            }
            QuoteResolution::Matched {
                quote,
                number_conflict,
            } => {
                if number_conflict {
                    issues.push(
                        ValidationIssue::warning(
                            IssueCode::QuoteIdMismatch,
                            format!(
                                "stored quote id and quote number disagree; matched quote '{}'",
                                quote.display_number()
                            ),
                        )
                        .with_deal(deal.id)
                        .with_quote(quote.quote_id),
                    );
                }
                check_matched_pair(deal, quote, &mut issues);
            }
        }
    }

    issues
}

fn check_matched_pair(deal: &Deal, quote: &Quote, issues: &mut Vec<ValidationIssue>) {
    // (a) The quote's reference text should name the originating deal.
    match quote.reference.as_deref().and_then(extract_deal_id) {
        Some(referenced) if referenced != deal.id => {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::QuoteReferenceMismatch,
                    format!(
                        "quote '{}' references deal {} but is linked to deal {}",
                        quote.display_number(),
                        referenced,
                        deal.id
                    ),
                )
                .with_deal(deal.id)
                .with_quote(quote.quote_id),
            );
        }
        Some(_) => {}
        None => {
            issues.push(
                ValidationIssue::info(
                    IssueCode::QuoteReferenceMismatch,
                    format!(
                        "quote '{}' reference does not name the originating deal",
                        quote.display_number()
                    ),
                )
                .with_deal(deal.id)
                .with_quote(quote.quote_id)
                .with_suggested_fix(format!("Set the quote reference to 'Deal ID: {}'", deal.id)),
            );
        }
    }

    // (b) Status alignment. A won deal's quote may legitimately have
    // moved on from ACCEPTED to INVOICED.
    let expected = match deal.status {
        DealStatus::Won => Some(QuoteStatus::Accepted),
        DealStatus::Lost => Some(QuoteStatus::Declined),
        _ => None,
    };
    if let Some(expected) = expected {
        let aligned = quote.status == expected
            || (deal.status == DealStatus::Won && quote.status == QuoteStatus::Invoiced);
        if !aligned {
            issues.push(
                ValidationIssue::error(
                    IssueCode::QuoteStatusMisaligned,
                    format!(
                        "{} deal requires quote status {}, found {}",
                        deal.status, expected, quote.status
                    ),
                )
                .with_deal(deal.id)
                .with_quote(quote.quote_id)
                .with_suggested_fix(format!(
                    "Transition quote '{}' from {} to {}",
                    quote.display_number(),
                    quote.status,
                    expected
                ))
                .with_metadata("expected_status", json!(expected.as_str()))
                .with_metadata("current_status", json!(quote.status.as_str())),
            );
        }
    }

    // (c) Value alignment.
    let difference = (deal.value - quote.total).abs();
    if difference > VALUE_TOLERANCE {
        issues.push(
            ValidationIssue::error(
                IssueCode::QuoteValueMismatch,
                format!(
                    "deal value {} differs from quote total {} by {}",
                    deal.value, quote.total, difference
                ),
            )
            .with_deal(deal.id)
            .with_quote(quote.quote_id)
            .with_metadata("deal_value", json!(deal.value))
            .with_metadata("quote_total", json!(quote.total)),
        );
    }

    // (d) Contact name similarity.
    if let (Some(org), Some(contact)) = (deal.org_name.as_deref(), quote.contact_name.as_deref()) {
        if !names_match(org, contact) {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::ContactNameMismatch,
                    format!(
                        "deal organisation '{org}' does not resemble quote contact '{contact}'"
                    ),
                )
                .with_deal(deal.id)
                .with_quote(quote.quote_id),
            );
        }
    }
}

/// Case- and whitespace-insensitive substring match in either
/// direction, after folding and legal-suffix stripping.
fn names_match(a: &str, b: &str) -> bool {
    let left = normalize_name(a);
    let right = normalize_name(b);
    if left.is_empty() || right.is_empty() {
        return true;
    }
    left.contains(&right) || right.contains(&left)
}

const LEGAL_SUFFIXES: &[&str] = &[
    "ltd", "limited", "plc", "llp", "llc", "inc", "gmbh", "bv", "nv", "as", "asa", "ab", "co",
];

fn normalize_name(s: &str) -> String {
    let folded = s.nfkc().collect::<String>().to_lowercase();
    let stripped: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped
        .split_whitespace()
        .filter(|token| !LEGAL_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Closest existing quote number to the stored one, for the
/// suggested-fix text on `QUOTE_NOT_FOUND`.
fn closest_quote_number(ctx: &ValidationContext<'_>, stored: &str) -> Option<String> {
    let target = stored.trim().to_lowercase();
    let mut best: Option<(f64, &str)> = None;
    for quote in ctx.quotes {
        if let Some(number) = quote.quote_number.as_deref() {
            let score = strsim::jaro_winkler(&target, &number.to_lowercase());
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, number));
            }
        }
    }
    best.filter(|(score, _)| *score >= 0.85)
        .map(|(_, number)| number.to_string())
}
