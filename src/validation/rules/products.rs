//! Product presence on won deals
//!
//! A won deal with no attached products cannot be invoiced correctly.
//! When the product lookup itself failed the rule degrades to a single
//! warning rather than failing the run or flagging every deal.

use crate::models::{DealStatus, IssueCode, ValidationIssue};
use crate::validation::{ProductLookup, ValidationContext};

pub fn check_product_presence(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let products = match &ctx.products {
        ProductLookup::Fetched(products) => products,
        ProductLookup::Unavailable(reason) => {
            return vec![ValidationIssue::warning(
                IssueCode::ProductValidationFailed,
                format!("product check skipped, lookup failed: {reason}"),
            )];
        }
    };

    let mut issues = Vec::new();
    for deal in ctx.in_scope_deals() {
        if deal.status != DealStatus::Won {
            continue;
        }
        let count = products.get(&deal.id).map_or(0, Vec::len);
        if count == 0 {
            issues.push(
                ValidationIssue::error(
                    IssueCode::NoProductsInWonDeal,
                    format!("won deal '{}' has no products attached", deal.title),
                )
                .with_deal(deal.id)
                .with_suggested_fix("Attach the quoted products to the deal"),
            );
        }
    }
    issues
}
