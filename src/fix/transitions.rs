//! Legal quote status transitions
//!
//! The accounting system only accepts certain status changes; anything
//! else is rejected server-side. The table below mirrors the accepted
//! graph, and [`transition_path`] plans multi-hop routes through `SENT`
//! when the direct edge does not exist.

use crate::error::TransitionError;
use crate::models::QuoteStatus;

/// Statuses reachable from `from` in a single write.
pub fn allowed_transitions(from: QuoteStatus) -> &'static [QuoteStatus] {
    use QuoteStatus::*;
    match from {
        Draft => &[Sent, Deleted],
        Sent => &[Accepted, Declined, Deleted],
        Declined => &[Sent, Deleted],
        Accepted => &[Sent, Deleted, Invoiced],
        Invoiced => &[Sent, Deleted],
        Deleted => &[],
    }
}

pub fn is_valid_transition(from: QuoteStatus, to: QuoteStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Hops to apply, in order, to move a quote from `from` to `to`.
///
/// Empty when the quote is already there, a single hop when the edge
/// exists, otherwise one stop at `SENT` when both legs exist.
pub fn transition_path(
    from: QuoteStatus,
    to: QuoteStatus,
) -> Result<Vec<QuoteStatus>, TransitionError> {
    if from == to {
        return Ok(Vec::new());
    }
    if is_valid_transition(from, to) {
        return Ok(vec![to]);
    }
    if is_valid_transition(from, QuoteStatus::Sent) && is_valid_transition(QuoteStatus::Sent, to) {
        return Ok(vec![QuoteStatus::Sent, to]);
    }
    Err(TransitionError::NoPath { from, to })
}
