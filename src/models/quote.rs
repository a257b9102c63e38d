//! Accounting-system quotes and their line items

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a quote.
///
/// Matches the accounting system's wire spelling (`"ACCEPTED"` etc.).
/// The legal transitions between statuses live in the fix layer's
/// transition table, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
    Deleted,
    Invoiced,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "DRAFT",
            QuoteStatus::Sent => "SENT",
            QuoteStatus::Accepted => "ACCEPTED",
            QuoteStatus::Declined => "DECLINED",
            QuoteStatus::Deleted => "DELETED",
            QuoteStatus::Invoiced => "INVOICED",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(QuoteStatus::Draft),
            "SENT" => Ok(QuoteStatus::Sent),
            "ACCEPTED" => Ok(QuoteStatus::Accepted),
            "DECLINED" => Ok(QuoteStatus::Declined),
            "DELETED" => Ok(QuoteStatus::Deleted),
            "INVOICED" => Ok(QuoteStatus::Invoiced),
            other => Err(format!("unknown quote status '{other}'")),
        }
    }
}

/// A tracking dimension applied to a line item for financial reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingAssignment {
    pub category_id: Option<String>,
    pub option_id: Option<String>,
    /// Category display name, carried for messages only.
    pub name: Option<String>,
    /// Option display name, carried for messages only.
    pub option: Option<String>,
}

impl TrackingAssignment {
    /// A usable assignment needs both ids populated and non-empty.
    pub fn is_populated(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.category_id) && filled(&self.option_id)
    }
}

/// One line on a quote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_amount: Option<Decimal>,
    #[serde(default)]
    pub line_amount: Decimal,
    #[serde(default)]
    pub tracking: Vec<TrackingAssignment>,
}

impl LineItem {
    pub fn has_tracking(&self) -> bool {
        self.tracking.iter().any(TrackingAssignment::is_populated)
    }
}

/// A sales quotation as fetched from the accounting system.
///
/// `quote_id` is the identity; `quote_number` is the human-readable
/// secondary key the CRM side stores for matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: Uuid,
    pub quote_number: Option<String>,
    pub status: QuoteStatus,
    #[serde(default)]
    pub total: Decimal,
    pub currency_code: Option<String>,
    /// Free text, often encodes the originating deal id.
    pub reference: Option<String>,
    pub contact_name: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Quote {
    /// Quote number for display, falling back to the uuid when the
    /// number was never assigned.
    pub fn display_number(&self) -> String {
        match self.quote_number.as_deref() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => self.quote_id.to_string(),
        }
    }
}
