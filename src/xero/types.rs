//! Xero wire formats

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LineItem, Project, ProjectStatus, Quote, QuoteStatus, TrackingAssignment};

// ---------------------------------------------------------------------------
// Accounting API (quotes), PascalCase
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct QuotesResponse {
    #[serde(rename = "Quotes", default)]
    pub quotes: Vec<WireQuote>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireQuote {
    #[serde(rename = "QuoteID")]
    pub quote_id: Uuid,
    #[serde(rename = "QuoteNumber", default)]
    pub quote_number: Option<String>,
    #[serde(rename = "Status")]
    pub status: QuoteStatus,
    #[serde(rename = "Total", default)]
    pub total: Option<Decimal>,
    #[serde(rename = "CurrencyCode", default)]
    pub currency_code: Option<String>,
    #[serde(rename = "Reference", default)]
    pub reference: Option<String>,
    #[serde(rename = "Contact", default)]
    pub contact: Option<WireContact>,
    #[serde(rename = "LineItems", default)]
    pub line_items: Vec<WireLineItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContact {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireLineItem {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Quantity", default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(rename = "UnitAmount", default, skip_serializing_if = "Option::is_none")]
    pub unit_amount: Option<Decimal>,
    #[serde(rename = "LineAmount", default)]
    pub line_amount: Decimal,
    #[serde(rename = "Tracking", default, skip_serializing_if = "Vec::is_empty")]
    pub tracking: Vec<WireTracking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireTracking {
    #[serde(rename = "TrackingCategoryID", default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(rename = "TrackingOptionID", default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Option", default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

impl From<WireQuote> for Quote {
    fn from(wire: WireQuote) -> Self {
        Quote {
            quote_id: wire.quote_id,
            quote_number: wire.quote_number,
            status: wire.status,
            total: wire.total.unwrap_or_default(),
            currency_code: wire.currency_code,
            reference: wire.reference,
            contact_name: wire.contact.and_then(|c| c.name),
            line_items: wire.line_items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<WireLineItem> for LineItem {
    fn from(wire: WireLineItem) -> Self {
        LineItem {
            description: wire.description,
            quantity: wire.quantity,
            unit_amount: wire.unit_amount,
            line_amount: wire.line_amount,
            tracking: wire.tracking.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&LineItem> for WireLineItem {
    fn from(item: &LineItem) -> Self {
        WireLineItem {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_amount: item.unit_amount,
            line_amount: item.line_amount,
            tracking: item.tracking.iter().map(Into::into).collect(),
        }
    }
}

impl From<WireTracking> for TrackingAssignment {
    fn from(wire: WireTracking) -> Self {
        TrackingAssignment {
            category_id: wire.category_id,
            option_id: wire.option_id,
            name: wire.name,
            option: wire.option,
        }
    }
}

impl From<&TrackingAssignment> for WireTracking {
    fn from(assignment: &TrackingAssignment) -> Self {
        WireTracking {
            category_id: assignment.category_id.clone(),
            option_id: assignment.option_id.clone(),
            name: assignment.name.clone(),
            option: assignment.option.clone(),
        }
    }
}

/// Body for a status-only quote update.
#[derive(Debug, Serialize)]
pub(crate) struct QuoteStatusUpdate {
    #[serde(rename = "Status")]
    pub status: QuoteStatus,
}

/// Body for a line-items-only quote update.
#[derive(Debug, Serialize)]
pub(crate) struct QuoteLineItemsUpdate {
    #[serde(rename = "LineItems")]
    pub line_items: Vec<WireLineItem>,
}

// ---------------------------------------------------------------------------
// Projects API, camelCase
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectsResponse {
    #[serde(default)]
    pub pagination: Option<WirePagination>,
    #[serde(default)]
    pub items: Vec<WireProject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePagination {
    #[serde(default)]
    pub page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProject {
    pub project_id: String,
    pub name: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub total_amount: Option<WireAmount>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAmount {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
}

impl From<WireProject> for Project {
    fn from(wire: WireProject) -> Self {
        let (currency, total_amount) = match wire.total_amount {
            Some(amount) => (amount.currency, amount.value),
            None => (None, None),
        };
        Project {
            project_id: wire.project_id,
            name: wire.name,
            status: wire.status,
            total_amount,
            currency,
        }
    }
}
