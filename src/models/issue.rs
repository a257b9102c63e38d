//! Data-integrity issue taxonomy
//!
//! Issues are the first-class output of a validation run; they are
//! expected findings, never exceptions. Each carries a stable code from
//! a closed taxonomy so downstream consumers can filter and group
//! without string matching on messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// How bad a finding is.
///
/// Ordering is ascending so `max()` over a list gives the worst finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed taxonomy of issue codes.
///
/// Serialized in SCREAMING_SNAKE_CASE, which is also the spelling used
/// in reports and suggested-fix text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // -----------------------------------------------------------------
    // Deal titles
    // -----------------------------------------------------------------
    InvalidTitleFormat,
    MissingVessel,
    InvalidVesselName,

    // -----------------------------------------------------------------
    // Deal fields and placement
    // -----------------------------------------------------------------
    RequiredFieldMissing,
    WonDealInUnqualifiedPipeline,
    OpenDealInWrongPipeline,

    // -----------------------------------------------------------------
    // Deal to quote cross-reference
    // -----------------------------------------------------------------
    MissingQuoteLink,
    QuoteIdMismatch,
    QuoteNotFound,
    QuoteReferenceMismatch,
    QuoteStatusMisaligned,
    QuoteValueMismatch,
    ContactNameMismatch,

    // -----------------------------------------------------------------
    // Deal products
    // -----------------------------------------------------------------
    NoProductsInWonDeal,
    ProductValidationFailed,

    // -----------------------------------------------------------------
    // Accepted quotes
    // -----------------------------------------------------------------
    OrphanedAcceptedQuote,
    QuoteReferencesMissingDeal,
    AcceptedQuoteWrongPipeline,
    AcceptedQuoteLostDeal,
    ValueMismatch,
    AcceptedQuoteNoNumber,
    AcceptedQuoteInvalidFormat,
    MissingTrackingCategories,

    // -----------------------------------------------------------------
    // Invoice stage
    // -----------------------------------------------------------------
    InvoiceStageMissingQuote,
    InvoiceStageQuoteNotFound,
    InvoiceStageQuoteNotInvoiced,

    // -----------------------------------------------------------------
    // Degraded sub-validations
    // -----------------------------------------------------------------
    XeroValidationFailed,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::InvalidTitleFormat => "INVALID_TITLE_FORMAT",
            IssueCode::MissingVessel => "MISSING_VESSEL",
            IssueCode::InvalidVesselName => "INVALID_VESSEL_NAME",
            IssueCode::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            IssueCode::WonDealInUnqualifiedPipeline => "WON_DEAL_IN_UNQUALIFIED_PIPELINE",
            IssueCode::OpenDealInWrongPipeline => "OPEN_DEAL_IN_WRONG_PIPELINE",
            IssueCode::MissingQuoteLink => "MISSING_QUOTE_LINK",
            IssueCode::QuoteIdMismatch => "QUOTE_ID_MISMATCH",
            IssueCode::QuoteNotFound => "QUOTE_NOT_FOUND",
            IssueCode::QuoteReferenceMismatch => "QUOTE_REFERENCE_MISMATCH",
            IssueCode::QuoteStatusMisaligned => "QUOTE_STATUS_MISALIGNED",
            IssueCode::QuoteValueMismatch => "QUOTE_VALUE_MISMATCH",
            IssueCode::ContactNameMismatch => "CONTACT_NAME_MISMATCH",
            IssueCode::NoProductsInWonDeal => "NO_PRODUCTS_IN_WON_DEAL",
            IssueCode::ProductValidationFailed => "PRODUCT_VALIDATION_FAILED",
            IssueCode::OrphanedAcceptedQuote => "ORPHANED_ACCEPTED_QUOTE",
            IssueCode::QuoteReferencesMissingDeal => "QUOTE_REFERENCES_MISSING_DEAL",
            IssueCode::AcceptedQuoteWrongPipeline => "ACCEPTED_QUOTE_WRONG_PIPELINE",
            IssueCode::AcceptedQuoteLostDeal => "ACCEPTED_QUOTE_LOST_DEAL",
            IssueCode::ValueMismatch => "VALUE_MISMATCH",
            IssueCode::AcceptedQuoteNoNumber => "ACCEPTED_QUOTE_NO_NUMBER",
            IssueCode::AcceptedQuoteInvalidFormat => "ACCEPTED_QUOTE_INVALID_FORMAT",
            IssueCode::MissingTrackingCategories => "MISSING_TRACKING_CATEGORIES",
            IssueCode::InvoiceStageMissingQuote => "INVOICE_STAGE_MISSING_QUOTE",
            IssueCode::InvoiceStageQuoteNotFound => "INVOICE_STAGE_QUOTE_NOT_FOUND",
            IssueCode::InvoiceStageQuoteNotInvoiced => "INVOICE_STAGE_QUOTE_NOT_INVOICED",
            IssueCode::XeroValidationFailed => "XERO_VALIDATION_FAILED",
        }
    }

    /// Whether the fix layer knows how to repair this finding without a
    /// human in the loop.
    pub fn is_auto_fixable(&self) -> bool {
        matches!(
            self,
            IssueCode::QuoteStatusMisaligned | IssueCode::InvoiceStageQuoteNotInvoiced
        )
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One data-integrity finding.
///
/// Immutable once built; rules create them and the orchestrator only
/// collects and joins them onto records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            deal_id: None,
            quote_id: None,
            field: None,
            suggested_fix: None,
            metadata: Map::new(),
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn with_deal(mut self, deal_id: i64) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    pub fn with_quote(mut self, quote_id: Uuid) -> Self {
        self.quote_id = Some(quote_id);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_code_serialization_matches_as_str() {
        let codes = [
            IssueCode::WonDealInUnqualifiedPipeline,
            IssueCode::AcceptedQuoteInvalidFormat,
            IssueCode::XeroValidationFailed,
        ];
        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_builder_chain() {
        let issue = ValidationIssue::error(IssueCode::QuoteNotFound, "no such quote")
            .with_deal(42)
            .with_field("xero_quote_id")
            .with_suggested_fix("Link the deal to an existing quote")
            .with_metadata("searched_id", serde_json::json!("abc-123"));
        assert_eq!(issue.deal_id, Some(42));
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.metadata["searched_id"], "abc-123");
    }

    #[test]
    fn test_auto_fixable_codes() {
        assert!(IssueCode::QuoteStatusMisaligned.is_auto_fixable());
        assert!(IssueCode::InvoiceStageQuoteNotInvoiced.is_auto_fixable());
        assert!(!IssueCode::QuoteNotFound.is_auto_fixable());
    }
}
