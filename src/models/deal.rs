//! CRM deal records and their tenant-resolved custom fields

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a CRM deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Open,
    Won,
    Lost,
    Deleted,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Open => "open",
            DealStatus::Won => "won",
            DealStatus::Lost => "lost",
            DealStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sales opportunity as fetched from the CRM.
///
/// Custom fields arrive keyed by the CRM's opaque 40-char field hashes;
/// [`ResolvedDealFields`] is the typed view after applying a tenant's
/// field mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: i64,
    pub title: String,
    pub status: DealStatus,
    #[serde(default)]
    pub value: Decimal,
    pub currency: Option<String>,
    pub pipeline_id: i64,
    pub stage_id: Option<i64>,
    /// Organisation the deal is attached to, when the CRM returns one.
    pub org_name: Option<String>,
    #[serde(default)]
    pub custom_fields: HashMap<String, Value>,
}

impl Deal {
    /// Reads a custom field as trimmed text.
    ///
    /// Returns `None` for absent fields, empty strings and JSON nulls.
    /// Numeric values are rendered to text since the CRM stores some
    /// identifier fields as numbers.
    pub fn custom_text(&self, key: &str) -> Option<String> {
        match self.custom_fields.get(key) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A product line attached to a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealProduct {
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub item_price: Decimal,
    /// Line total as reported by the CRM.
    #[serde(default)]
    pub sum: Decimal,
}

/// Typed view of the custom fields the validator cares about, resolved
/// once per deal through the tenant's field mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedDealFields {
    /// Accounting-system quote id (uuid as text, as the CRM stores it).
    pub xero_quote_id: Option<String>,
    /// Human-readable quote number, the secondary match key.
    pub xero_quote_number: Option<String>,
    pub project_code: Option<String>,
    pub vessel_name: Option<String>,
    pub department: Option<String>,
}

impl ResolvedDealFields {
    /// Looks a resolved field up by its logical name, as used in tenant
    /// required-field policies.
    pub fn get(&self, logical_name: &str) -> Option<&str> {
        let value = match logical_name {
            "xero_quote_id" => &self.xero_quote_id,
            "xero_quote_number" => &self.xero_quote_number,
            "project_code" => &self.project_code,
            "vessel_name" => &self.vessel_name,
            "department" => &self.department,
            _ => &None,
        };
        value.as_deref()
    }

    /// True when neither the quote id nor the quote number is populated.
    pub fn has_no_quote_link(&self) -> bool {
        self.xero_quote_id.is_none() && self.xero_quote_number.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deal_with_fields(fields: Vec<(&str, Value)>) -> Deal {
        Deal {
            id: 1,
            title: "NY2594-Test Vessel".to_string(),
            status: DealStatus::Won,
            value: Decimal::new(100000, 2),
            currency: Some("GBP".to_string()),
            pipeline_id: 1,
            stage_id: None,
            org_name: None,
            custom_fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn test_custom_text_trims_and_rejects_empty() {
        let deal = deal_with_fields(vec![
            ("a", json!("  NY2594-QU1-1  ")),
            ("b", json!("   ")),
            ("c", json!(null)),
            ("d", json!(42)),
        ]);
        assert_eq!(deal.custom_text("a").as_deref(), Some("NY2594-QU1-1"));
        assert_eq!(deal.custom_text("b"), None);
        assert_eq!(deal.custom_text("c"), None);
        assert_eq!(deal.custom_text("d").as_deref(), Some("42"));
        assert_eq!(deal.custom_text("missing"), None);
    }

    #[test]
    fn test_deal_status_serde() {
        let status: DealStatus = serde_json::from_str("\"won\"").unwrap();
        assert_eq!(status, DealStatus::Won);
        assert_eq!(serde_json::to_string(&DealStatus::Open).unwrap(), "\"open\"");
    }

    #[test]
    fn test_resolved_fields_lookup() {
        let fields = ResolvedDealFields {
            xero_quote_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(fields.get("xero_quote_id"), Some("abc"));
        assert_eq!(fields.get("department"), None);
        assert_eq!(fields.get("nonsense"), None);
        assert!(!fields.has_no_quote_link());
        assert!(ResolvedDealFields::default().has_no_quote_link());
    }
}
