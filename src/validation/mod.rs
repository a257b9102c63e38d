//! Validation engine
//!
//! [`context`] builds the shared read-model, [`rules`] holds the pure
//! rule functions, and [`orchestrator`] sequences fetch, rules and
//! result assembly into a [`ValidationSession`](crate::models::ValidationSession).

pub mod context;
pub mod orchestrator;
pub mod rules;

pub use context::{ProductLookup, QuoteResolution, ValidationContext};
pub use orchestrator::ValidationOrchestrator;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;

    use crate::models::{Deal, DealStatus, LineItem, Quote, QuoteStatus, TrackingAssignment};

    /// Won deal in the given pipeline with a well-formed title. Field
    /// hashes line up with [`crate::config::test_support::tenant`].
    pub fn deal(id: i64, pipeline_id: i64) -> Deal {
        Deal {
            id,
            title: format!("ED{id:04} - Northern Star"),
            status: DealStatus::Won,
            value: Decimal::new(1000, 0),
            currency: Some("GBP".to_string()),
            pipeline_id,
            stage_id: None,
            org_name: Some("Maritime Ltd".to_string()),
            custom_fields: HashMap::new(),
        }
    }

    /// Accepted quote whose value and contact agree with [`deal`].
    pub fn quote(number: &str) -> Quote {
        Quote {
            quote_id: Uuid::new_v4(),
            quote_number: Some(number.to_string()),
            status: QuoteStatus::Accepted,
            total: Decimal::new(1000, 0),
            currency_code: Some("GBP".to_string()),
            reference: None,
            contact_name: Some("Maritime Ltd".to_string()),
            line_items: vec![tracked_line_item()],
        }
    }

    pub fn tracked_line_item() -> LineItem {
        LineItem {
            description: Some("Hull survey".to_string()),
            quantity: Some(Decimal::ONE),
            unit_amount: Some(Decimal::new(1000, 0)),
            line_amount: Decimal::new(1000, 0),
            tracking: vec![TrackingAssignment {
                category_id: Some("cat-1".to_string()),
                option_id: Some("opt-1".to_string()),
                name: Some("Department".to_string()),
                option: Some("Surveys".to_string()),
            }],
        }
    }

    /// Stores quote identifiers in the deal's mapped custom fields.
    pub fn with_quote_link(mut deal: Deal, id: Option<Uuid>, number: Option<&str>) -> Deal {
        if let Some(id) = id {
            deal.custom_fields
                .insert("f_quote_id".to_string(), json!(id.to_string()));
        }
        if let Some(number) = number {
            deal.custom_fields
                .insert("f_quote_number".to_string(), json!(number));
        }
        deal
    }
}
