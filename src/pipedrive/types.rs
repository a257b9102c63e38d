//! Pipedrive wire formats
//!
//! Every v1 response wraps its payload in `{success, data,
//! additional_data}`. Deal custom fields arrive as opaque 40-char hash
//! keys at the top level of each deal object, so the wire deal captures
//! unknown keys via a flattened map.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Deal, DealProduct, DealStatus};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    /// `null` when the listing is empty.
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default)]
    pub additional_data: Option<AdditionalData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AdditionalData {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub more_items_in_collection: bool,
    #[serde(default)]
    pub next_start: Option<u32>,
}

impl<T> Envelope<T> {
    /// Pagination flags, tolerating their absence.
    pub fn pagination(&self) -> (bool, Option<u32>) {
        match self.additional_data.as_ref().and_then(|a| a.pagination.as_ref()) {
            Some(p) => (p.more_items_in_collection, p.next_start),
            None => (false, None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDeal {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub status: DealStatus,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    pub pipeline_id: i64,
    #[serde(default)]
    pub stage_id: Option<i64>,
    #[serde(default)]
    pub org_name: Option<String>,
    /// Custom field hashes and anything else we do not model.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl From<WireDeal> for Deal {
    fn from(wire: WireDeal) -> Self {
        Deal {
            id: wire.id,
            title: wire.title,
            status: wire.status,
            value: wire.value.unwrap_or_default(),
            currency: wire.currency,
            pipeline_id: wire.pipeline_id,
            stage_id: wire.stage_id,
            org_name: wire.org_name,
            custom_fields: wire.extra,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDealProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub item_price: Option<Decimal>,
    #[serde(default)]
    pub sum: Option<Decimal>,
}

impl From<WireDealProduct> for DealProduct {
    fn from(wire: WireDealProduct) -> Self {
        DealProduct {
            name: wire.name,
            quantity: wire.quantity.unwrap_or_default(),
            item_price: wire.item_price.unwrap_or_default(),
            sum: wire.sum.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_envelope_with_custom_field_hashes() {
        let body = r#"{
            "success": true,
            "data": [{
                "id": 42,
                "title": "ED1234 - Northern Star",
                "status": "won",
                "value": 1500.5,
                "currency": "GBP",
                "pipeline_id": 3,
                "stage_id": 17,
                "org_name": "Maritime Ltd",
                "b3c2a0f7e81d5a6c9e4f0b1d2a3c4e5f6a7b8c9d": "ED1234-QU0001-1"
            }],
            "additional_data": {
                "pagination": {
                    "start": 0,
                    "limit": 100,
                    "more_items_in_collection": true,
                    "next_start": 100
                }
            }
        }"#;

        let envelope: Envelope<Vec<WireDeal>> = serde_json::from_str(body).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.pagination(), (true, Some(100)));

        let deal: Deal = envelope.data.unwrap().remove(0).into();
        assert_eq!(deal.id, 42);
        assert_eq!(deal.value, Decimal::new(15005, 1));
        assert_eq!(
            deal.custom_text("b3c2a0f7e81d5a6c9e4f0b1d2a3c4e5f6a7b8c9d")
                .as_deref(),
            Some("ED1234-QU0001-1")
        );
    }

    #[test]
    fn test_null_data_and_missing_pagination() {
        let body = r#"{"success": true, "data": null}"#;
        let envelope: Envelope<Vec<WireDeal>> = serde_json::from_str(body).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.pagination(), (false, None));
    }

    #[test]
    fn test_product_defaults() {
        let body = r#"{"name": "Hull survey"}"#;
        let wire: WireDealProduct = serde_json::from_str(body).unwrap();
        let product: DealProduct = wire.into();
        assert_eq!(product.quantity, Decimal::ZERO);
        assert_eq!(product.sum, Decimal::ZERO);
    }
}
