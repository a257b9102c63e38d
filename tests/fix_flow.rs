//! Detect, repair, revalidate
//!
//! Exercises the full repair cycle through the public API:
//! 1. A validation run surfaces a fixable status misalignment, the fix
//!    orchestrator repairs it against the write API, and a second run
//!    comes back clean
//! 2. Line-item edits on an invoiced quote are refused before any
//!    write is attempted
//!
//! Run with: cargo test --test fix_flow

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use pipexero::api::{
    DealApi, DealPage, DealStatusFilter, NullProgress, ProjectApi, ProjectPage, QuoteApi,
};
use pipexero::config::{TenantConfig, TenantRegistry};
use pipexero::fix::{FixConfig, FixContext, FixOrchestrator};
use pipexero::models::{
    Deal, DealProduct, DealStatus, LineItem, Quote, QuoteStatus, TrackingAssignment,
};
use pipexero::{execute_validation_workflow, FixError, RateGate, ValidationSession, WorkflowFailure};

const TENANT_YAML: &str = r#"
version: "1"
tenants:
  - tenant_id: tenant-a
    pipeline_ids: [1]
    custom_fields:
      xero_quote_id: "f_quote_id"
    in_progress_pipeline_ids: [1]
"#;

fn tenant() -> TenantConfig {
    let registry = TenantRegistry::from_yaml(TENANT_YAML).expect("tenant YAML should parse");
    registry.get("tenant-a").expect("tenant-a exists").clone()
}

fn tracked_line_item() -> LineItem {
    LineItem {
        description: Some("Survey work".to_string()),
        quantity: Some(Decimal::ONE),
        unit_amount: Some(Decimal::new(100000, 2)),
        line_amount: Decimal::new(100000, 2),
        tracking: vec![TrackingAssignment {
            category_id: Some("cat-1".to_string()),
            option_id: Some("opt-1".to_string()),
            name: Some("Department".to_string()),
            option: Some("Surveys".to_string()),
        }],
    }
}

fn quote_with_status(deal_id: i64, number: &str, status: QuoteStatus) -> Quote {
    Quote {
        quote_id: Uuid::new_v4(),
        quote_number: Some(number.to_string()),
        status,
        total: Decimal::new(100000, 2),
        currency_code: Some("GBP".to_string()),
        reference: Some(format!("Pipedrive Deal Id: {deal_id}")),
        contact_name: Some("Maritime Ltd".to_string()),
        line_items: vec![tracked_line_item()],
    }
}

fn linked_deal(id: i64, title: &str, quote: &Quote) -> Deal {
    let mut custom_fields = HashMap::new();
    custom_fields.insert("f_quote_id".to_string(), json!(quote.quote_id.to_string()));
    Deal {
        id,
        title: title.to_string(),
        status: DealStatus::Won,
        value: Decimal::new(100000, 2),
        currency: Some("GBP".to_string()),
        pipeline_id: 1,
        stage_id: None,
        org_name: Some("Maritime Ltd".to_string()),
        custom_fields,
    }
}

/// Backend whose quote store is mutable, so status writes from the fix
/// layer are visible to the next validation run.
struct WritableBackend {
    deals: Vec<Deal>,
    quotes: Mutex<Vec<Quote>>,
    line_item_writes: Mutex<u32>,
}

impl WritableBackend {
    fn new(deals: Vec<Deal>, quotes: Vec<Quote>) -> Self {
        Self {
            deals,
            quotes: Mutex::new(quotes),
            line_item_writes: Mutex::new(0),
        }
    }

    fn quote_status(&self, quote_id: &Uuid) -> Option<QuoteStatus> {
        self.quotes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.quote_id == *quote_id)
            .map(|q| q.status)
    }
}

#[async_trait]
impl DealApi for WritableBackend {
    async fn fetch_deal_page(
        &self,
        pipeline_id: i64,
        _status: DealStatusFilter,
        _start: u32,
        _limit: u32,
    ) -> anyhow::Result<DealPage> {
        let deals = self
            .deals
            .iter()
            .filter(|d| d.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        Ok(DealPage {
            deals,
            more_items: false,
            next_start: None,
        })
    }

    async fn fetch_deal_products(&self, _deal_id: i64) -> anyhow::Result<Vec<DealProduct>> {
        Ok(vec![DealProduct {
            name: Some("Survey".to_string()),
            quantity: Decimal::ONE,
            item_price: Decimal::new(100000, 2),
            sum: Decimal::new(100000, 2),
        }])
    }
}

#[async_trait]
impl QuoteApi for WritableBackend {
    async fn fetch_quote_page(&self, page: u32) -> anyhow::Result<Vec<Quote>> {
        if page == 1 {
            Ok(self.quotes.lock().unwrap().clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn fetch_quote_by_id(&self, quote_id: &Uuid) -> anyhow::Result<Option<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.quote_id == *quote_id)
            .cloned())
    }

    async fn fetch_quote_by_number(&self, quote_number: &str) -> anyhow::Result<Option<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.quote_number.as_deref() == Some(quote_number))
            .cloned())
    }

    async fn update_quote_status(
        &self,
        quote_id: &Uuid,
        status: QuoteStatus,
    ) -> anyhow::Result<Quote> {
        let mut quotes = self.quotes.lock().unwrap();
        let quote = quotes
            .iter_mut()
            .find(|q| q.quote_id == *quote_id)
            .ok_or_else(|| anyhow::anyhow!("quote {quote_id} not found"))?;
        quote.status = status;
        Ok(quote.clone())
    }

    async fn update_quote_line_items(
        &self,
        quote_id: &Uuid,
        line_items: &[LineItem],
    ) -> anyhow::Result<Quote> {
        *self.line_item_writes.lock().unwrap() += 1;
        let mut quotes = self.quotes.lock().unwrap();
        let quote = quotes
            .iter_mut()
            .find(|q| q.quote_id == *quote_id)
            .ok_or_else(|| anyhow::anyhow!("quote {quote_id} not found"))?;
        quote.line_items = line_items.to_vec();
        Ok(quote.clone())
    }
}

#[async_trait]
impl ProjectApi for WritableBackend {
    async fn fetch_project_page(&self, _page: u32) -> anyhow::Result<ProjectPage> {
        Ok(ProjectPage {
            projects: Vec::new(),
            page_count: 1,
        })
    }
}

async fn run_workflow(
    backend: &Arc<WritableBackend>,
) -> Result<ValidationSession, WorkflowFailure> {
    execute_validation_workflow(
        tenant(),
        Arc::clone(backend) as Arc<dyn DealApi>,
        Arc::clone(backend) as Arc<dyn QuoteApi>,
        Arc::clone(backend) as Arc<dyn ProjectApi>,
        Arc::new(RateGate::unlimited()),
        Arc::new(NullProgress),
    )
    .await
}

fn fixer(backend: &Arc<WritableBackend>) -> FixOrchestrator {
    FixOrchestrator::new(
        Arc::clone(backend) as Arc<dyn QuoteApi>,
        Arc::new(RateGate::unlimited()),
    )
    .with_config(FixConfig {
        max_retries: 3,
        retry_delay: Duration::from_millis(1),
    })
}

#[tokio::test]
async fn test_misaligned_quote_repaired_and_revalidates_clean() {
    let quote = quote_with_status(501, "NY2900-QU0005-1", QuoteStatus::Sent);
    let quote_id = quote.quote_id;
    let deal = linked_deal(501, "NY2900 - Kestrel", &quote);
    let backend = Arc::new(WritableBackend::new(vec![deal], vec![quote]));

    // First pass: the won deal's quote is stuck at SENT.
    let session = run_workflow(&backend).await.expect("first run completes");
    let result = session.result.expect("completed run carries a result");
    let fixable: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.code.is_auto_fixable())
        .collect();
    assert_eq!(fixable.len(), 1);
    assert_eq!(fixable[0].code.as_str(), "QUOTE_STATUS_MISALIGNED");
    assert_eq!(fixable[0].metadata["expected_status"], "ACCEPTED");

    // Repair it against the same backend the validator read from.
    let quotes: Vec<Quote> = result.quotes.iter().map(|vq| vq.quote.clone()).collect();
    let ctx = FixContext::new(&quotes);
    let outcome = fixer(&backend)
        .apply_fix(fixable[0], &ctx)
        .await
        .expect("fix applies");
    assert!(outcome.applied);
    assert_eq!(outcome.resulting_status, QuoteStatus::Accepted);
    assert_eq!(outcome.attempts, 1, "SENT to ACCEPTED is one hop");
    assert!(outcome.warnings.is_empty());
    assert_eq!(backend.quote_status(&quote_id), Some(QuoteStatus::Accepted));

    // Second pass sees the repaired quote and reports nothing.
    let session = run_workflow(&backend).await.expect("second run completes");
    let result = session.result.expect("completed run carries a result");
    assert!(
        result.issues.is_empty(),
        "expected a clean report after the fix, got {:?}",
        result.issues
    );
    assert_eq!(result.summary.matched_quotes, 1);
}

#[tokio::test]
async fn test_invoiced_quote_line_items_rejected_without_writes() {
    let quote = quote_with_status(601, "NY3000-QU0006-1", QuoteStatus::Invoiced);
    let backend = Arc::new(WritableBackend::new(vec![], vec![quote.clone()]));

    let err = fixer(&backend)
        .update_line_items(&quote, &[tracked_line_item()])
        .await
        .expect_err("invoiced quotes must not be edited");
    assert!(matches!(err, FixError::InvoicedImmutable { .. }));
    assert_eq!(*backend.line_item_writes.lock().unwrap(), 0);
    assert_eq!(
        backend.quote_status(&quote.quote_id),
        Some(QuoteStatus::Invoiced)
    );
}
