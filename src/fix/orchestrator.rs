//! Applies auto-fixes through the accounting system's write API
//!
//! Status repairs walk the transition table hop by hop, persisting the
//! server's returned representation between hops because the remote
//! system normalizes fields on every write. Line-item edits on an
//! `ACCEPTED` quote detour through `SENT` and restore afterwards; a
//! failed restore still reports the edit as applied, with an explicit
//! warning about the stranded status.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::api::QuoteApi;
use crate::error::{FixError, FixResult};
use crate::fix::transitions::transition_path;
use crate::models::{IssueCode, LineItem, Quote, QuoteStatus, ValidationIssue};
use crate::rate_limit::RateGate;

/// Retry policy for write calls.
#[derive(Debug, Clone)]
pub struct FixConfig {
    pub max_retries: u32,
    /// Base delay, doubled per attempt and jittered.
    pub retry_delay: Duration,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// The quotes a fix run may operate on, as fetched by validation.
pub struct FixContext<'a> {
    pub quotes: &'a [Quote],
}

impl<'a> FixContext<'a> {
    pub fn new(quotes: &'a [Quote]) -> Self {
        Self { quotes }
    }

    fn quote(&self, quote_id: &Uuid) -> Option<&'a Quote> {
        self.quotes.iter().find(|q| q.quote_id == *quote_id)
    }
}

/// Outcome of one fix application. Partial success is explicit:
/// `applied` can be true while `warnings` is non-empty.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub applied: bool,
    pub resulting_status: QuoteStatus,
    pub warnings: Vec<String>,
    /// Total write attempts across all hops, including retries.
    pub attempts: u32,
}

/// Dispatches auto-fixable findings onto write operations.
pub struct FixOrchestrator {
    api: Arc<dyn QuoteApi>,
    gate: Arc<RateGate>,
    config: FixConfig,
}

impl FixOrchestrator {
    pub fn new(api: Arc<dyn QuoteApi>, gate: Arc<RateGate>) -> Self {
        Self {
            api,
            gate,
            config: FixConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FixConfig) -> Self {
        self.config = config;
        self
    }

    /// Repairs the finding described by `issue`, if its code is one the
    /// fixer knows how to handle.
    pub async fn apply_fix(
        &self,
        issue: &ValidationIssue,
        ctx: &FixContext<'_>,
    ) -> FixResult<FixOutcome> {
        match issue.code {
            IssueCode::QuoteStatusMisaligned | IssueCode::InvoiceStageQuoteNotInvoiced => {
                let quote_id = issue.quote_id.ok_or_else(|| FixError::MissingMetadata {
                    code: issue.code.as_str().to_string(),
                    detail: "no quote id recorded".to_string(),
                })?;
                let target = issue
                    .metadata
                    .get("expected_status")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| FixError::MissingMetadata {
                        code: issue.code.as_str().to_string(),
                        detail: "expected_status".to_string(),
                    })?;
                let target =
                    QuoteStatus::from_str(target).map_err(|e| FixError::MissingMetadata {
                        code: issue.code.as_str().to_string(),
                        detail: e,
                    })?;
                let quote = ctx.quote(&quote_id).ok_or_else(|| FixError::QuoteNotLoaded {
                    quote_id: quote_id.to_string(),
                })?;
                self.set_quote_status(quote, target).await
            }
            other => Err(FixError::NotFixable {
                code: other.as_str().to_string(),
            }),
        }
    }

    /// Walks the quote to `target` one legal hop at a time.
    pub async fn set_quote_status(
        &self,
        quote: &Quote,
        target: QuoteStatus,
    ) -> FixResult<FixOutcome> {
        let path = transition_path(quote.status, target)?;
        if path.is_empty() {
            return Ok(FixOutcome {
                applied: false,
                resulting_status: quote.status,
                warnings: vec![format!(
                    "quote '{}' is already {}, nothing to apply",
                    quote.display_number(),
                    target
                )],
                attempts: 0,
            });
        }

        tracing::info!(
            quote = %quote.display_number(),
            from = %quote.status,
            to = %target,
            hops = path.len(),
            "applying status transition"
        );

        let mut attempts = 0;
        let mut current = quote.clone();
        for hop in path {
            let (updated, used) = self.put_status_with_retry(&current.quote_id, hop).await?;
            attempts += used;
            current = updated;
        }

        let mut warnings = Vec::new();
        if current.status != target {
            warnings.push(format!(
                "server reports status {} after transitioning to {}",
                current.status, target
            ));
        }
        Ok(FixOutcome {
            applied: current.status == target,
            resulting_status: current.status,
            warnings,
            attempts,
        })
    }

    /// Replaces a quote's line items, detouring around the `ACCEPTED`
    /// edit restriction.
    pub async fn update_line_items(
        &self,
        quote: &Quote,
        items: &[LineItem],
    ) -> FixResult<FixOutcome> {
        if quote.status == QuoteStatus::Invoiced {
            return Err(FixError::InvoicedImmutable {
                quote_number: quote.display_number(),
            });
        }

        let needs_detour = quote.status == QuoteStatus::Accepted;
        let mut attempts = 0;
        let mut warnings = Vec::new();
        let mut current = quote.clone();

        if needs_detour {
            let (updated, used) = self
                .put_status_with_retry(&current.quote_id, QuoteStatus::Sent)
                .await?;
            attempts += used;
            current = updated;
        }

        let (updated, used) = self.put_line_items_with_retry(&current.quote_id, items).await?;
        attempts += used;
        current = updated;

        if needs_detour {
            match self
                .put_status_with_retry(&current.quote_id, QuoteStatus::Accepted)
                .await
            {
                Ok((updated, used)) => {
                    attempts += used;
                    current = updated;
                }
                Err(e) => {
                    if let FixError::WriteFailed { attempts: used, .. } = &e {
                        attempts += used;
                    }
                    tracing::warn!(
                        quote = %quote.display_number(),
                        error = %e,
                        "line items updated but status restore failed"
                    );
                    warnings.push(format!(
                        "line items updated but quote '{}' could not be restored to ACCEPTED and remains {}: {e}",
                        quote.display_number(),
                        current.status
                    ));
                }
            }
        }

        Ok(FixOutcome {
            applied: true,
            resulting_status: current.status,
            warnings,
            attempts,
        })
    }

    async fn put_status_with_retry(
        &self,
        quote_id: &Uuid,
        status: QuoteStatus,
    ) -> FixResult<(Quote, u32)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.gate.wait_if_needed().await?;
            match self.api.update_quote_status(quote_id, status).await {
                Ok(quote) => return Ok((quote, attempt)),
                Err(e) if attempt < self.config.max_retries => {
                    tracing::warn!(attempt, error = %format!("{e:#}"), "status write failed, retrying");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => {
                    return Err(FixError::WriteFailed {
                        attempts: attempt,
                        message: format!("{e:#}"),
                    })
                }
            }
        }
    }

    async fn put_line_items_with_retry(
        &self,
        quote_id: &Uuid,
        items: &[LineItem],
    ) -> FixResult<(Quote, u32)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.gate.wait_if_needed().await?;
            match self.api.update_quote_line_items(quote_id, items).await {
                Ok(quote) => return Ok((quote, attempt)),
                Err(e) if attempt < self.config.max_retries => {
                    tracing::warn!(attempt, error = %format!("{e:#}"), "line item write failed, retrying");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => {
                    return Err(FixError::WriteFailed {
                        attempts: attempt,
                        message: format!("{e:#}"),
                    })
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self
            .config
            .retry_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=250))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::error::TransitionError;

    fn sample_quote(status: QuoteStatus) -> Quote {
        Quote {
            quote_id: Uuid::new_v4(),
            quote_number: Some("NY2594-QU0474-1".to_string()),
            status,
            total: Decimal::new(1000, 0),
            currency_code: Some("GBP".to_string()),
            reference: None,
            contact_name: Some("Maritime Ltd".to_string()),
            line_items: Vec::new(),
        }
    }

    /// Write API fake: echoes writes back, optionally failing the first
    /// N calls or rejecting restores to ACCEPTED.
    struct ScriptedWrites {
        quote: Mutex<Quote>,
        status_calls: Mutex<Vec<QuoteStatus>>,
        line_item_calls: Mutex<u32>,
        fail_first: Mutex<u32>,
        reject_accepted: bool,
    }

    impl ScriptedWrites {
        fn new(quote: Quote) -> Self {
            Self {
                quote: Mutex::new(quote),
                status_calls: Mutex::new(Vec::new()),
                line_item_calls: Mutex::new(0),
                fail_first: Mutex::new(0),
                reject_accepted: false,
            }
        }

        fn failing_first(mut self, n: u32) -> Self {
            self.fail_first = Mutex::new(n);
            self
        }

        fn rejecting_accepted(mut self) -> Self {
            self.reject_accepted = true;
            self
        }

        fn take_flaky_failure(&self) -> bool {
            let mut remaining = self.fail_first.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        }
    }

    #[async_trait]
    impl QuoteApi for ScriptedWrites {
        async fn fetch_quote_page(&self, _page: u32) -> anyhow::Result<Vec<Quote>> {
            Ok(Vec::new())
        }

        async fn fetch_quote_by_id(&self, _quote_id: &Uuid) -> anyhow::Result<Option<Quote>> {
            Ok(None)
        }

        async fn fetch_quote_by_number(&self, _number: &str) -> anyhow::Result<Option<Quote>> {
            Ok(None)
        }

        async fn update_quote_status(
            &self,
            _quote_id: &Uuid,
            status: QuoteStatus,
        ) -> anyhow::Result<Quote> {
            if self.take_flaky_failure() {
                anyhow::bail!("502 Bad Gateway");
            }
            if self.reject_accepted && status == QuoteStatus::Accepted {
                anyhow::bail!("validation error: quote cannot be accepted");
            }
            self.status_calls.lock().unwrap().push(status);
            let mut quote = self.quote.lock().unwrap();
            quote.status = status;
            Ok(quote.clone())
        }

        async fn update_quote_line_items(
            &self,
            _quote_id: &Uuid,
            items: &[LineItem],
        ) -> anyhow::Result<Quote> {
            if self.take_flaky_failure() {
                anyhow::bail!("502 Bad Gateway");
            }
            *self.line_item_calls.lock().unwrap() += 1;
            let mut quote = self.quote.lock().unwrap();
            quote.line_items = items.to_vec();
            Ok(quote.clone())
        }
    }

    fn fixer(api: Arc<ScriptedWrites>) -> FixOrchestrator {
        FixOrchestrator::new(api, Arc::new(RateGate::unlimited())).with_config(FixConfig {
            max_retries: 3,
            retry_delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn test_draft_to_accepted_walks_through_sent() {
        let quote = sample_quote(QuoteStatus::Draft);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let outcome = fixer(api.clone())
            .set_quote_status(&quote, QuoteStatus::Accepted)
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.resulting_status, QuoteStatus::Accepted);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            *api.status_calls.lock().unwrap(),
            vec![QuoteStatus::Sent, QuoteStatus::Accepted]
        );
    }

    #[tokio::test]
    async fn test_already_at_target_applies_nothing() {
        let quote = sample_quote(QuoteStatus::Accepted);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let outcome = fixer(api.clone())
            .set_quote_status(&quote, QuoteStatus::Accepted)
            .await
            .unwrap();

        assert!(!outcome.applied);
        assert_eq!(outcome.attempts, 0);
        assert!(api.status_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_transition_path_is_typed_error() {
        let quote = sample_quote(QuoteStatus::Deleted);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let err = fixer(api)
            .set_quote_status(&quote, QuoteStatus::Accepted)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FixError::Transition(TransitionError::NoPath { .. })
        ));
    }

    #[tokio::test]
    async fn test_transient_failures_retry_then_succeed() {
        let quote = sample_quote(QuoteStatus::Sent);
        let api = Arc::new(ScriptedWrites::new(quote.clone()).failing_first(2));
        let outcome = fixer(api)
            .set_quote_status(&quote, QuoteStatus::Accepted)
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_attempts() {
        let quote = sample_quote(QuoteStatus::Sent);
        let api = Arc::new(ScriptedWrites::new(quote.clone()).failing_first(5));
        let err = fixer(api)
            .set_quote_status(&quote, QuoteStatus::Accepted)
            .await
            .unwrap_err();

        match err {
            FixError::WriteFailed { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("502"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invoiced_line_items_rejected_outright() {
        let quote = sample_quote(QuoteStatus::Invoiced);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let err = fixer(api.clone())
            .update_line_items(&quote, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, FixError::InvoicedImmutable { .. }));
        assert!(api.status_calls.lock().unwrap().is_empty());
        assert_eq!(*api.line_item_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_accepted_edit_detours_and_restores() {
        let quote = sample_quote(QuoteStatus::Accepted);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let outcome = fixer(api.clone())
            .update_line_items(&quote, &[LineItem::default()])
            .await
            .unwrap();

        assert!(outcome.applied);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.resulting_status, QuoteStatus::Accepted);
        assert_eq!(
            *api.status_calls.lock().unwrap(),
            vec![QuoteStatus::Sent, QuoteStatus::Accepted]
        );
        assert_eq!(*api.line_item_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_restore_still_reports_edit_with_warning() {
        let quote = sample_quote(QuoteStatus::Accepted);
        let api = Arc::new(ScriptedWrites::new(quote.clone()).rejecting_accepted());
        let outcome = fixer(api.clone())
            .update_line_items(&quote, &[LineItem::default()])
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.resulting_status, QuoteStatus::Sent);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("could not be restored"));
        assert_eq!(*api.line_item_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sent_edit_needs_no_detour() {
        let quote = sample_quote(QuoteStatus::Sent);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let outcome = fixer(api.clone())
            .update_line_items(&quote, &[LineItem::default()])
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.resulting_status, QuoteStatus::Sent);
        assert!(api.status_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_fix_dispatches_on_metadata() {
        let quote = sample_quote(QuoteStatus::Sent);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let quotes = vec![quote.clone()];
        let ctx = FixContext::new(&quotes);

        let issue = ValidationIssue::error(IssueCode::QuoteStatusMisaligned, "status drift")
            .with_quote(quote.quote_id)
            .with_metadata("expected_status", serde_json::json!("ACCEPTED"))
            .with_metadata("current_status", serde_json::json!("SENT"));
        let outcome = fixer(api).apply_fix(&issue, &ctx).await.unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.resulting_status, QuoteStatus::Accepted);
    }

    #[tokio::test]
    async fn test_apply_fix_rejects_unfixable_codes() {
        let quote = sample_quote(QuoteStatus::Sent);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let quotes = vec![quote.clone()];
        let ctx = FixContext::new(&quotes);

        let issue = ValidationIssue::warning(IssueCode::ContactNameMismatch, "names differ")
            .with_quote(quote.quote_id);
        let err = fixer(api).apply_fix(&issue, &ctx).await.unwrap_err();

        assert!(matches!(err, FixError::NotFixable { .. }));
    }

    #[tokio::test]
    async fn test_apply_fix_requires_loaded_quote() {
        let quote = sample_quote(QuoteStatus::Sent);
        let api = Arc::new(ScriptedWrites::new(quote.clone()));
        let ctx = FixContext::new(&[]);

        let issue = ValidationIssue::error(IssueCode::QuoteStatusMisaligned, "status drift")
            .with_quote(quote.quote_id)
            .with_metadata("expected_status", serde_json::json!("ACCEPTED"));
        let err = fixer(api).apply_fix(&issue, &ctx).await.unwrap_err();

        assert!(matches!(err, FixError::QuoteNotLoaded { .. }));
    }
}
