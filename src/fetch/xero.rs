//! Quote and project retrieval from the accounting API

use std::sync::Arc;

use crate::api::{ProjectApi, QuoteApi};
use crate::error::{FetchError, FetchResult};
use crate::models::{Project, Quote};
use crate::rate_limit::RateGate;

use super::{MAX_PAGES, PAGE_LIMIT};

/// Fetches complete quote and project collections.
///
/// Unlike the deal fetch there is no partial-failure tolerance here: a
/// failed page aborts the collection, because rules that scan for
/// omissions (orphaned quotes, unmatched deals) are only sound over the
/// full universe of records.
pub struct XeroFetcher {
    quotes: Arc<dyn QuoteApi>,
    projects: Arc<dyn ProjectApi>,
    gate: Arc<RateGate>,
}

impl XeroFetcher {
    pub fn new(
        quotes: Arc<dyn QuoteApi>,
        projects: Arc<dyn ProjectApi>,
        gate: Arc<RateGate>,
    ) -> Self {
        Self {
            quotes,
            projects,
            gate,
        }
    }

    /// Fetch every quote, all statuses. The quote listing has no page
    /// count, so a short page signals exhaustion.
    pub async fn fetch_all_quotes(&self) -> FetchResult<Vec<Quote>> {
        let mut quotes = Vec::new();
        let mut page: u32 = 1;

        loop {
            self.gate.wait_if_needed().await?;
            let batch = self
                .quotes
                .fetch_quote_page(page)
                .await
                .map_err(|e| FetchError::Xero {
                    message: format!("quote page {page}: {e:#}"),
                })?;

            let batch_len = batch.len();
            quotes.extend(batch);

            if (batch_len as u32) < PAGE_LIMIT {
                break;
            }
            if page >= MAX_PAGES {
                tracing::warn!(page, "pagination cap reached, truncating quote listing");
                break;
            }
            page += 1;
        }

        tracing::info!(total = quotes.len(), pages = page, "quote fetch complete");
        Ok(quotes)
    }

    /// Fetch every in-progress project, following the reported page
    /// count.
    pub async fn fetch_all_projects(&self) -> FetchResult<Vec<Project>> {
        let mut projects = Vec::new();
        let mut page: u32 = 1;

        loop {
            self.gate.wait_if_needed().await?;
            let batch = self
                .projects
                .fetch_project_page(page)
                .await
                .map_err(|e| FetchError::Xero {
                    message: format!("project page {page}: {e:#}"),
                })?;

            let empty = batch.projects.is_empty();
            projects.extend(batch.projects);

            if empty || page >= batch.page_count {
                break;
            }
            if page >= MAX_PAGES {
                tracing::warn!(page, "pagination cap reached, truncating project listing");
                break;
            }
            page += 1;
        }

        tracing::info!(total = projects.len(), "project fetch complete");
        Ok(projects)
    }
}
