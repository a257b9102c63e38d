//! Deal and product retrieval from the CRM

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{DealApi, DealStatusFilter};
use crate::error::{FetchError, FetchResult};
use crate::models::{Deal, DealProduct};
use crate::rate_limit::RateGate;

use super::{MAX_PAGES, PAGE_LIMIT};

/// Fetches complete deal collections across all configured pipelines.
pub struct DealFetcher {
    api: Arc<dyn DealApi>,
    gate: Arc<RateGate>,
}

impl DealFetcher {
    pub fn new(api: Arc<dyn DealApi>, gate: Arc<RateGate>) -> Self {
        Self { api, gate }
    }

    /// Fetch every deal in the given pipelines.
    ///
    /// One pipeline failing is logged and skipped so a transient error
    /// on a minor pipeline does not abort the whole run; if every
    /// pipeline fails the fetch as a whole is reported as failed.
    pub async fn fetch_all_deals(
        &self,
        pipeline_ids: &[i64],
        status: DealStatusFilter,
    ) -> FetchResult<Vec<Deal>> {
        let mut deals = Vec::new();
        let mut failed: Vec<i64> = Vec::new();
        let mut last_error = String::new();

        for &pipeline_id in pipeline_ids {
            match self.fetch_pipeline(pipeline_id, status).await {
                Ok(mut page_deals) => {
                    tracing::debug!(
                        pipeline_id,
                        count = page_deals.len(),
                        "fetched pipeline deals"
                    );
                    deals.append(&mut page_deals);
                }
                Err(FetchError::RateLimit(e)) => return Err(FetchError::RateLimit(e)),
                Err(e) => {
                    tracing::warn!(pipeline_id, error = %e, "pipeline fetch failed, skipping");
                    last_error = e.to_string();
                    failed.push(pipeline_id);
                }
            }
        }

        if !pipeline_ids.is_empty() && failed.len() == pipeline_ids.len() {
            return Err(FetchError::Pipedrive {
                message: format!(
                    "all {} pipelines failed to fetch, last error: {}",
                    failed.len(),
                    last_error
                ),
            });
        }

        tracing::info!(
            total = deals.len(),
            pipelines = pipeline_ids.len(),
            skipped = failed.len(),
            "deal fetch complete"
        );
        Ok(deals)
    }

    async fn fetch_pipeline(
        &self,
        pipeline_id: i64,
        status: DealStatusFilter,
    ) -> FetchResult<Vec<Deal>> {
        let mut deals = Vec::new();
        let mut start: u32 = 0;
        let mut pages: u32 = 0;

        loop {
            self.gate.wait_if_needed().await?;
            let page = self
                .api
                .fetch_deal_page(pipeline_id, status, start, PAGE_LIMIT)
                .await
                .map_err(|e| FetchError::Pipedrive {
                    message: format!("pipeline {pipeline_id} page at offset {start}: {e:#}"),
                })?;

            deals.extend(page.deals);
            pages += 1;

            if !page.more_items {
                break;
            }
            if pages >= MAX_PAGES {
                tracing::warn!(
                    pipeline_id,
                    pages,
                    "pagination cap reached, truncating deal listing"
                );
                break;
            }
            start = match page.next_start {
                Some(next) => next,
                // More pages claimed but no offset given; treat the
                // listing as exhausted instead of refetching page one.
                None => break,
            };
        }

        Ok(deals)
    }

    /// Fetch products for each listed deal. Any failure aborts the
    /// lookup; the caller decides whether that degrades or propagates.
    pub async fn fetch_products(
        &self,
        deal_ids: &[i64],
    ) -> FetchResult<HashMap<i64, Vec<DealProduct>>> {
        let mut products = HashMap::new();
        for &deal_id in deal_ids {
            self.gate.wait_if_needed().await?;
            let items = self
                .api
                .fetch_deal_products(deal_id)
                .await
                .map_err(|e| FetchError::Pipedrive {
                    message: format!("products for deal {deal_id}: {e:#}"),
                })?;
            products.insert(deal_id, items);
        }
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::api::DealPage;
    use crate::models::DealStatus;

    /// Serves scripted pages per pipeline; pipeline 13 always errors.
    struct ScriptedDeals {
        pages: Mutex<HashMap<i64, Vec<DealPage>>>,
    }

    #[async_trait]
    impl DealApi for ScriptedDeals {
        async fn fetch_deal_page(
            &self,
            pipeline_id: i64,
            _status: DealStatusFilter,
            _start: u32,
            _limit: u32,
        ) -> anyhow::Result<DealPage> {
            if pipeline_id == 13 {
                anyhow::bail!("upstream 500");
            }
            let mut pages = self.pages.lock().unwrap();
            let queue = pages.get_mut(&pipeline_id).unwrap();
            Ok(queue.remove(0))
        }

        async fn fetch_deal_products(&self, deal_id: i64) -> anyhow::Result<Vec<DealProduct>> {
            if deal_id == 13 {
                anyhow::bail!("upstream 500");
            }
            Ok(vec![DealProduct {
                name: Some("Survey".into()),
                quantity: rust_decimal::Decimal::ONE,
                item_price: rust_decimal::Decimal::new(100, 0),
                sum: rust_decimal::Decimal::new(100, 0),
            }])
        }
    }

    fn deal(id: i64, pipeline_id: i64) -> Deal {
        Deal {
            id,
            title: format!("ED{id} - Vessel"),
            status: DealStatus::Won,
            value: rust_decimal::Decimal::new(1000, 0),
            currency: Some("GBP".into()),
            pipeline_id,
            stage_id: None,
            org_name: None,
            custom_fields: HashMap::new(),
        }
    }

    fn fetcher(pages: HashMap<i64, Vec<DealPage>>) -> DealFetcher {
        DealFetcher::new(
            Arc::new(ScriptedDeals {
                pages: Mutex::new(pages),
            }),
            Arc::new(RateGate::unlimited()),
        )
    }

    #[tokio::test]
    async fn test_follows_pagination_across_pages() {
        let mut pages = HashMap::new();
        pages.insert(
            1,
            vec![
                DealPage {
                    deals: vec![deal(1, 1), deal(2, 1)],
                    more_items: true,
                    next_start: Some(2),
                },
                DealPage {
                    deals: vec![deal(3, 1)],
                    more_items: false,
                    next_start: None,
                },
            ],
        );
        let fetched = fetcher(pages)
            .fetch_all_deals(&[1], DealStatusFilter::AllNotDeleted)
            .await
            .unwrap();
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched[2].id, 3);
    }

    #[tokio::test]
    async fn test_failed_pipeline_is_skipped_not_fatal() {
        let mut pages = HashMap::new();
        pages.insert(
            1,
            vec![DealPage {
                deals: vec![deal(1, 1)],
                more_items: false,
                next_start: None,
            }],
        );
        let fetched = fetcher(pages)
            .fetch_all_deals(&[1, 13], DealStatusFilter::Won)
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
    }

    #[tokio::test]
    async fn test_all_pipelines_failing_is_fatal() {
        let err = fetcher(HashMap::new())
            .fetch_all_deals(&[13], DealStatusFilter::Won)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("all 1 pipelines failed"));
    }

    #[tokio::test]
    async fn test_product_lookup_aborts_on_first_failure() {
        let fetcher = fetcher(HashMap::new());
        let ok = fetcher.fetch_products(&[1, 2]).await.unwrap();
        assert_eq!(ok.len(), 2);
        assert!(fetcher.fetch_products(&[1, 13, 2]).await.is_err());
    }
}
