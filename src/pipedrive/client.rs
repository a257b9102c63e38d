//! Pipedrive API client
//!
//! Rate limiting is not handled here; the fetch layer holds the shared
//! gate and calls it before each request.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::api::{DealApi, DealPage, DealStatusFilter};
use crate::models::DealProduct;

use super::types::{Envelope, WireDeal, WireDealProduct};

const PD_API_BASE: &str = "https://api.pipedrive.com/v1";

/// Pipedrive API client authenticated by api token.
pub struct PipedriveClient {
    http: Client,
    api_token: String,
    base_url: String,
}

impl PipedriveClient {
    /// Create a new client from the `PIPEDRIVE_API_TOKEN` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var("PIPEDRIVE_API_TOKEN")
            .context("PIPEDRIVE_API_TOKEN environment variable not set")?;
        Self::new(api_token)
    }

    /// Create a new client with the given api token.
    pub fn new(api_token: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_token,
            base_url: PD_API_BASE.to_string(),
        })
    }

    /// Make a GET request, appending token auth.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let url = format!("{}{}{}api_token={}", self.base_url, path, sep, self.api_token);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Pipedrive API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;

        if !envelope.success {
            return Err(anyhow!(
                "Pipedrive reported failure for {}: {}",
                path,
                envelope.error.as_deref().unwrap_or("no error message")
            ));
        }
        Ok(envelope)
    }
}

#[async_trait]
impl DealApi for PipedriveClient {
    async fn fetch_deal_page(
        &self,
        pipeline_id: i64,
        status: DealStatusFilter,
        start: u32,
        limit: u32,
    ) -> Result<DealPage> {
        let envelope: Envelope<Vec<WireDeal>> = self
            .get(&format!(
                "/pipelines/{}/deals?status={}&start={}&limit={}",
                pipeline_id,
                status.query_value(),
                start,
                limit
            ))
            .await?;

        let (more_items, next_start) = envelope.pagination();
        let deals = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(DealPage {
            deals,
            more_items,
            next_start,
        })
    }

    async fn fetch_deal_products(&self, deal_id: i64) -> Result<Vec<DealProduct>> {
        let mut products = Vec::new();
        let mut start: u32 = 0;

        // Product attachments paginate like every other listing.
        loop {
            let envelope: Envelope<Vec<WireDealProduct>> = self
                .get(&format!(
                    "/deals/{}/products?start={}&limit=100",
                    deal_id, start
                ))
                .await?;

            let (more_items, next_start) = envelope.pagination();
            products.extend(envelope.data.unwrap_or_default().into_iter().map(Into::into));

            match (more_items, next_start) {
                (true, Some(next)) => start = next,
                _ => break,
            }
        }

        Ok(products)
    }
}
