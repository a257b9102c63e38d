//! Xero API client
//!
//! Callers are expected to clear the shared [`RateGate`] before each
//! request; the client's own involvement with the gate is limited to
//! feeding back the remaining-quota headers Xero returns, which
//! recalibrate the gate's local estimates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use uuid::Uuid;

use crate::api::{AccessGrant, ProjectApi, ProjectPage, QuoteApi, TokenProvider};
use crate::models::{LineItem, Quote, QuoteStatus};
use crate::rate_limit::RateGate;

use super::types::{ProjectsResponse, QuoteLineItemsUpdate, QuoteStatusUpdate, QuotesResponse};

const XERO_API_BASE: &str = "https://api.xero.com";
const PROJECT_PAGE_SIZE: u32 = 100;

/// Token provider backed by a pre-issued token, for CLI use where the
/// OAuth dance happens outside the process.
pub struct StaticTokenProvider {
    grant: AccessGrant,
}

impl StaticTokenProvider {
    /// Create from `XERO_ACCESS_TOKEN` and `XERO_TENANT_ID`.
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("XERO_ACCESS_TOKEN")
            .context("XERO_ACCESS_TOKEN environment variable not set")?;
        let tenant_id = std::env::var("XERO_TENANT_ID")
            .context("XERO_TENANT_ID environment variable not set")?;
        Ok(Self::new(access_token, tenant_id))
    }

    pub fn new(access_token: String, tenant_id: String) -> Self {
        Self {
            grant: AccessGrant {
                access_token,
                effective_tenant_id: tenant_id,
            },
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn ensure_valid_token(&self) -> Result<AccessGrant> {
        Ok(self.grant.clone())
    }
}

/// Xero API client covering the accounting (quotes) and projects
/// endpoints.
pub struct XeroClient {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    gate: Arc<RateGate>,
    base_url: String,
}

impl XeroClient {
    pub fn new(tokens: Arc<dyn TokenProvider>, gate: Arc<RateGate>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            tokens,
            gate,
            base_url: XERO_API_BASE.to_string(),
        })
    }

    async fn send_get(&self, path: &str) -> Result<Response> {
        let grant = self.tokens.ensure_valid_token().await?;
        self.http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&grant.access_token)
            .header("Xero-Tenant-Id", &grant.effective_tenant_id)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", path))
    }

    /// Feed the remaining-quota headers back into the shared gate.
    async fn record_budget_headers(&self, response: &Response) {
        let minute = header_u32(response, "X-MinLimit-Remaining");
        let day = header_u32(response, "X-DayLimit-Remaining");
        self.gate.record_remote_counts(minute, day).await;
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
        path: &str,
    ) -> Result<T> {
        self.record_budget_headers(&response).await;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Xero API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_get(path).await?;
        self.parse(response, path).await
    }

    /// GET that maps a 404 to `None` instead of an error.
    async fn get_json_optional<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>> {
        let response = self.send_get(path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            self.record_budget_headers(&response).await;
            return Ok(None);
        }
        Ok(Some(self.parse(response, path).await?))
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let grant = self.tokens.ensure_valid_token().await?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&grant.access_token)
            .header("Xero-Tenant-Id", &grant.effective_tenant_id)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to post to {}", path))?;
        self.parse(response, path).await
    }
}

fn header_u32(response: &Response, name: &str) -> Option<u32> {
    response.headers().get(name)?.to_str().ok()?.parse().ok()
}

fn single_quote(response: QuotesResponse, action: &str) -> Result<Quote> {
    response
        .quotes
        .into_iter()
        .next()
        .map(Into::into)
        .ok_or_else(|| anyhow!("Xero returned no quote for {}", action))
}

#[async_trait]
impl QuoteApi for XeroClient {
    async fn fetch_quote_page(&self, page: u32) -> Result<Vec<Quote>> {
        let response: QuotesResponse = self
            .get_json(&format!("/api.xro/2.0/Quotes?page={}", page))
            .await?;
        Ok(response.quotes.into_iter().map(Into::into).collect())
    }

    async fn fetch_quote_by_id(&self, quote_id: &Uuid) -> Result<Option<Quote>> {
        let response: Option<QuotesResponse> = self
            .get_json_optional(&format!("/api.xro/2.0/Quotes/{}", quote_id))
            .await?;
        Ok(response
            .and_then(|r| r.quotes.into_iter().next())
            .map(Into::into))
    }

    async fn fetch_quote_by_number(&self, quote_number: &str) -> Result<Option<Quote>> {
        let encoded: String = url::form_urlencoded::byte_serialize(quote_number.as_bytes()).collect();
        let response: QuotesResponse = self
            .get_json(&format!("/api.xro/2.0/Quotes?quoteNumber={}", encoded))
            .await?;
        Ok(response.quotes.into_iter().next().map(Into::into))
    }

    async fn update_quote_status(&self, quote_id: &Uuid, status: QuoteStatus) -> Result<Quote> {
        let response: QuotesResponse = self
            .post_json(
                &format!("/api.xro/2.0/Quotes/{}", quote_id),
                &QuoteStatusUpdate { status },
            )
            .await?;
        single_quote(response, &format!("status update on {}", quote_id))
    }

    async fn update_quote_line_items(
        &self,
        quote_id: &Uuid,
        line_items: &[LineItem],
    ) -> Result<Quote> {
        let body = QuoteLineItemsUpdate {
            line_items: line_items.iter().map(Into::into).collect(),
        };
        let response: QuotesResponse = self
            .post_json(&format!("/api.xro/2.0/Quotes/{}", quote_id), &body)
            .await?;
        single_quote(response, &format!("line item update on {}", quote_id))
    }
}

#[async_trait]
impl ProjectApi for XeroClient {
    async fn fetch_project_page(&self, page: u32) -> Result<ProjectPage> {
        let response: ProjectsResponse = self
            .get_json(&format!(
                "/projects.xro/2.0/Projects?states=INPROGRESS&page={}&pageSize={}",
                page, PROJECT_PAGE_SIZE
            ))
            .await?;

        let page_count = response
            .pagination
            .and_then(|p| p.page_count)
            .unwrap_or(1)
            .max(1);
        Ok(ProjectPage {
            projects: response.items.into_iter().map(Into::into).collect(),
            page_count,
        })
    }
}
