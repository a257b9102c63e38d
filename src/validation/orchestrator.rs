//! Validation run orchestration
//!
//! Drives one tenant's run end to end: fetch deals, quotes and
//! projects, run the deal-scoped rules, run the cross-system rules,
//! then join everything into a [`ValidationResult`]. Steps execute
//! strictly in order; the first failing step aborts the run and the
//! returned [`WorkflowFailure`] keeps the session so callers can see
//! how far it got.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::api::{DealApi, DealStatusFilter, NullProgress, ProgressSink, ProjectApi, QuoteApi};
use crate::config::TenantConfig;
use crate::error::WorkflowFailure;
use crate::fetch::{DealFetcher, XeroFetcher};
use crate::models::{
    Deal, DealStatus, IssueCode, Project, Quote, ValidatedDeal, ValidatedProject, ValidatedQuote,
    ValidationIssue, ValidationResult, ValidationSession, ValidationSummary,
};
use crate::parsing::{extract_deal_id, generate_project_key, parse_title, project_key_for_title};
use crate::rate_limit::RateGate;
use crate::validation::rules;
use crate::validation::{ProductLookup, QuoteResolution, ValidationContext};

const STEP_FETCH_DEALS: &str = "fetch_deals";
const STEP_FETCH_QUOTES: &str = "fetch_quotes";
const STEP_FETCH_PROJECTS: &str = "fetch_projects";
const STEP_DEAL_RULES: &str = "deal_rules";
const STEP_CROSS_CHECKS: &str = "cross_checks";
const STEP_ASSEMBLE: &str = "assemble";

/// Runs the full validation workflow for one tenant.
pub struct ValidationOrchestrator {
    tenant: TenantConfig,
    deal_fetcher: DealFetcher,
    xero_fetcher: XeroFetcher,
    quote_api: Arc<dyn QuoteApi>,
    gate: Arc<RateGate>,
    progress: Arc<dyn ProgressSink>,
}

impl ValidationOrchestrator {
    pub fn new(
        tenant: TenantConfig,
        deal_api: Arc<dyn DealApi>,
        quote_api: Arc<dyn QuoteApi>,
        project_api: Arc<dyn ProjectApi>,
        gate: Arc<RateGate>,
    ) -> Self {
        Self {
            deal_fetcher: DealFetcher::new(deal_api, Arc::clone(&gate)),
            xero_fetcher: XeroFetcher::new(Arc::clone(&quote_api), project_api, Arc::clone(&gate)),
            quote_api,
            gate,
            tenant,
            progress: Arc::new(NullProgress),
        }
    }

    /// Replaces the no-op progress sink, e.g. with a terminal reporter.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self) -> Result<ValidationSession, WorkflowFailure> {
        let mut session = ValidationSession::new(&self.tenant.tenant_id);
        tracing::info!(
            tenant = %self.tenant.tenant_id,
            session = %session.session_id,
            "starting validation run"
        );

        self.begin(
            &mut session,
            STEP_FETCH_DEALS,
            "Fetch deals",
            "Pull every configured pipeline from the CRM",
        );
        let deals = match self
            .deal_fetcher
            .fetch_all_deals(&self.tenant.pipeline_ids, DealStatusFilter::AllNotDeleted)
            .await
        {
            Ok(deals) => deals,
            Err(e) => return Err(self.abort(session, STEP_FETCH_DEALS, e.to_string())),
        };
        self.complete(
            &mut session,
            STEP_FETCH_DEALS,
            format!(
                "{} deals from {} pipelines",
                deals.len(),
                self.tenant.pipeline_ids.len()
            ),
        );

        self.begin(
            &mut session,
            STEP_FETCH_QUOTES,
            "Fetch quotes",
            "Pull every quote page from the accounting system",
        );
        let mut quotes = match self.xero_fetcher.fetch_all_quotes().await {
            Ok(quotes) => quotes,
            Err(e) => return Err(self.abort(session, STEP_FETCH_QUOTES, e.to_string())),
        };
        self.complete(&mut session, STEP_FETCH_QUOTES, format!("{} quotes", quotes.len()));

        self.begin(
            &mut session,
            STEP_FETCH_PROJECTS,
            "Fetch projects",
            "Pull in-progress projects from the accounting system",
        );
        let projects = match self.xero_fetcher.fetch_all_projects().await {
            Ok(projects) => projects,
            Err(e) => return Err(self.abort(session, STEP_FETCH_PROJECTS, e.to_string())),
        };
        self.complete(
            &mut session,
            STEP_FETCH_PROJECTS,
            format!("{} projects", projects.len()),
        );

        self.begin(
            &mut session,
            STEP_DEAL_RULES,
            "Deal rules",
            "Title, required-field and product checks",
        );
        let products = self.load_products(&deals).await;
        let mut issues: Vec<ValidationIssue> = Vec::new();
        {
            let ctx =
                ValidationContext::new(&self.tenant, &deals, &quotes, &projects, products.clone());
            issues.extend(rules::check_title_format(&ctx));
            issues.extend(rules::check_required_fields(&ctx));
            issues.extend(rules::check_product_presence(&ctx));
        }
        self.complete(
            &mut session,
            STEP_DEAL_RULES,
            format!("{} findings", issues.len()),
        );

        self.begin(
            &mut session,
            STEP_CROSS_CHECKS,
            "Cross-system rules",
            "Quote cross-reference, placement, orphan and format checks",
        );
        let before = issues.len();
        issues.extend(self.spot_check_quotes(&deals, &mut quotes).await);
        {
            let ctx =
                ValidationContext::new(&self.tenant, &deals, &quotes, &projects, products.clone());
            issues.extend(rules::check_quote_cross_reference(&ctx));
            issues.extend(rules::check_pipeline_placement(&ctx));
            issues.extend(rules::check_orphaned_accepted_quotes(&ctx));
            issues.extend(rules::check_accepted_quote_numbers(&ctx));
            issues.extend(rules::check_invoice_stage(&ctx));
            issues.extend(rules::check_tracking_categories(&ctx));
        }
        self.complete(
            &mut session,
            STEP_CROSS_CHECKS,
            format!("{} findings", issues.len() - before),
        );

        self.begin(
            &mut session,
            STEP_ASSEMBLE,
            "Assemble result",
            "Join records with findings and compute the summary",
        );
        let result = self.assemble(&deals, &quotes, &projects, products, issues);
        self.complete(
            &mut session,
            STEP_ASSEMBLE,
            format!(
                "{} errors, {} warnings, {} info",
                result.summary.error_count, result.summary.warning_count, result.summary.info_count
            ),
        );
        session.complete(result);

        tracing::info!(
            tenant = %self.tenant.tenant_id,
            steps = session.completed_steps(),
            "validation run completed"
        );
        Ok(session)
    }

    /// Products for won deals, degraded to a reason string when any
    /// fetch fails.
    async fn load_products(&self, deals: &[Deal]) -> ProductLookup {
        let won: Vec<i64> = deals
            .iter()
            .filter(|d| {
                d.status == DealStatus::Won && !self.tenant.is_ignored_pipeline(d.pipeline_id)
            })
            .map(|d| d.id)
            .collect();
        if won.is_empty() {
            return ProductLookup::empty();
        }
        match self.deal_fetcher.fetch_products(&won).await {
            Ok(map) => ProductLookup::Fetched(map),
            Err(e) => {
                tracing::warn!(error = %e, "product lookup failed, degrading product rule");
                ProductLookup::Unavailable(e.to_string())
            }
        }
    }

    /// Second-chance lookups for deal links that did not resolve
    /// against the fetched pages. Deleted quotes never appear in the
    /// bulk listing, so a stale link may still point at a real quote.
    /// Any lookup failure stops the pass and degrades it to a single
    /// warning.
    async fn spot_check_quotes(
        &self,
        deals: &[Deal],
        quotes: &mut Vec<Quote>,
    ) -> Vec<ValidationIssue> {
        let unresolved: Vec<(Option<Uuid>, Option<String>)> = {
            let ctx =
                ValidationContext::new(&self.tenant, deals, quotes, &[], ProductLookup::empty());
            let mut wanted = Vec::new();
            for deal in ctx.in_scope_deals() {
                let resolved = ctx.resolved(deal.id);
                if matches!(ctx.resolve_quote(resolved), QuoteResolution::NotFound) {
                    let uuid = resolved
                        .xero_quote_id
                        .as_deref()
                        .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
                    wanted.push((uuid, resolved.xero_quote_number.clone()));
                }
            }
            wanted
        };
        if unresolved.is_empty() {
            return Vec::new();
        }

        tracing::debug!(count = unresolved.len(), "spot-checking unresolved quote links");
        let mut known: HashSet<Uuid> = quotes.iter().map(|q| q.quote_id).collect();
        for (uuid, number) in unresolved {
            match self.fetch_candidate(uuid, number.as_deref()).await {
                Ok(Some(quote)) => {
                    if known.insert(quote.quote_id) {
                        quotes.push(quote);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "quote spot-check aborted");
                    return vec![ValidationIssue::warning(
                        IssueCode::XeroValidationFailed,
                        format!("quote spot-check skipped, lookup failed: {e:#}"),
                    )];
                }
            }
        }
        Vec::new()
    }

    async fn fetch_candidate(
        &self,
        uuid: Option<Uuid>,
        number: Option<&str>,
    ) -> anyhow::Result<Option<Quote>> {
        if let Some(uuid) = uuid {
            self.gate.wait_if_needed().await?;
            if let Some(quote) = self.quote_api.fetch_quote_by_id(&uuid).await? {
                return Ok(Some(quote));
            }
        }
        if let Some(number) = number {
            let trimmed = number.trim();
            if !trimmed.is_empty() {
                self.gate.wait_if_needed().await?;
                return self.quote_api.fetch_quote_by_number(trimmed).await;
            }
        }
        Ok(None)
    }

    fn assemble(
        &self,
        deals: &[Deal],
        quotes: &[Quote],
        projects: &[Project],
        products: ProductLookup,
        issues: Vec<ValidationIssue>,
    ) -> ValidationResult {
        let ctx = ValidationContext::new(&self.tenant, deals, quotes, projects, products);

        let mut deal_quote: HashMap<i64, Uuid> = HashMap::new();
        let mut quote_deal: HashMap<Uuid, i64> = HashMap::new();
        for deal in deals {
            if let QuoteResolution::Matched { quote, .. } = ctx.resolve_quote(ctx.resolved(deal.id))
            {
                deal_quote.insert(deal.id, quote.quote_id);
                quote_deal.entry(quote.quote_id).or_insert(deal.id);
            }
        }
        // Reference text can claim a quote when no custom field does.
        for quote in quotes {
            if quote_deal.contains_key(&quote.quote_id) {
                continue;
            }
            if let Some(deal_id) = quote.reference.as_deref().and_then(extract_deal_id) {
                if ctx.deal(deal_id).is_some() {
                    quote_deal.insert(quote.quote_id, deal_id);
                }
            }
        }

        let validated_deals: Vec<ValidatedDeal> = deals
            .iter()
            .map(|deal| {
                let parsed = parse_title(&deal.title);
                let key = project_key_for_title(&deal.title);
                ValidatedDeal {
                    deal: deal.clone(),
                    project_code: parsed.project_code,
                    vessel_name: parsed.vessel_name,
                    fields: ctx.resolved(deal.id).clone(),
                    matched_quote_id: deal_quote.get(&deal.id).copied(),
                    project_key: (!key.is_empty()).then_some(key),
                    issues: issues
                        .iter()
                        .filter(|i| i.deal_id == Some(deal.id))
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        let validated_quotes: Vec<ValidatedQuote> = quotes
            .iter()
            .map(|quote| ValidatedQuote {
                quote: quote.clone(),
                matched_deal_id: quote_deal.get(&quote.quote_id).copied(),
                issues: issues
                    .iter()
                    .filter(|i| i.quote_id == Some(quote.quote_id))
                    .cloned()
                    .collect(),
            })
            .collect();

        let mut deal_by_key: HashMap<String, i64> = HashMap::new();
        for validated in &validated_deals {
            if let Some(key) = validated.project_key.as_deref() {
                deal_by_key.entry(key.to_string()).or_insert(validated.deal.id);
            }
        }
        let validated_projects: Vec<ValidatedProject> = projects
            .iter()
            .map(|project| {
                let key = generate_project_key(&project.name);
                ValidatedProject {
                    project: project.clone(),
                    matched_deal_id: deal_by_key.get(&key).copied(),
                    project_key: key,
                    issues: Vec::new(),
                }
            })
            .collect();

        let summary = ValidationSummary::compute(
            &validated_deals,
            &validated_quotes,
            &validated_projects,
            &issues,
        );
        ValidationResult {
            tenant_id: self.tenant.tenant_id.clone(),
            generated_at: Utc::now(),
            deals: validated_deals,
            quotes: validated_quotes,
            projects: validated_projects,
            issues,
            summary,
        }
    }

    fn begin(&self, session: &mut ValidationSession, id: &str, name: &str, description: &str) {
        tracing::debug!(step = id, "step started");
        session.begin_step(id, name, description);
        self.notify(session);
    }

    fn complete(&self, session: &mut ValidationSession, id: &str, summary: String) {
        tracing::debug!(step = id, summary = %summary, "step completed");
        session.complete_step(id, summary);
        self.notify(session);
    }

    fn abort(&self, mut session: ValidationSession, id: &str, message: String) -> WorkflowFailure {
        tracing::error!(step = id, error = %message, "validation step failed");
        session.fail_step(id, &message);
        self.notify(&session);
        WorkflowFailure {
            failed_step: id.to_string(),
            message,
            session: Box::new(session),
        }
    }

    fn notify(&self, session: &ValidationSession) {
        if let Some(step) = session.steps.last() {
            self.progress.on_step(step);
        }
    }
}
