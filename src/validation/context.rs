//! Shared read-model for the rule set
//!
//! Built once per run from the fetched collections, then handed to
//! every rule by reference. Rules never fetch; they only read the
//! context, which keeps them pure and independently testable.

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::TenantConfig;
use crate::models::{Deal, DealProduct, DealStatus, Project, Quote, ResolvedDealFields};

/// Canonical form for quote-number comparison.
pub fn normalize_quote_number(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Product attachments per deal, or the reason they could not be
/// fetched. An unavailable lookup degrades the product rule to a single
/// warning instead of failing the run.
#[derive(Debug, Clone)]
pub enum ProductLookup {
    Fetched(HashMap<i64, Vec<DealProduct>>),
    Unavailable(String),
}

impl ProductLookup {
    pub fn empty() -> Self {
        ProductLookup::Fetched(HashMap::new())
    }
}

/// Outcome of resolving a deal's stored quote identifiers against the
/// fetched quotes.
#[derive(Debug, Clone, Copy)]
pub enum QuoteResolution<'a> {
    /// Neither quote id nor quote number stored on the deal.
    Unlinked,
    /// Identifier(s) stored but no quote matched.
    NotFound,
    /// A quote matched. `number_conflict` is set when the deal's two
    /// identifiers disagree: the stored number names a different quote
    /// than the stored id, or the id failed to resolve and only the
    /// number matched.
    Matched {
        quote: &'a Quote,
        number_conflict: bool,
    },
}

pub struct ValidationContext<'a> {
    pub tenant: &'a TenantConfig,
    pub deals: &'a [Deal],
    pub quotes: &'a [Quote],
    pub projects: &'a [Project],
    pub products: ProductLookup,
    fields: HashMap<i64, ResolvedDealFields>,
    quotes_by_id: HashMap<Uuid, usize>,
    quotes_by_number: HashMap<String, usize>,
    deals_by_id: HashMap<i64, usize>,
    /// Reverse custom-field links: quote uuid to the first deal
    /// claiming it.
    linked_deal_by_quote: HashMap<Uuid, i64>,
    empty_fields: ResolvedDealFields,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        tenant: &'a TenantConfig,
        deals: &'a [Deal],
        quotes: &'a [Quote],
        projects: &'a [Project],
        products: ProductLookup,
    ) -> Self {
        let fields: HashMap<i64, ResolvedDealFields> = deals
            .iter()
            .map(|deal| (deal.id, tenant.custom_fields.resolve(deal)))
            .collect();

        let quotes_by_id: HashMap<Uuid, usize> = quotes
            .iter()
            .enumerate()
            .map(|(idx, quote)| (quote.quote_id, idx))
            .collect();

        let mut quotes_by_number: HashMap<String, usize> = HashMap::new();
        for (idx, quote) in quotes.iter().enumerate() {
            if let Some(number) = quote.quote_number.as_deref() {
                let key = normalize_quote_number(number);
                if !key.is_empty() {
                    quotes_by_number.entry(key).or_insert(idx);
                }
            }
        }

        let deals_by_id: HashMap<i64, usize> = deals
            .iter()
            .enumerate()
            .map(|(idx, deal)| (deal.id, idx))
            .collect();

        let mut linked_deal_by_quote: HashMap<Uuid, i64> = HashMap::new();
        for deal in deals {
            let resolved = &fields[&deal.id];
            if let Some(uuid) = parse_quote_uuid(resolved) {
                linked_deal_by_quote.entry(uuid).or_insert(deal.id);
            }
            if let Some(number) = resolved.xero_quote_number.as_deref() {
                if let Some(&idx) = quotes_by_number.get(&normalize_quote_number(number)) {
                    linked_deal_by_quote
                        .entry(quotes[idx].quote_id)
                        .or_insert(deal.id);
                }
            }
        }

        Self {
            tenant,
            deals,
            quotes,
            projects,
            products,
            fields,
            quotes_by_id,
            quotes_by_number,
            deals_by_id,
            linked_deal_by_quote,
            empty_fields: ResolvedDealFields::default(),
        }
    }

    /// Resolved custom fields for a deal.
    pub fn resolved(&self, deal_id: i64) -> &ResolvedDealFields {
        self.fields.get(&deal_id).unwrap_or(&self.empty_fields)
    }

    pub fn deal(&self, deal_id: i64) -> Option<&'a Deal> {
        self.deals_by_id.get(&deal_id).map(|&idx| &self.deals[idx])
    }

    pub fn quote_by_uuid(&self, quote_id: &Uuid) -> Option<&'a Quote> {
        self.quotes_by_id.get(quote_id).map(|&idx| &self.quotes[idx])
    }

    pub fn quote_by_number(&self, number: &str) -> Option<&'a Quote> {
        self.quotes_by_number
            .get(&normalize_quote_number(number))
            .map(|&idx| &self.quotes[idx])
    }

    /// Deal claiming this quote through its custom fields, if any.
    pub fn linked_deal_for(&self, quote: &Quote) -> Option<&'a Deal> {
        self.linked_deal_by_quote
            .get(&quote.quote_id)
            .and_then(|&deal_id| self.deal(deal_id))
    }

    /// Deals the rules should look at: not deleted, not in an ignored
    /// pipeline.
    pub fn in_scope_deals(&self) -> impl Iterator<Item = &'a Deal> + '_ {
        self.deals.iter().filter(|deal| {
            deal.status != DealStatus::Deleted && !self.tenant.is_ignored_pipeline(deal.pipeline_id)
        })
    }

    /// Resolve a deal's stored identifiers to a quote, id before
    /// number.
    pub fn resolve_quote(&self, resolved: &ResolvedDealFields) -> QuoteResolution<'a> {
        if resolved.has_no_quote_link() {
            return QuoteResolution::Unlinked;
        }

        let stored_number = resolved
            .xero_quote_number
            .as_deref()
            .map(normalize_quote_number)
            .filter(|n| !n.is_empty());

        if let Some(uuid) = parse_quote_uuid(resolved) {
            if let Some(quote) = self.quote_by_uuid(&uuid) {
                let number_conflict = match &stored_number {
                    Some(stored) => {
                        quote
                            .quote_number
                            .as_deref()
                            .map(normalize_quote_number)
                            .as_deref()
                            != Some(stored.as_str())
                    }
                    None => false,
                };
                return QuoteResolution::Matched {
                    quote,
                    number_conflict,
                };
            }
            // The id resolved nothing; a match by number alone means
            // the two stored identifiers disagree.
            if let Some(stored) = &stored_number {
                if let Some(quote) = self.quote_by_number(stored) {
                    return QuoteResolution::Matched {
                        quote,
                        number_conflict: true,
                    };
                }
            }
            return QuoteResolution::NotFound;
        }

        if let Some(stored) = &stored_number {
            if let Some(quote) = self.quote_by_number(stored) {
                return QuoteResolution::Matched {
                    quote,
                    number_conflict: false,
                };
            }
        }
        QuoteResolution::NotFound
    }
}

fn parse_quote_uuid(resolved: &ResolvedDealFields) -> Option<Uuid> {
    resolved
        .xero_quote_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}
