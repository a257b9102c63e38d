//! Xero REST client
//!
//! Implements [`QuoteApi`](crate::api::QuoteApi) and
//! [`ProjectApi`](crate::api::ProjectApi) over the accounting and
//! projects endpoints. Quote payloads use Xero's PascalCase wire
//! spelling, projects use camelCase; both are confined to [`types`].

mod client;
mod types;

pub use client::{StaticTokenProvider, XeroClient};
