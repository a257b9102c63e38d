//! Pipedrive REST client
//!
//! Implements [`DealApi`](crate::api::DealApi) over Pipedrive's v1
//! endpoints. Wire envelopes live in [`types`]; the client converts
//! them into the domain records in [`crate::models`].

mod client;
mod types;

pub use client::PipedriveClient;
