//! Write-back repair of auto-fixable findings
//!
//! Validation only reads; everything that writes back to the
//! accounting system lives here. [`transitions`] encodes the legal
//! status graph, [`orchestrator`] plans paths through it and applies
//! them with bounded, jittered retries.

pub mod orchestrator;
pub mod transitions;

pub use orchestrator::{FixConfig, FixContext, FixOrchestrator, FixOutcome};
pub use transitions::{allowed_transitions, is_valid_transition, transition_path};
