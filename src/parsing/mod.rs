//! Pure parsers for the cross-system identifiers
//!
//! Everything in here is total: any string in, a structured verdict
//! out, never a panic. The validation rules sit on top of these and
//! turn verdicts into issues.

pub mod project_key;
pub mod quote_number;
pub mod reference;
pub mod title;

pub use project_key::{generate_project_key, project_key_for_title};
pub use quote_number::{check_quote_number, QuoteNumberCheck, QuoteNumberProblem};
pub use reference::extract_deal_id;
pub use title::{parse_title, ParsedTitle, TitleProblem};
