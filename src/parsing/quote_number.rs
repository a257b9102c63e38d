//! Accepted-quote number format validation
//!
//! Quote numbers follow `PROJECTCODE-QU<digits>-<version>[-vN]`, e.g.
//! `NY2594-QU22554-1` or `NY2450-QU19757-1-v2`. Violations are
//! diagnosed into specific sub-reasons so each report line can carry a
//! tailored fix.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured pieces of a well-formed quote number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteNumberParts {
    pub project_code: String,
    /// Digits after the `QU` marker.
    pub sequence: String,
    pub version: String,
    /// The `-vN` revision, when present.
    pub revision: Option<u32>,
}

/// Why a quote number failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteNumberProblem {
    /// Just `QU<digits>`, nothing else.
    BareQuoteNumber,
    /// Starts with the `QU` marker; the project code prefix is absent.
    MissingProjectPrefix,
    /// Project code present but the second segment has no `QU` marker.
    MissingQuMarker,
    /// No dash anywhere in the number.
    MissingSeparator,
    /// `CODE-QU<digits>` with no version segment.
    MissingVersion,
    /// Everything up to the version is fine; the tail is not `-vN`.
    MalformedVersionSuffix { suffix: String },
    /// None of the known failure shapes.
    Unrecognized,
}

impl QuoteNumberProblem {
    pub fn describe(&self) -> String {
        match self {
            QuoteNumberProblem::BareQuoteNumber => {
                "bare quote number with no project code or version".to_string()
            }
            QuoteNumberProblem::MissingProjectPrefix => {
                "missing the project code prefix".to_string()
            }
            QuoteNumberProblem::MissingQuMarker => {
                "missing the 'QU' marker before the quote sequence".to_string()
            }
            QuoteNumberProblem::MissingSeparator => {
                "no dash separates the project code from the quote number".to_string()
            }
            QuoteNumberProblem::MissingVersion => "missing the version segment".to_string(),
            QuoteNumberProblem::MalformedVersionSuffix { suffix } => {
                format!("'-{suffix}' is not a valid revision suffix")
            }
            QuoteNumberProblem::Unrecognized => {
                "does not follow PROJECTCODE-QU<digits>-<version>".to_string()
            }
        }
    }

    /// A concrete rename suggestion for this number.
    pub fn suggested_fix(&self, number: &str) -> String {
        match self {
            QuoteNumberProblem::BareQuoteNumber => {
                format!("Rename to PROJECTCODE-{number}-1, e.g. NY2594-{number}-1")
            }
            QuoteNumberProblem::MissingProjectPrefix => {
                format!("Prefix the project code, e.g. NY2594-{number}")
            }
            QuoteNumberProblem::MissingQuMarker => {
                "Insert QU before the quote sequence, e.g. NY2594-QU22554-1".to_string()
            }
            QuoteNumberProblem::MissingSeparator => {
                "Separate the project code and quote number with a dash".to_string()
            }
            QuoteNumberProblem::MissingVersion => format!("Append the version, e.g. {number}-1"),
            QuoteNumberProblem::MalformedVersionSuffix { .. } => {
                "Use -v<N> for revisions, e.g. NY2450-QU19757-1-v2".to_string()
            }
            QuoteNumberProblem::Unrecognized => {
                "Rename to PROJECTCODE-QU<digits>-<version>, e.g. NY2594-QU22554-1".to_string()
            }
        }
    }
}

impl fmt::Display for QuoteNumberProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Verdict on one quote number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteNumberCheck {
    Valid(QuoteNumberParts),
    Invalid(QuoteNumberProblem),
}

impl QuoteNumberCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, QuoteNumberCheck::Valid(_))
    }
}

/// Validates a quote number against the required format.
///
/// The `QU` marker and `v` revision prefix are matched
/// case-insensitively since the numbers are hand-entered on the CRM
/// side.
pub fn check_quote_number(number: &str) -> QuoteNumberCheck {
    let trimmed = number.trim();

    let full = Regex::new(r"(?i)^([A-Za-z]+\d+)-QU(\d+)-(\d+)(?:-v(\d+))?$").unwrap();
    if let Some(caps) = full.captures(trimmed) {
        let revision = caps.get(4).and_then(|m| m.as_str().parse::<u32>().ok());
        return QuoteNumberCheck::Valid(QuoteNumberParts {
            project_code: caps[1].to_string(),
            sequence: caps[2].to_string(),
            version: caps[3].to_string(),
            revision,
        });
    }

    QuoteNumberCheck::Invalid(diagnose(trimmed))
}

fn diagnose(number: &str) -> QuoteNumberProblem {
    let bare = Regex::new(r"(?i)^QU\d+$").unwrap();
    if bare.is_match(number) {
        return QuoteNumberProblem::BareQuoteNumber;
    }
    let qu_prefixed = Regex::new(r"(?i)^QU\d+").unwrap();
    if qu_prefixed.is_match(number) {
        return QuoteNumberProblem::MissingProjectPrefix;
    }

    if !number.contains('-') {
        return QuoteNumberProblem::MissingSeparator;
    }

    let code = Regex::new(r"^[A-Za-z]+\d+$").unwrap();
    let qu_segment = Regex::new(r"(?i)^QU\d+$").unwrap();
    let digits = Regex::new(r"^\d+$").unwrap();
    let revision = Regex::new(r"(?i)^v\d+$").unwrap();

    let segments: Vec<&str> = number.split('-').collect();
    if !code.is_match(segments[0]) {
        return QuoteNumberProblem::Unrecognized;
    }

    match segments.get(1) {
        Some(second) if qu_segment.is_match(second) => match segments.get(2) {
            None => QuoteNumberProblem::MissingVersion,
            Some(third) if revision.is_match(third) => QuoteNumberProblem::MissingVersion,
            Some(third) if digits.is_match(third) => QuoteNumberProblem::MalformedVersionSuffix {
                suffix: segments[3..].join("-"),
            },
            Some(_) => QuoteNumberProblem::MalformedVersionSuffix {
                suffix: segments[2..].join("-"),
            },
        },
        Some(second) if digits.is_match(second) => QuoteNumberProblem::MissingQuMarker,
        _ => QuoteNumberProblem::Unrecognized,
    }
}
