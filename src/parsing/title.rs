//! Deal title parsing
//!
//! Titles encode the primary cross-system join key: a project code
//! followed by a vessel name. Two code families exist:
//!
//! - **ED codes** (`ED` + digits): the title may carry middle segments
//!   between code and vessel, joined by dashes. The last segment is the
//!   vessel name, e.g. `ED2550007 - Some Client - Lady Jane`.
//! - **Standard codes** (letters + digits, e.g. `NY2594`): exactly
//!   `code-vessel` or `code - vessel`, nothing in between.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Why a title failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TitleProblem {
    /// Empty or whitespace-only title.
    Empty,
    /// Title starts with a quote number (`QU` + digits); someone pasted
    /// the quote number where the project title belongs.
    QuoteNumberPrefix,
    /// A project code is present but no dash separates it from a
    /// vessel name.
    MissingSeparator,
    /// A project code is present but nothing follows it.
    MissingVessel,
    /// The vessel segment is purely numeric.
    NumericVessel { vessel: String },
    /// No recognizable project code at the start.
    Unrecognized,
}

impl TitleProblem {
    pub fn describe(&self) -> String {
        match self {
            TitleProblem::Empty => "title is empty".to_string(),
            TitleProblem::QuoteNumberPrefix => {
                "title begins with a quote number instead of a project code".to_string()
            }
            TitleProblem::MissingSeparator => {
                "no dash separates the project code from the vessel name".to_string()
            }
            TitleProblem::MissingVessel => "no vessel name after the project code".to_string(),
            TitleProblem::NumericVessel { vessel } => {
                format!("vessel name '{vessel}' is purely numeric")
            }
            TitleProblem::Unrecognized => {
                "title does not start with a project code (letters + digits)".to_string()
            }
        }
    }
}

impl fmt::Display for TitleProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Outcome of parsing one deal title. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// The title exactly as the CRM stored it.
    pub raw: String,
    pub project_code: Option<String>,
    pub vessel_name: Option<String>,
    pub is_ed_format: bool,
    pub problem: Option<TitleProblem>,
}

impl ParsedTitle {
    pub fn is_invalid(&self) -> bool {
        self.problem.is_some()
    }

    pub fn invalid_reason(&self) -> Option<String> {
        self.problem.as_ref().map(TitleProblem::describe)
    }

    /// Canonical `code-vessel` spelling for display and fix text.
    pub fn canonical(&self) -> Option<String> {
        match (&self.project_code, &self.vessel_name) {
            (Some(code), Some(vessel)) => Some(format!("{code}-{vessel}")),
            _ => None,
        }
    }

    fn invalid(raw: &str, is_ed_format: bool, problem: TitleProblem) -> Self {
        Self {
            raw: raw.to_string(),
            project_code: None,
            vessel_name: None,
            is_ed_format,
            problem: Some(problem),
        }
    }
}

/// Parses a deal title into project code and vessel name.
///
/// Total function: any input produces a `ParsedTitle`, invalid inputs
/// carry a [`TitleProblem`] instead of panicking. Trailing duplicate
/// markers the CRM appends (`" (2)"`, `" (copy)"`) are stripped first.
pub fn parse_title(title: &str) -> ParsedTitle {
    let cleaned = strip_duplicate_suffixes(title);
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return ParsedTitle::invalid(title, false, TitleProblem::Empty);
    }

    let quote_prefix = Regex::new(r"(?i)^QU\d+").unwrap();
    if quote_prefix.is_match(cleaned) {
        return ParsedTitle::invalid(title, false, TitleProblem::QuoteNumberPrefix);
    }

    let ed_code = Regex::new(r"(?i)^(ED\d+)(.*)$").unwrap();
    if let Some(caps) = ed_code.captures(cleaned) {
        let code = caps[1].to_string();
        let rest = caps[2].trim();
        return parse_ed_remainder(title, code, rest);
    }

    let standard = Regex::new(r"^([A-Za-z]+\d+)\s*-\s*(.+)$").unwrap();
    if let Some(caps) = standard.captures(cleaned) {
        let code = caps[1].to_string();
        let vessel = caps[2].trim();
        if vessel.is_empty() {
            return ParsedTitle::invalid(title, false, TitleProblem::MissingVessel);
        }
        if is_purely_numeric(vessel) {
            return ParsedTitle::invalid(
                title,
                false,
                TitleProblem::NumericVessel {
                    vessel: vessel.to_string(),
                },
            );
        }
        return ParsedTitle {
            raw: title.to_string(),
            project_code: Some(code),
            vessel_name: Some(vessel.to_string()),
            is_ed_format: false,
            problem: None,
        };
    }

    // A lone code, or a code followed by text without any dash.
    let bare_code = Regex::new(r"^[A-Za-z]+\d+$").unwrap();
    if bare_code.is_match(cleaned) {
        return ParsedTitle::invalid(title, false, TitleProblem::MissingVessel);
    }
    let undashed = Regex::new(r"^[A-Za-z]+\d+\s+\S").unwrap();
    if undashed.is_match(cleaned) {
        return ParsedTitle::invalid(title, false, TitleProblem::MissingSeparator);
    }

    ParsedTitle::invalid(title, false, TitleProblem::Unrecognized)
}

/// ED titles allow middle segments; the last dash-separated segment is
/// the vessel name and everything in between is discarded.
fn parse_ed_remainder(raw: &str, code: String, rest: &str) -> ParsedTitle {
    if rest.is_empty() {
        return ParsedTitle::invalid(raw, true, TitleProblem::MissingVessel);
    }
    if !rest.contains('-') {
        return ParsedTitle::invalid(raw, true, TitleProblem::MissingSeparator);
    }

    let vessel = rest.rsplit('-').next().unwrap_or("").trim();
    if vessel.is_empty() {
        return ParsedTitle::invalid(raw, true, TitleProblem::MissingVessel);
    }
    if is_purely_numeric(vessel) {
        return ParsedTitle::invalid(
            raw,
            true,
            TitleProblem::NumericVessel {
                vessel: vessel.to_string(),
            },
        );
    }

    ParsedTitle {
        raw: raw.to_string(),
        project_code: Some(code),
        vessel_name: Some(vessel.to_string()),
        is_ed_format: true,
        problem: None,
    }
}

/// Strips the CRM's duplicate markers, repeatedly: `"X (2)"`,
/// `"X (copy)"`, `"X (copy) (3)"` all reduce to `"X"`.
fn strip_duplicate_suffixes(title: &str) -> String {
    let suffix = Regex::new(r"(?i)\s*\((?:\d+|copy)\)\s*$").unwrap();
    let mut current = title.to_string();
    loop {
        let stripped = suffix.replace(&current, "").to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

fn is_purely_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_standard_title_both_spacings() {
        for title in ["NY2594-Lady Jane", "NY2594 - Lady Jane"] {
            let parsed = parse_title(title);
            assert_eq!(parsed.project_code.as_deref(), Some("NY2594"), "{title}");
            assert_eq!(parsed.vessel_name.as_deref(), Some("Lady Jane"), "{title}");
            assert!(!parsed.is_ed_format);
            assert!(parsed.problem.is_none());
        }
    }

    #[test]
    fn test_canonical_is_unspaced() {
        let parsed = parse_title("MES2024001 - Northern Star");
        assert_eq!(parsed.canonical().as_deref(), Some("MES2024001-Northern Star"));
    }

    #[test]
    fn test_ed_title_discards_middle_segments() {
        let parsed = parse_title("ED2550007 - Harbour Services Ltd - Lady Jane");
        assert!(parsed.is_ed_format);
        assert_eq!(parsed.project_code.as_deref(), Some("ED2550007"));
        assert_eq!(parsed.vessel_name.as_deref(), Some("Lady Jane"));
    }

    #[test]
    fn test_ed_title_single_segment() {
        let parsed = parse_title("ED123456-Vessel");
        assert!(parsed.is_ed_format);
        assert_eq!(parsed.vessel_name.as_deref(), Some("Vessel"));
    }

    #[test]
    fn test_ed_title_needs_dash() {
        let parsed = parse_title("ED123456 Vessel");
        assert_eq!(parsed.problem, Some(TitleProblem::MissingSeparator));
    }

    #[test]
    fn test_quote_number_prefix_rejected() {
        for title in ["QU22554", "qu22554 - Lady Jane", "QU0349-v2"] {
            let parsed = parse_title(title);
            assert_eq!(
                parsed.problem,
                Some(TitleProblem::QuoteNumberPrefix),
                "{title}"
            );
            assert_eq!(parsed.raw, title);
        }
    }

    #[test]
    fn test_numeric_vessel_rejected_in_both_families() {
        let parsed = parse_title("ED123456 - Client - 2594");
        assert_eq!(
            parsed.problem,
            Some(TitleProblem::NumericVessel {
                vessel: "2594".to_string()
            })
        );

        let parsed = parse_title("NY2594 - 12345");
        assert!(matches!(parsed.problem, Some(TitleProblem::NumericVessel { .. })));
    }

    #[test]
    fn test_duplicate_suffixes_stripped() {
        let parsed = parse_title("NY2594 - Lady Jane (2)");
        assert!(parsed.problem.is_none());
        assert_eq!(parsed.vessel_name.as_deref(), Some("Lady Jane"));

        let parsed = parse_title("NY2594 - Lady Jane (Copy)");
        assert_eq!(parsed.vessel_name.as_deref(), Some("Lady Jane"));

        let parsed = parse_title("NY2594 - Lady Jane (copy) (3)");
        assert_eq!(parsed.vessel_name.as_deref(), Some("Lady Jane"));
        // raw keeps the original spelling
        assert_eq!(parsed.raw, "NY2594 - Lady Jane (copy) (3)");
    }

    #[test]
    fn test_standard_vessel_keeps_inner_dashes() {
        let parsed = parse_title("NY2594 - Mary-Ann");
        assert_eq!(parsed.vessel_name.as_deref(), Some("Mary-Ann"));
    }

    #[test]
    fn test_edge_code_is_not_ed_family() {
        // EDGE2024 starts with "ED" but the third char is not a digit
        let parsed = parse_title("EDGE2024 - Vessel");
        assert!(!parsed.is_ed_format);
        assert_eq!(parsed.project_code.as_deref(), Some("EDGE2024"));
    }

    #[test]
    fn test_invalid_shapes() {
        assert_eq!(parse_title("").problem, Some(TitleProblem::Empty));
        assert_eq!(parse_title("   ").problem, Some(TitleProblem::Empty));
        assert_eq!(parse_title("NY2594").problem, Some(TitleProblem::MissingVessel));
        assert_eq!(
            parse_title("NY2594 Lady Jane").problem,
            Some(TitleProblem::MissingSeparator)
        );
        assert_eq!(
            parse_title("Some random opportunity").problem,
            Some(TitleProblem::Unrecognized)
        );
        assert_eq!(
            parse_title("2594NY - Vessel").problem,
            Some(TitleProblem::Unrecognized)
        );
    }

    proptest! {
        /// Any string parses without panicking, and a parse with no
        /// problem always yields non-empty code and vessel.
        #[test]
        fn parse_title_is_total(title in "\\PC*") {
            let parsed = parse_title(&title);
            prop_assert_eq!(parsed.raw.as_str(), title.as_str());
            if parsed.problem.is_none() {
                prop_assert!(parsed.project_code.as_deref().is_some_and(|c| !c.is_empty()));
                prop_assert!(parsed.vessel_name.as_deref().is_some_and(|v| !v.is_empty()));
            }
        }
    }
}
