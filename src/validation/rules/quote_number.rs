//! Accepted-quote number format rule
//!
//! Accepted quotes feed downstream project and invoice matching by
//! number, so each one must carry a well-formed
//! `PROJECTCODE-QU<digits>-<version>` number. Violations are diagnosed
//! into specific sub-reasons, each with its own suggested rename.

use crate::models::{IssueCode, QuoteStatus, ValidationIssue};
use crate::parsing::{check_quote_number, QuoteNumberCheck};
use crate::validation::ValidationContext;

pub fn check_accepted_quote_numbers(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for quote in ctx.quotes {
        if quote.status != QuoteStatus::Accepted {
            continue;
        }

        let number = match quote.quote_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => number,
            _ => {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::AcceptedQuoteNoNumber,
                        format!("accepted quote {} has no quote number", quote.quote_id),
                    )
                    .with_quote(quote.quote_id)
                    .with_suggested_fix("Assign a number in the form PROJECTCODE-QU0001-1"),
                );
                continue;
            }
        };

        match check_quote_number(number) {
            QuoteNumberCheck::Valid(parts) => {
                if !ctx.tenant.valid_project_prefixes.is_empty()
                    && !has_known_prefix(&parts.project_code, &ctx.tenant.valid_project_prefixes)
                {
                    issues.push(
                        ValidationIssue::warning(
                            IssueCode::AcceptedQuoteInvalidFormat,
                            format!(
                                "quote number '{}' has project code '{}' with an unrecognized prefix",
                                number, parts.project_code
                            ),
                        )
                        .with_quote(quote.quote_id),
                    );
                }
            }
            QuoteNumberCheck::Invalid(problem) => {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::AcceptedQuoteInvalidFormat,
                        format!("quote number '{}': {}", number, problem.describe()),
                    )
                    .with_quote(quote.quote_id)
                    .with_suggested_fix(problem.suggested_fix(number)),
                );
            }
        }
    }

    issues
}

fn has_known_prefix(code: &str, prefixes: &[String]) -> bool {
    let upper = code.to_ascii_uppercase();
    prefixes
        .iter()
        .any(|prefix| upper.starts_with(&prefix.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::tenant;
    use crate::models::Severity;
    use crate::validation::test_support::quote;
    use crate::validation::ProductLookup;

    fn run(quotes: &[crate::models::Quote]) -> Vec<ValidationIssue> {
        let tenant = tenant();
        let ctx = ValidationContext::new(&tenant, &[], quotes, &[], ProductLookup::empty());
        check_accepted_quote_numbers(&ctx)
    }

    #[test]
    fn test_well_formed_numbers_pass() {
        let quotes = vec![
            quote("NY2594-QU0474-1"),
            quote("ED1234-QU0001-2-v3"),
            quote("ab12-qu99-1"),
        ];
        assert!(run(&quotes).is_empty());
    }

    #[test]
    fn test_missing_number_is_error() {
        let mut unnumbered = quote("x");
        unnumbered.quote_number = None;
        let mut blank = quote("y");
        blank.quote_number = Some("   ".to_string());
        let issues = run(&[unnumbered, blank]);
        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|i| i.code == IssueCode::AcceptedQuoteNoNumber));
    }

    #[test]
    fn test_each_malformation_gets_distinct_fix() {
        let quotes = vec![
            quote("QU04744"),
            quote("QU0474-1"),
            quote("NY2594-QU0474"),
            quote("NY2594-QU0474-1-final"),
        ];
        let issues = run(&quotes);
        assert_eq!(issues.len(), 4);
        assert!(issues
            .iter()
            .all(|i| i.code == IssueCode::AcceptedQuoteInvalidFormat));

        // Diagnoses differ per malformation, as do the suggested fixes.
        let fixes: Vec<_> = issues
            .iter()
            .map(|i| i.suggested_fix.as_deref().unwrap())
            .collect();
        for (idx, fix) in fixes.iter().enumerate() {
            for other in &fixes[idx + 1..] {
                assert_ne!(fix, other);
            }
        }
    }

    #[test]
    fn test_unknown_prefix_is_warning_when_policy_set() {
        let mut tenant = tenant();
        tenant.valid_project_prefixes = vec!["NY".to_string(), "ED".to_string()];
        let quotes = vec![quote("ZZ999-QU0001-1"), quote("NY2594-QU0474-1")];
        let ctx = ValidationContext::new(&tenant, &[], &quotes, &[], ProductLookup::empty());
        let issues = check_accepted_quote_numbers(&ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("ZZ999"));
    }

    #[test]
    fn test_non_accepted_quotes_skipped() {
        let mut draft = quote("QU0474");
        draft.status = QuoteStatus::Draft;
        assert!(run(&[draft]).is_empty());
    }
}
