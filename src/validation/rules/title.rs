//! Won-deal title format rule
//!
//! Titles drive project matching, so a malformed title on a won deal
//! degrades everything downstream. Severity is tenant policy; some
//! tenants treat this as a hard error, others as a warning.

use crate::models::{DealStatus, IssueCode, ValidationIssue};
use crate::parsing::{parse_title, TitleProblem};
use crate::validation::ValidationContext;

pub fn check_title_format(ctx: &ValidationContext<'_>) -> Vec<ValidationIssue> {
    let severity = ctx.tenant.title_issue_severity;
    let mut issues = Vec::new();

    for deal in ctx.in_scope_deals() {
        if deal.status != DealStatus::Won {
            continue;
        }

        let parsed = parse_title(&deal.title);
        if let Some(problem) = &parsed.problem {
            let code = match problem {
                TitleProblem::MissingVessel => IssueCode::MissingVessel,
                TitleProblem::NumericVessel { .. } => IssueCode::InvalidVesselName,
                _ => IssueCode::InvalidTitleFormat,
            };
            issues.push(
                ValidationIssue::new(
                    severity,
                    code,
                    format!("title '{}': {}", deal.title, problem.describe()),
                )
                .with_deal(deal.id)
                .with_field("title")
                .with_suggested_fix("Use the form 'PROJECTCODE - Vessel Name'"),
            );
            continue;
        }

        // Prefix policy only applies to titles that parsed at all.
        if !ctx.tenant.valid_project_prefixes.is_empty() {
            if let Some(code) = parsed.project_code.as_deref() {
                if !has_known_prefix(code, &ctx.tenant.valid_project_prefixes) {
                    issues.push(
                        ValidationIssue::new(
                            severity,
                            IssueCode::InvalidTitleFormat,
                            format!(
                                "project code '{}' does not start with a recognized prefix ({})",
                                code,
                                ctx.tenant.valid_project_prefixes.join(", ")
                            ),
                        )
                        .with_deal(deal.id)
                        .with_field("title"),
                    );
                }
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
    use crate::models::{DealStatus, Severity};
    use crate::validation::test_support::deal;
    use crate::validation::ProductLookup;

    fn run(deals: &[crate::models::Deal]) -> Vec<ValidationIssue> {
        let tenant = tenant();
        let ctx = ValidationContext::new(&tenant, deals, &[], &[], ProductLookup::empty());
        check_title_format(&ctx)
    }

    #[test]
    fn test_clean_titles_pass() {
        let deals = vec![deal(1, 1)];
        assert!(run(&deals).is_empty());
    }

    #[test]
    fn test_problem_maps_to_specific_codes() {
        let mut missing_vessel = deal(1, 1);
        missing_vessel.title = "ED1234".to_string();
        let mut numeric_vessel = deal(2, 1);
        numeric_vessel.title = "ED1234 - 12345".to_string();
        let mut quote_number = deal(3, 1);
        quote_number.title = "QU04744".to_string();

        let issues = run(&[missing_vessel, numeric_vessel, quote_number]);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].code, IssueCode::MissingVessel);
        assert_eq!(issues[1].code, IssueCode::InvalidVesselName);
        assert_eq!(issues[2].code, IssueCode::InvalidTitleFormat);
        assert!(issues.iter().all(|i| i.severity == Severity::Error));
    }

    #[test]
    fn test_open_and_lost_deals_not_checked() {
        let mut open = deal(1, 1);
        open.status = DealStatus::Open;
        open.title = "garbage".to_string();
        let mut lost = deal(2, 1);
        lost.status = DealStatus::Lost;
        lost.title = "garbage".to_string();
        assert!(run(&[open, lost]).is_empty());
    }

    #[test]
    fn test_severity_follows_tenant_policy() {
        let mut tenant = tenant();
        tenant.title_issue_severity = Severity::Warning;
        let mut bad = deal(1, 1);
        bad.title = "no project code here".to_string();
        let deals = vec![bad];
        let ctx = ValidationContext::new(&tenant, &deals, &[], &[], ProductLookup::empty());
        let issues = check_title_format(&ctx);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_prefix_flagged_when_policy_set() {
        let mut tenant = tenant();
        tenant.valid_project_prefixes = vec!["ED".to_string(), "NY".to_string()];
        let mut off_prefix = deal(1, 1);
        off_prefix.title = "ZZ999 - Vessel".to_string();
        let deals = vec![off_prefix, deal(2, 1)];
        let ctx = ValidationContext::new(&tenant, &deals, &[], &[], ProductLookup::empty());
        let issues = check_title_format(&ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].deal_id, Some(1));
        assert!(issues[0].message.contains("recognized prefix"));
    }
}
