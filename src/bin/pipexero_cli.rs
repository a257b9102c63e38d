//! pipexero command line interface
//!
//! Runs the validation workflow for one tenant against the live APIs
//! and prints the findings, plus offline debug helpers for the parsers
//! and the quote status graph.
//!
//! # Usage
//!
//! ```bash
//! # Full validation run (needs PIPEDRIVE_API_TOKEN, XERO_ACCESS_TOKEN,
//! # XERO_TENANT_ID; a .env file is honored)
//! pipexero_cli validate --registry tenants.yaml --tenant tenant-a
//!
//! # Machine-readable report
//! pipexero_cli validate -t tenant-a -o json
//!
//! # Offline helpers
//! pipexero_cli check-title "NY2594 - Lady Jane"
//! pipexero_cli project-key "ED2550007 - Harbour Services Ltd - Lady Jane"
//! pipexero_cli transition-path DRAFT ACCEPTED
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use pipexero::api::{NullProgress, ProgressSink, QuoteApi};
use pipexero::config::TenantRegistry;
use pipexero::fix::transition_path;
use pipexero::models::{
    QuoteStatus, Severity, StepRecord, StepStatus, ValidationIssue, ValidationResult,
    ValidationSession,
};
use pipexero::parsing::{parse_title, project_key_for_title};
use pipexero::pipedrive::PipedriveClient;
use pipexero::rate_limit::{RateGate, RateLimits};
use pipexero::xero::{StaticTokenProvider, XeroClient};

#[derive(Parser)]
#[command(name = "pipexero_cli")]
#[command(version)]
#[command(about = "Cross-system validation of Pipedrive deals against Xero quotes and projects")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Suppress per-step progress output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full validation workflow for one tenant
    Validate {
        /// Tenant registry YAML file
        #[arg(long, default_value = "tenants.yaml")]
        registry: PathBuf,

        /// Tenant id from the registry
        #[arg(long, short)]
        tenant: String,

        /// Lowest severity to report: info, warning, error
        #[arg(long, default_value = "info")]
        min_severity: String,
    },

    /// Parse a deal title and show how it was read
    CheckTitle {
        /// Title exactly as stored in the CRM
        title: String,
    },

    /// Derive the join key for a deal title or project name
    ProjectKey {
        /// Deal title or project name
        name: String,
    },

    /// Show the hop sequence between two quote statuses
    TransitionPath {
        /// Starting status, e.g. DRAFT
        from: String,

        /// Target status, e.g. ACCEPTED
        to: String,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    // A .env file is a convenience; real environment variables win.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }
    init_tracing(cli.quiet);

    let result = match cli.command {
        Commands::Validate {
            registry,
            tenant,
            min_severity,
        } => cmd_validate(registry, &tenant, &min_severity, cli.format, cli.quiet).await,
        Commands::CheckTitle { title } => cmd_check_title(&title, cli.format),
        Commands::ProjectKey { name } => cmd_project_key(&name, cli.format),
        Commands::TransitionPath { from, to } => cmd_transition_path(&from, &to, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!(r#"{{"error": "{}"}}"#, e.replace('"', "\\\""));
            } else {
                eprintln!("{}: {}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "pipexero=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Prints fetch/rule steps to stderr as the orchestrator reports them,
/// keeping stdout clean for the report itself.
struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn on_step(&self, step: &StepRecord) {
        match step.status {
            StepStatus::Running => eprintln!("{} {}", "..".cyan(), step.name),
            StepStatus::Completed => eprintln!(
                "{} {} ({})",
                "OK".green().bold(),
                step.name,
                step.summary.as_deref().unwrap_or("done")
            ),
            StepStatus::Failed => eprintln!(
                "{} {}: {}",
                "FAIL".red().bold(),
                step.name,
                step.error.as_deref().unwrap_or("unknown error")
            ),
            StepStatus::Pending => {}
        }
    }
}

async fn cmd_validate(
    registry: PathBuf,
    tenant_id: &str,
    min_severity: &str,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let min_severity = parse_severity(min_severity)?;
    let registry = TenantRegistry::load(&registry).map_err(|e| e.to_string())?;
    let tenant = registry.get(tenant_id).map_err(|e| e.to_string())?.clone();

    let gate = Arc::new(RateGate::new(RateLimits::default()));
    let pipedrive = Arc::new(PipedriveClient::from_env().map_err(|e| format!("{e:#}"))?);
    let tokens = Arc::new(StaticTokenProvider::from_env().map_err(|e| format!("{e:#}"))?);
    let xero =
        Arc::new(XeroClient::new(tokens, Arc::clone(&gate)).map_err(|e| format!("{e:#}"))?);

    let progress: Arc<dyn ProgressSink> = if quiet || format == OutputFormat::Json {
        Arc::new(NullProgress)
    } else {
        Arc::new(TerminalProgress)
    };

    let session = pipexero::execute_validation_workflow(
        tenant,
        pipedrive,
        Arc::clone(&xero) as Arc<dyn QuoteApi>,
        xero,
        gate,
        progress,
    )
    .await
    .map_err(|e| e.to_string())?;

    let result = session
        .result
        .as_ref()
        .ok_or_else(|| "run completed without a result".to_string())?;

    match format {
        OutputFormat::Json => print_json_report(&session, result, min_severity)?,
        OutputFormat::Pretty => print_pretty_report(result, min_severity),
    }

    if result.summary.error_count > 0 {
        Err(format!(
            "{} error-severity finding(s)",
            result.summary.error_count
        ))
    } else {
        Ok(())
    }
}

fn print_json_report(
    session: &ValidationSession,
    result: &ValidationResult,
    min_severity: Severity,
) -> Result<(), String> {
    let issues: Vec<&ValidationIssue> = result
        .issues
        .iter()
        .filter(|i| i.severity >= min_severity)
        .collect();
    let output = serde_json::json!({
        "session_id": session.session_id,
        "tenant_id": result.tenant_id,
        "generated_at": result.generated_at,
        "summary": result.summary,
        "issues": issues,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output)
            .map_err(|e| format!("JSON serialization failed: {e}"))?
    );
    Ok(())
}

fn print_pretty_report(result: &ValidationResult, min_severity: Severity) {
    let summary = &result.summary;
    println!();
    println!(
        "{}",
        format!("Validation report for {}", result.tenant_id).bold()
    );
    println!(
        "  {} deals, {} quotes, {} projects",
        summary.total_deals, summary.total_quotes, summary.total_projects
    );
    println!(
        "  {} matched quotes, {} unmatched won deals, {} orphaned accepted quotes",
        summary.matched_quotes, summary.unmatched_deals, summary.orphaned_accepted_quotes
    );
    println!();

    let mut shown = 0;
    for issue in &result.issues {
        if issue.severity < min_severity {
            continue;
        }
        shown += 1;
        let tag = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".cyan(),
        };
        let mut target = String::new();
        if let Some(deal_id) = issue.deal_id {
            target.push_str(&format!(" deal {deal_id}"));
        }
        if let Some(quote_id) = issue.quote_id {
            target.push_str(&format!(" quote {quote_id}"));
        }
        println!("{} [{}]{}: {}", tag, issue.code, target, issue.message);
        if let Some(fix) = issue.suggested_fix.as_deref() {
            println!("    fix: {fix}");
        }
    }
    if shown == 0 {
        println!(
            "{}",
            "No findings at or above the requested severity.".green()
        );
    }
    println!();
    println!(
        "{} error(s), {} warning(s), {} info",
        summary.error_count, summary.warning_count, summary.info_count
    );
}

fn cmd_check_title(title: &str, format: OutputFormat) -> Result<(), String> {
    let parsed = parse_title(title);
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "raw": parsed.raw,
                "valid": !parsed.is_invalid(),
                "project_code": parsed.project_code,
                "vessel_name": parsed.vessel_name,
                "ed_format": parsed.is_ed_format,
                "problem": parsed.problem.as_ref().map(|p| p.describe()),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output)
                    .map_err(|e| format!("JSON serialization failed: {e}"))?
            );
        }
        OutputFormat::Pretty => {
            if let Some(problem) = &parsed.problem {
                println!("{} {}", "INVALID".red().bold(), problem.describe());
            } else {
                println!(
                    "{} project code '{}', vessel '{}'",
                    "OK".green().bold(),
                    parsed.project_code.as_deref().unwrap_or("-"),
                    parsed.vessel_name.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn cmd_project_key(name: &str, format: OutputFormat) -> Result<(), String> {
    let key = project_key_for_title(name);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "name": name, "project_key": key })
            );
        }
        OutputFormat::Pretty => {
            if key.is_empty() {
                println!("{} the name produced an empty key", "WARN".yellow().bold());
            } else {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn cmd_transition_path(from: &str, to: &str, format: OutputFormat) -> Result<(), String> {
    let from = QuoteStatus::from_str(from)?;
    let to = QuoteStatus::from_str(to)?;
    let path = transition_path(from, to).map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => {
            let hops: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
            println!(
                "{}",
                serde_json::json!({ "from": from.as_str(), "to": to.as_str(), "path": hops })
            );
        }
        OutputFormat::Pretty => {
            if path.is_empty() {
                println!("{} already {}", "OK".green().bold(), to);
            } else {
                let mut route = vec![from.as_str()];
                route.extend(path.iter().map(|s| s.as_str()));
                println!("{} {}", "OK".green().bold(), route.join(" -> "));
            }
        }
    }
    Ok(())
}

fn parse_severity(raw: &str) -> Result<Severity, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "info" => Ok(Severity::Info),
        "warning" => Ok(Severity::Warning),
        "error" => Ok(Severity::Error),
        other => Err(format!(
            "unknown severity '{other}', expected info, warning or error"
        )),
    }
}
