//! Accounting-system projects, matched to deals via derived name keys

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Project lifecycle status as the accounting system spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "INPROGRESS")]
    InProgress,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "INPROGRESS",
            ProjectStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cost/time-tracking project.
///
/// The remote system stores no foreign key back to deals; the join runs
/// entirely over keys derived from `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
}
