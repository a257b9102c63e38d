//! Tenant registry YAML configuration
//!
//! Tenant policy is data, not code. Pipeline sets, custom field
//! mappings, stage gates and per-rule severities all load from one YAML
//! registry, so adding a tenant means adding a registry entry.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::models::deal::{Deal, ResolvedDealFields};
use crate::models::issue::Severity;

/// Logical field names a tenant may map and require.
pub const LOGICAL_FIELDS: [&str; 5] = [
    "xero_quote_id",
    "xero_quote_number",
    "project_code",
    "vessel_name",
    "department",
];

/// Root registry structure, one entry per tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantRegistry {
    pub version: String,
    pub tenants: Vec<TenantConfig>,
}

/// Per-tenant validation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    #[serde(default)]
    pub display_name: Option<String>,

    /// Pipelines to fetch and validate.
    pub pipeline_ids: Vec<i64>,

    /// CRM custom-field hashes for the logical fields the rules read.
    #[serde(default)]
    pub custom_fields: CustomFieldMap,

    /// Stage that gates the invoice checks; absent disables them.
    #[serde(default)]
    pub invoice_stage_id: Option<i64>,

    /// Known project-code letter prefixes (e.g. `NY`, `ED`). Empty
    /// means any prefix is accepted.
    #[serde(default)]
    pub valid_project_prefixes: Vec<String>,

    /// Pipeline that must never hold won deals.
    #[serde(default)]
    pub unqualified_pipeline_id: Option<i64>,

    /// Pipelines that must hold only closed deals.
    #[serde(default)]
    pub closed_only_pipeline_ids: Vec<i64>,

    /// Pipelines skipped by the placement rule entirely.
    #[serde(default)]
    pub ignored_pipeline_ids: Vec<i64>,

    /// Pipelines counting as "work in progress" for accepted-quote
    /// placement checks. Empty disables that check.
    #[serde(default)]
    pub in_progress_pipeline_ids: Vec<i64>,

    /// Severity of title-format findings for this tenant.
    #[serde(default = "default_title_severity")]
    pub title_issue_severity: Severity,

    /// Fields that must be non-empty on won deals, with per-field
    /// severity. Empty list disables the rule.
    #[serde(default)]
    pub required_fields: Vec<RequiredField>,
}

fn default_title_severity() -> Severity {
    Severity::Error
}

/// One required-field policy entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredField {
    /// Logical field name, one of [`LOGICAL_FIELDS`].
    pub field: String,
    #[serde(default = "default_required_severity")]
    pub severity: Severity,
}

fn default_required_severity() -> Severity {
    Severity::Error
}

/// CRM custom-field hashes keyed by logical name.
///
/// The CRM exposes custom fields under opaque 40-char keys; this map is
/// resolved once at configuration load and every rule reads deals
/// through it rather than indexing the raw field map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomFieldMap {
    #[serde(default)]
    pub xero_quote_id: Option<String>,
    #[serde(default)]
    pub xero_quote_number: Option<String>,
    #[serde(default)]
    pub project_code: Option<String>,
    #[serde(default)]
    pub vessel_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl CustomFieldMap {
    /// CRM field hash for a logical field name.
    pub fn key_for(&self, logical_name: &str) -> Option<&str> {
        match logical_name {
            "xero_quote_id" => self.xero_quote_id.as_deref(),
            "xero_quote_number" => self.xero_quote_number.as_deref(),
            "project_code" => self.project_code.as_deref(),
            "vessel_name" => self.vessel_name.as_deref(),
            "department" => self.department.as_deref(),
            _ => None,
        }
    }

    /// Applies the mapping to one deal.
    pub fn resolve(&self, deal: &Deal) -> ResolvedDealFields {
        let read = |key: &Option<String>| key.as_deref().and_then(|k| deal.custom_text(k));
        ResolvedDealFields {
            xero_quote_id: read(&self.xero_quote_id),
            xero_quote_number: read(&self.xero_quote_number),
            project_code: read(&self.project_code),
            vessel_name: read(&self.vessel_name),
            department: read(&self.department),
        }
    }
}

impl TenantRegistry {
    /// Load the registry from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load the registry from a YAML string (for testing).
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let registry: TenantRegistry = serde_yaml::from_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn get(&self, tenant_id: &str) -> ConfigResult<&TenantConfig> {
        self.tenants
            .iter()
            .find(|t| t.tenant_id == tenant_id)
            .ok_or_else(|| ConfigError::UnknownTenant {
                tenant_id: tenant_id.to_string(),
            })
    }

    pub fn tenant_ids(&self) -> Vec<&str> {
        self.tenants.iter().map(|t| t.tenant_id.as_str()).collect()
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if !seen.insert(tenant.tenant_id.as_str()) {
                return Err(ConfigError::DuplicateTenant {
                    tenant_id: tenant.tenant_id.clone(),
                });
            }
            tenant.validate()?;
        }
        Ok(())
    }
}

impl TenantConfig {
    pub fn is_ignored_pipeline(&self, pipeline_id: i64) -> bool {
        self.ignored_pipeline_ids.contains(&pipeline_id)
    }

    pub fn is_in_progress_pipeline(&self, pipeline_id: i64) -> bool {
        self.in_progress_pipeline_ids.contains(&pipeline_id)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.pipeline_ids.is_empty() {
            return Err(ConfigError::InvalidTenant {
                tenant_id: self.tenant_id.clone(),
                reason: "pipeline_ids must not be empty".to_string(),
            });
        }
        for required in &self.required_fields {
            if !LOGICAL_FIELDS.contains(&required.field.as_str()) {
                return Err(ConfigError::InvalidTenant {
                    tenant_id: self.tenant_id.clone(),
                    reason: format!("unknown required field '{}'", required.field),
                });
            }
            if self.custom_fields.key_for(&required.field).is_none() {
                return Err(ConfigError::MissingFieldMapping {
                    tenant_id: self.tenant_id.clone(),
                    field: required.field.clone(),
                });
            }
        }
        // Invoice checks cannot run without a way to find the quote.
        if self.invoice_stage_id.is_some()
            && self.custom_fields.xero_quote_id.is_none()
            && self.custom_fields.xero_quote_number.is_none()
        {
            return Err(ConfigError::InvalidTenant {
                tenant_id: self.tenant_id.clone(),
                reason: "invoice_stage_id requires a quote id or number field mapping".to_string(),
            });
        }
        Ok(())
    }
}
