//! Result records and the diagnostics reported alongside them.

use serde::Serialize;
use std::fmt;

use crate::attributes::OrganizationAttributes;
use crate::classify::EntityClass;

/// One enriched and classified candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub searched_name: String,
    pub profile_url: String,
    pub org_name: String,
    pub org_reference_url: String,
    pub sector: String,
    pub location: String,
    #[serde(flatten)]
    pub attributes: OrganizationAttributes,
    pub classification: EntityClass,
}

/// Pipeline stage a diagnostic was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LocalLookup,
    Discovery,
    ProfileEnrichment,
    OrgEnrichmentPrimary,
    OrgEnrichmentFallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::LocalLookup => "local lookup",
            Stage::Discovery => "profile discovery",
            Stage::ProfileEnrichment => "profile enrichment",
            Stage::OrgEnrichmentPrimary => "organization enrichment (primary)",
            Stage::OrgEnrichmentFallback => "organization enrichment (fallback)",
        };
        f.write_str(s)
    }
}

/// A non-fatal problem reported alongside results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    /// Oracle output that could not be used, when there was any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: Option<&str>) -> Self {
        self.raw = raw.map(str::to_string);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;

    #[test]
    fn test_record_serializes_flat() {
        let record = ResultRecord {
            searched_name: "Jane Roe".to_string(),
            profile_url: "https://www.linkedin.com/in/janeroe".to_string(),
            org_name: "Acme".to_string(),
            org_reference_url: String::new(),
            sector: "Retail".to_string(),
            location: "Ohio".to_string(),
            attributes: OrganizationAttributes {
                revenue: AttributeValue::Number(500000.into()),
                ..Default::default()
            },
            classification: EntityClass::Unclassified,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["revenue"], 500000);
        assert_eq!(value["employee_count"], "unknown");
        assert_eq!(value["classification"], "Unclassified");
    }

    #[test]
    fn test_diagnostic_display_and_raw() {
        let diag = Diagnostic::new(Stage::Discovery, "bad output").with_raw(Some("oops"));
        assert_eq!(diag.to_string(), "[profile discovery] bad output");
        assert_eq!(diag.raw.as_deref(), Some("oops"));
    }
}
