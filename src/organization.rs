//! Organization enrichment
//!
//! Resolves revenue, headcount and organization type in two phases:
//!
//! 1. Primary: read the organization's own reference page, only when a secure
//!    (`https://`) reference URL is known.
//! 2. Fallback: a general company search restricted to the keys still at the
//!    `"unknown"` sentinel after phase 1.
//!
//! A failed phase is reported and skipped; whatever was resolved so far is
//! kept and the caller classifies with it.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::attributes::{merge_missing, AttributeKey, OrgType, OrganizationAttributes};
use crate::extract::{parse_object, ExtractionError};
use crate::oracle::{OracleError, ResearchOracle};

const SECURE_SCHEME: &str = "https://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPhase {
    Primary,
    Fallback,
}

impl std::fmt::Display for EnrichmentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichmentPhase::Primary => write!(f, "primary"),
            EnrichmentPhase::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("organization lookup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("could not parse organization details: {0}")]
    Parse(#[from] ExtractionError),
}

impl PhaseError {
    /// Oracle text that failed to parse, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            PhaseError::Oracle(_) => None,
            PhaseError::Parse(e) => Some(e.raw()),
        }
    }
}

/// A phase that did not complete.
#[derive(Debug)]
pub struct PhaseFailure {
    pub phase: EnrichmentPhase,
    /// Keys the phase was asked to resolve
    pub keys: Vec<AttributeKey>,
    pub error: PhaseError,
}

/// Result of both phases for one organization.
#[derive(Debug, Default)]
pub struct OrgEnrichment {
    pub attributes: OrganizationAttributes,
    pub primary_ran: bool,
    /// Keys requested from the fallback phase (empty when it was not needed)
    pub fallback_keys: Vec<AttributeKey>,
    pub failures: Vec<PhaseFailure>,
}

/// True when the reference URL qualifies for the primary phase.
pub fn has_secure_reference(org_reference_url: Option<&str>) -> bool {
    org_reference_url
        .map(|u| u.trim().starts_with(SECURE_SCHEME))
        .unwrap_or(false)
}

pub fn primary_prompt(org_reference_url: &str) -> String {
    format!(
        r#"You are given a LinkedIn organization/company page at this URL: {url}
Extract the following as a JSON object:
- {revenue} (approximate, in USD, ONLY an integer value with NO text, NO currency symbol, NO commas, NO decimals, NO words like 'million' or 'billion'; e.g., 102300000000 for $102.3 Billion; or "unknown" if unsure)
- {employees} (approximate, ONLY an integer, or "unknown")
- {org_type} (choose from: {types}, or "unknown")
IMPORTANT:
- For revenue, return only the integer value in USD (no $ sign, no commas, no words), e.g., 102300000000.
- Convert any stated amount (e.g., "$2.4B", "$960 million", "3,200,000,000") to the integer form (e.g., 2400000000, 960000000, 3200000000).
- If revenue can't be determined, set it to "unknown".
Only return the JSON object, nothing else."#,
        url = org_reference_url.trim(),
        revenue = AttributeKey::Revenue,
        employees = AttributeKey::EmployeeCount,
        org_type = AttributeKey::OrgType,
        types = OrgType::prompt_list(),
    )
}

pub fn fallback_prompt(organization_name: &str, missing: &[AttributeKey]) -> String {
    let keys = missing.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ");
    let mut prompt = format!(
        r#"Search for verified company information about "{organization_name}".
Return ONLY a JSON object with these keys:
{keys}
Use company websites, LinkedIn, or Crunchbase only. If a value is unavailable, use "unknown"."#
    );
    if missing.contains(&AttributeKey::OrgType) {
        prompt.push_str(&format!(
            "\nFor {}, choose from: {}, or \"unknown\".",
            AttributeKey::OrgType,
            OrgType::prompt_list()
        ));
    }
    prompt
}

/// Resolve attributes for `organization_name`.
pub async fn enrich_organization<O: ResearchOracle + ?Sized>(
    oracle: &O,
    organization_name: &str,
    org_reference_url: Option<&str>,
) -> OrgEnrichment {
    let mut result = OrgEnrichment::default();

    if let Some(url) = org_reference_url.filter(|u| has_secure_reference(Some(u))) {
        result.primary_ran = true;
        let keys = AttributeKey::ALL.to_vec();
        match run_phase(oracle, &primary_prompt(url), &mut result.attributes, &keys).await {
            Ok(filled) => debug!("Primary lookup for '{}' filled {:?}", organization_name, filled),
            Err(error) => {
                debug!("Primary lookup for '{}' failed, falling back for all fields: {}", organization_name, error);
                result.failures.push(PhaseFailure {
                    phase: EnrichmentPhase::Primary,
                    keys,
                    error,
                });
            }
        }
    } else {
        debug!("No secure reference URL for '{}', skipping primary lookup", organization_name);
    }

    let missing = result.attributes.missing();
    if !missing.is_empty() {
        result.fallback_keys = missing.clone();
        let prompt = fallback_prompt(organization_name, &missing);
        match run_phase(oracle, &prompt, &mut result.attributes, &missing).await {
            Ok(filled) => debug!("Fallback lookup for '{}' filled {:?}", organization_name, filled),
            Err(error) => {
                debug!("Fallback lookup for '{}' failed for {:?}: {}", organization_name, missing, error);
                result.failures.push(PhaseFailure {
                    phase: EnrichmentPhase::Fallback,
                    keys: missing,
                    error,
                });
            }
        }
    }

    result
}

async fn run_phase<O: ResearchOracle + ?Sized>(
    oracle: &O,
    prompt: &str,
    attributes: &mut OrganizationAttributes,
    keys: &[AttributeKey],
) -> Result<Vec<AttributeKey>, PhaseError> {
    let reply = oracle.query(prompt).await?;
    let map = parse_object(reply)?;
    Ok(merge_missing(attributes, &map, keys))
}
