//! Profile discovery and profile enrichment
//!
//! Discovery asks the research oracle for candidate profile URLs when the
//! local directory has no entry for a name. Enrichment asks it to read one
//! profile and report the person's organization.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::attributes::{merge_missing, AttributeValue, FillOnly};
use crate::directory::DirectoryRecord;
use crate::extract::{parse_array, parse_object, ExtractionError};
use crate::oracle::{OracleError, ResearchOracle};

/// Where a candidate profile URL came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchSource {
    Directory { record: DirectoryRecord },
    Discovery,
}

/// A candidate profile URL for the searched name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileMatch {
    pub profile_url: String,
    pub source: MatchSource,
}

impl ProfileMatch {
    pub fn from_directory(record: DirectoryRecord) -> Self {
        Self {
            profile_url: record.profile_url.clone(),
            source: MatchSource::Directory { record },
        }
    }

    pub fn discovered(profile_url: impl Into<String>) -> Self {
        Self {
            profile_url: profile_url.into(),
            source: MatchSource::Discovery,
        }
    }

    pub fn directory_record(&self) -> Option<&DirectoryRecord> {
        match &self.source {
            MatchSource::Directory { record } => Some(record),
            MatchSource::Discovery => None,
        }
    }
}

/// Discovery limits, taken from configuration.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub max_profiles: usize,
    pub profile_pattern: Regex,
}

#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Accepted candidates in the order the oracle returned them
    pub matches: Vec<ProfileMatch>,
    /// Entries dropped because they were not identity-page URLs
    pub rejected: Vec<String>,
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("profile search failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("could not parse profile URLs: {0}")]
    Parse(#[from] ExtractionError),
}

pub fn discovery_prompt(name: &str, max_profiles: usize) -> String {
    format!(
        r#"Find LinkedIn profiles for the person named "{name}".
Requirements:
- Only include individual people profiles on LinkedIn (URLs must match the pattern "https://www.linkedin.com/in/...").
- Exclude company pages, posts, job listings and articles.
- Return up to {max_profiles} most relevant profile URLs.
- The output must be only a valid JSON array of strings, e.g.:
  ["https://www.linkedin.com/in/john-doe/", "https://www.linkedin.com/in/johndoe123/"]
- If no profiles are found, return an empty array: []"#
    )
}

/// Ask the oracle for candidate profile URLs for `name`.
pub async fn discover_profiles<O: ResearchOracle + ?Sized>(
    oracle: &O,
    name: &str,
    settings: &DiscoverySettings,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    let reply = oracle.query(&discovery_prompt(name, settings.max_profiles)).await?;
    let items = parse_array(reply)?;

    let mut outcome = DiscoveryOutcome::default();
    for item in items {
        let Value::String(url) = item else {
            outcome.rejected.push(item.to_string());
            continue;
        };
        let url = url.trim().to_string();
        if !settings.profile_pattern.is_match(&url) {
            outcome.rejected.push(url);
            continue;
        }
        if outcome.matches.iter().any(|m| m.profile_url == url) {
            continue;
        }
        if outcome.matches.len() < settings.max_profiles {
            outcome.matches.push(ProfileMatch::discovered(url));
        }
    }

    debug!(
        "Discovery for '{}' accepted {} candidate(s), rejected {}",
        name,
        outcome.matches.len(),
        outcome.rejected.len()
    );
    Ok(outcome)
}

/// Profile fields, named as they appear in oracle JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    OrgName,
    OrgReferenceUrl,
    Sector,
    Location,
}

impl ProfileField {
    pub const ALL: [ProfileField; 4] = [
        ProfileField::OrgName,
        ProfileField::OrgReferenceUrl,
        ProfileField::Sector,
        ProfileField::Location,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::OrgName => "Org_Name",
            ProfileField::OrgReferenceUrl => "Org_LinkedIn_URL",
            ProfileField::Sector => "Org_Sector",
            ProfileField::Location => "Location",
        }
    }
}

/// Organization affiliation read from one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileDetails {
    pub org_name: Option<String>,
    pub org_reference_url: String,
    pub sector: String,
    pub location: String,
}

impl ProfileDetails {
    /// Build details from an oracle JSON object.
    pub fn from_json(map: &serde_json::Map<String, Value>) -> Self {
        let mut details = Self::default();
        merge_missing(&mut details, map, &ProfileField::ALL);
        details
    }

    /// Fill a missing organization name from the directory row the candidate
    /// came from. Returns true when the name was filled.
    pub fn fill_from_directory(&mut self, record: &DirectoryRecord) -> bool {
        let mut source = serde_json::Map::new();
        source.insert(
            ProfileField::OrgName.as_str().to_string(),
            Value::String(record.organization.clone()),
        );
        !merge_missing(self, &source, &[ProfileField::OrgName]).is_empty()
    }
}

impl FillOnly for ProfileDetails {
    type Key = ProfileField;

    fn json_key(key: ProfileField) -> &'static str {
        key.as_str()
    }

    fn is_missing(&self, key: ProfileField) -> bool {
        match key {
            ProfileField::OrgName => self.org_name.is_none(),
            ProfileField::OrgReferenceUrl => self.org_reference_url.is_empty(),
            ProfileField::Sector => self.sector.is_empty(),
            ProfileField::Location => self.location.is_empty(),
        }
    }

    /// Profile text is taken as written. "unknown" is only a placeholder for
    /// organization attributes, so an organization literally named that
    /// still counts.
    fn read_value(value: &Value) -> Option<AttributeValue> {
        match value {
            Value::String(s) => Some(s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| AttributeValue::Text(s.to_string())),
            other => AttributeValue::from_json(other),
        }
    }

    fn fill(&mut self, key: ProfileField, value: AttributeValue) {
        let value = value.to_string();
        match key {
            ProfileField::OrgName => self.org_name = Some(value),
            ProfileField::OrgReferenceUrl => self.org_reference_url = value,
            ProfileField::Sector => self.sector = value,
            ProfileField::Location => self.location = value,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProfileEnrichmentError {
    /// The research call itself failed; treated as "no data available".
    #[error("no profile data available: {0}")]
    NoData(#[from] OracleError),

    #[error("could not parse profile details: {0}")]
    Parse(#[from] ExtractionError),
}

pub fn enrichment_prompt(profile_url: &str) -> String {
    format!(
        r#"You are given a LinkedIn URL of a person. Extract information from this page.
Focus on:
  - Organization Name
  - Link to the Organization's LinkedIn Page
  - Sector of the Organization
  - Location of the person
URL: {profile_url}
Return your answer strictly as a JSON object with these keys:
  - {org}
  - {url}
  - {sector}
  - {location}"#,
        org = ProfileField::OrgName.as_str(),
        url = ProfileField::OrgReferenceUrl.as_str(),
        sector = ProfileField::Sector.as_str(),
        location = ProfileField::Location.as_str(),
    )
}

/// Read organization affiliation from one profile URL.
pub async fn enrich_profile<O: ResearchOracle + ?Sized>(
    oracle: &O,
    profile_url: &str,
) -> Result<ProfileDetails, ProfileEnrichmentError> {
    let reply = oracle.query(&enrichment_prompt(profile_url)).await?;
    let map = parse_object(reply)?;
    Ok(ProfileDetails::from_json(&map))
}
