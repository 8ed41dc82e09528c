//! Search orchestration
//!
//! One call to [`run_search`] takes a name through local lookup, discovery
//! (on a miss), and then enriches and classifies each candidate in turn.
//! Candidates are processed sequentially. A failing candidate is skipped with
//! a diagnostic; only a dataset failure ends the run with an error.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::classify::classify_entity;
use crate::directory::{DatasetError, Directory};
use crate::organization::{enrich_organization, EnrichmentPhase};
use crate::oracle::ResearchOracle;
use crate::profile::{
    discover_profiles, enrich_profile, DiscoveryError, DiscoverySettings, ProfileEnrichmentError, ProfileMatch,
};
use crate::record::{Diagnostic, ResultRecord, Stage};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("dataset lookup failed: {0}")]
    Dataset(#[from] DatasetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    NoProfilesFound,
    DiscoveryParseFailed,
    DiscoveryFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Aborted(AbortReason),
}

/// Progress notification delivered while a search runs.
#[derive(Debug)]
pub enum RunEvent<'a> {
    CandidateStarted {
        index: usize,
        total: usize,
        profile_url: &'a str,
    },
    Recorded(&'a ResultRecord),
    Diagnostic(&'a Diagnostic),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub name: String,
    pub records: Vec<ResultRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
            diagnostics: Vec::new(),
            outcome: RunOutcome::Completed,
        }
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self.outcome {
            RunOutcome::Completed => None,
            RunOutcome::Aborted(reason) => Some(reason),
        }
    }
}

struct Run<'f, F: FnMut(&RunEvent)> {
    report: RunReport,
    on_event: &'f mut F,
}

impl<F: FnMut(&RunEvent)> Run<'_, F> {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        // Shown to the user by whoever consumes the event
        debug!("{}", diagnostic);
        (self.on_event)(&RunEvent::Diagnostic(&diagnostic));
        self.report.diagnostics.push(diagnostic);
    }

    fn record(&mut self, record: ResultRecord) {
        (self.on_event)(&RunEvent::Recorded(&record));
        self.report.records.push(record);
    }

    fn abort(mut self, reason: AbortReason) -> RunReport {
        self.report.outcome = RunOutcome::Aborted(reason);
        self.report
    }
}

/// Search for `name`, reporting progress through `on_event`.
pub async fn run_search<O, F>(
    oracle: &O,
    name: &str,
    directory: &Directory,
    discovery: &DiscoverySettings,
    mut on_event: F,
) -> Result<RunReport, PipelineError>
where
    O: ResearchOracle + ?Sized,
    F: FnMut(&RunEvent),
{
    let mut run = Run {
        report: RunReport::new(name),
        on_event: &mut on_event,
    };

    let candidates = match directory.lookup(name)? {
        Some(record) if !record.profile_url.is_empty() => {
            info!("Found '{}' in the local directory", record.full_name);
            vec![ProfileMatch::from_directory(record)]
        }
        found => {
            if found.is_some() {
                run.diagnose(Diagnostic::new(
                    Stage::LocalLookup,
                    format!("Directory entry for '{}' has no profile URL, searching instead", name),
                ));
            }
            debug!("'{}' not in the local directory, starting discovery", name);
            match discover_profiles(oracle, name, discovery).await {
                Ok(outcome) => {
                    for rejected in &outcome.rejected {
                        run.diagnose(
                            Diagnostic::new(Stage::Discovery, "Discarded entry that is not a profile URL")
                                .with_raw(Some(rejected)),
                        );
                    }
                    outcome.matches
                }
                Err(DiscoveryError::Parse(e)) => {
                    run.diagnose(
                        Diagnostic::new(Stage::Discovery, format!("Could not parse profile URLs: {}", e))
                            .with_raw(Some(e.raw())),
                    );
                    return Ok(run.abort(AbortReason::DiscoveryParseFailed));
                }
                Err(DiscoveryError::Oracle(e)) => {
                    run.diagnose(Diagnostic::new(Stage::Discovery, format!("Profile search failed: {}", e)));
                    return Ok(run.abort(AbortReason::DiscoveryFailed));
                }
            }
        }
    };

    if candidates.is_empty() {
        run.diagnose(Diagnostic::new(
            Stage::Discovery,
            format!("No profile URLs available for '{}'", name),
        ));
        return Ok(run.abort(AbortReason::NoProfilesFound));
    }

    let total = candidates.len();
    for (index, candidate) in candidates.iter().enumerate() {
        (run.on_event)(&RunEvent::CandidateStarted {
            index,
            total,
            profile_url: &candidate.profile_url,
        });
        if let Some(record) = process_candidate(oracle, name, candidate, &mut run).await {
            run.record(record);
        }
    }

    info!(
        "Search for '{}' finished: {} record(s), {} diagnostic(s)",
        name,
        run.report.records.len(),
        run.report.diagnostics.len()
    );
    Ok(run.report)
}

async fn process_candidate<O, F>(
    oracle: &O,
    name: &str,
    candidate: &ProfileMatch,
    run: &mut Run<'_, F>,
) -> Option<ResultRecord>
where
    O: ResearchOracle + ?Sized,
    F: FnMut(&RunEvent),
{
    let url = candidate.profile_url.as_str();

    let mut details = match enrich_profile(oracle, url).await {
        Ok(details) => details,
        Err(ProfileEnrichmentError::NoData(e)) => {
            run.diagnose(Diagnostic::new(
                Stage::ProfileEnrichment,
                format!("No data available for {}: {}", url, e),
            ));
            return None;
        }
        Err(ProfileEnrichmentError::Parse(e)) => {
            run.diagnose(
                Diagnostic::new(Stage::ProfileEnrichment, format!("Could not parse details for {}: {}", url, e))
                    .with_raw(Some(e.raw())),
            );
            return None;
        }
    };

    if let Some(record) = candidate.directory_record() {
        if details.fill_from_directory(record) {
            debug!("Organization for {} taken from the directory", url);
        }
    }

    let Some(org_name) = details.org_name.clone() else {
        run.diagnose(Diagnostic::new(
            Stage::ProfileEnrichment,
            format!("No organization found for {}, skipping", url),
        ));
        return None;
    };

    let reference = Some(details.org_reference_url.as_str()).filter(|u| !u.is_empty());
    let enrichment = enrich_organization(oracle, &org_name, reference).await;
    for failure in &enrichment.failures {
        let stage = match failure.phase {
            EnrichmentPhase::Primary => Stage::OrgEnrichmentPrimary,
            EnrichmentPhase::Fallback => Stage::OrgEnrichmentFallback,
        };
        run.diagnose(
            Diagnostic::new(stage, format!("{} for '{}'", failure.error, org_name)).with_raw(failure.error.raw()),
        );
    }

    let attributes = enrichment.attributes;
    let classification = classify_entity(&attributes.org_type, &attributes.revenue, &attributes.employee_count);

    Some(ResultRecord {
        searched_name: name.to_string(),
        profile_url: url.to_string(),
        org_name,
        org_reference_url: details.org_reference_url,
        sector: details.sector,
        location: details.location,
        attributes,
        classification,
    })
}
