//! End-to-end search runs: directory, discovery, enrichment, classification
//! and export, driven by scripted and mock-HTTP oracles.

mod common;

use common::fixtures::{discovery_settings, fixture_path, load_directory, oracle_config, search_config};
use common::wiremock_helpers::*;
use orgfinder::batch::parse_names_file;
use orgfinder::directory::DirectoryCache;
use orgfinder::export::{export_batch_results, write_exports, OutputFormat};
use orgfinder::oracle::{AgentOracle, OracleCredentials};
use orgfinder::pipeline::{AbortReason, RunEvent, RunOutcome};
use orgfinder::{run_search, EntityClass, ScriptedOracle, Stage};
use tempfile::TempDir;
use wiremock::MockServer;

const DISCOVER: &str = "Find LinkedIn profiles";
const PROFILE: &str = "You are given a LinkedIn URL of a person";
const PRIMARY: &str = "organization/company page at this URL";
const FALLBACK: &str = "Search for verified company information";

#[tokio::test]
async fn test_directory_hit_goes_straight_to_enrichment() {
    let mut cache = DirectoryCache::new();
    let directory = load_directory(&mut cache);
    let oracle = ScriptedOracle::new()
        .respond(
            PROFILE,
            r#"Here you go:
{"Org_Name": "Roe Foundation", "Org_LinkedIn_URL": "https://www.linkedin.com/company/roe-foundation", "Org_Sector": "Philanthropy", "Location": "Leeds, UK"}"#,
        )
        .respond(
            PRIMARY,
            r#"{"revenue": 500000, "employee_count": 10, "type_of_organization": "non-profit"}"#,
        );

    let report = run_search(&oracle, "jane roe", &directory, &discovery_settings(), |_| {})
        .await
        .unwrap();

    assert_eq!(oracle.count_matching(DISCOVER), 0);
    assert_eq!(oracle.count_matching(FALLBACK), 0);
    assert!(oracle.prompts()[0].contains("URL: https://www.linkedin.com/in/janeroe"));

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(report.diagnostics.is_empty());
    let record = &report.records[0];
    assert_eq!(record.org_name, "Roe Foundation");
    assert_eq!(record.location, "Leeds, UK");
    assert_eq!(record.classification, EntityClass::NonProfitLocal);
}

#[tokio::test]
async fn test_empty_discovery_produces_no_records() {
    let mut cache = DirectoryCache::new();
    let directory = load_directory(&mut cache);
    let oracle = ScriptedOracle::new().respond(DISCOVER, "[]");

    let mut events = Vec::new();
    let report = run_search(&oracle, "Nobody Atall", &directory, &discovery_settings(), |e| {
        events.push(format!("{:?}", e));
    })
    .await
    .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted(AbortReason::NoProfilesFound));
    assert!(report.records.is_empty());
    assert_eq!(oracle.prompts().len(), 1);
    assert_eq!(events.len(), 1);
    assert!(report.diagnostics[0].message.contains("No profile URLs available"));
}

#[tokio::test]
async fn test_phase_one_parse_error_falls_back_for_every_field() {
    let mut cache = DirectoryCache::new();
    let directory = load_directory(&mut cache);
    let oracle = ScriptedOracle::new()
        .respond(DISCOVER, r#"["https://www.linkedin.com/in/sam-lee/"]"#)
        .respond(
            PROFILE,
            r#"{"Org_Name": "Lee Labs", "Org_LinkedIn_URL": "https://www.linkedin.com/company/lee-labs"}"#,
        )
        .respond(PRIMARY, "revenue: about $40M, maybe {unsure}")
        .respond(
            FALLBACK,
            r#"```json
{"revenue": 40000000, "employee_count": "unknown", "type_of_organization": "startup"}
```"#,
        );

    let report = run_search(&oracle, "Sam Lee", &directory, &discovery_settings(), |_| {})
        .await
        .unwrap();

    let fallback = oracle.prompts().into_iter().find(|p| p.contains(FALLBACK)).unwrap();
    assert!(fallback.contains("revenue, employee_count, type_of_organization"));

    let record = &report.records[0];
    assert_eq!(record.attributes.revenue.to_string(), "40000000");
    assert!(record.attributes.employee_count.is_unknown());
    assert_eq!(record.classification, EntityClass::Startup);

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].stage, Stage::OrgEnrichmentPrimary);
    assert_eq!(
        report.diagnostics[0].raw.as_deref(),
        Some("revenue: about $40M, maybe {unsure}")
    );
}

#[tokio::test]
async fn test_events_arrive_in_order() {
    let mut cache = DirectoryCache::new();
    let directory = load_directory(&mut cache);
    let oracle = ScriptedOracle::new()
        .respond(
            DISCOVER,
            r#"["https://www.linkedin.com/in/a1", "https://www.linkedin.com/in/a2"]"#,
        )
        .respond("in/a1\n", "no idea")
        .respond("in/a2\n", r#"{"Org_Name": "A2 Media"}"#)
        .respond(FALLBACK, r#"{"type_of_organization": "journalist"}"#);

    let mut kinds = Vec::new();
    let report = run_search(&oracle, "Alex Ample", &directory, &discovery_settings(), |e| {
        kinds.push(match e {
            RunEvent::CandidateStarted { index, .. } => format!("start {}", index),
            RunEvent::Recorded(r) => format!("record {}", r.org_name),
            RunEvent::Diagnostic(d) => format!("diag {:?}", d.stage),
        });
    })
    .await
    .unwrap();

    assert_eq!(
        kinds,
        vec!["start 0", "diag ProfileEnrichment", "start 1", "record A2 Media"]
    );
    assert_eq!(report.records[0].classification, EntityClass::Journalist);
}

#[tokio::test]
async fn test_search_through_agent_oracle_and_export() {
    let chat = MockServer::start().await;
    mount_chat_reply(
        &chat,
        PROFILE,
        r#"{"Org_Name": "Doe Capital", "Org_LinkedIn_URL": "", "Org_Sector": "Finance", "Location": "NYC"}"#,
    )
    .await;
    mount_chat_reply(
        &chat,
        FALLBACK,
        r#"{"revenue": 3000000000, "employee_count": 9000, "type_of_organization": "enterprise"}"#,
    )
    .await;

    let oracle = AgentOracle::new(
        &oracle_config(&chat.uri(), 2),
        &search_config(None),
        OracleCredentials {
            model_api_key: MODEL_KEY.to_string(),
            search_api_key: None,
        },
    )
    .unwrap();

    let mut cache = DirectoryCache::new();
    let directory = load_directory(&mut cache);
    let report = run_search(&oracle, "  JOHN DOE ", &directory, &discovery_settings(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].classification, EntityClass::Enterprise);
    assert_eq!(received_bodies(&chat).await.len(), 2);

    let out = TempDir::new().unwrap();
    let written = write_exports(&report.records, OutputFormat::Csv, out.path(), "org_results", false).unwrap();
    let csv = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(
        csv.lines().nth(1).unwrap(),
        "https://www.linkedin.com/in/johndoe,Doe Capital,,Finance,NYC,enterprise,3000000000,9000,Enterprise"
    );
}

#[tokio::test]
async fn test_batch_names_share_cached_directory() {
    let names = parse_names_file(&fixture_path("names.json")).unwrap();
    assert_eq!(names, vec!["Jane Roe", "Sam Lee", "Nobody Atall"]);

    let mut cache = DirectoryCache::new();
    let first = load_directory(&mut cache);
    let again = load_directory(&mut cache);
    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_eq!(cache.len(), 1);

    let oracle = ScriptedOracle::new()
        .respond("\"Sam Lee\"", r#"["https://www.linkedin.com/in/sam-lee"]"#)
        .respond(DISCOVER, "[]")
        .respond("in/janeroe\n", r#"{"Org_Name": "Roe Foundation"}"#)
        .respond("in/sam-lee\n", r#"{"Org_Name": "Lee Labs"}"#)
        .respond(FALLBACK, r#"{"type_of_organization": "individual"}"#);

    let mut all = Vec::new();
    let mut aborted = 0;
    for name in &names {
        let report = run_search(&oracle, name, &first, &discovery_settings(), |_| {}).await.unwrap();
        if report.abort_reason().is_some() {
            aborted += 1;
        }
        all.extend(report.records);
    }

    assert_eq!(aborted, 1);
    let searched: Vec<&str> = all.iter().map(|r| r.searched_name.as_str()).collect();
    assert_eq!(searched, vec!["Jane Roe", "Sam Lee"]);

    let bundle = export_batch_results(&all).unwrap();
    let csv = String::from_utf8(bundle.csv).unwrap();
    assert!(csv.starts_with("Searched Name,"));
    assert_eq!(csv.lines().count(), 3);
}
