use std::path::PathBuf;

use orgfinder::config::{OracleConfig, SearchConfig};
use orgfinder::directory::{DatasetColumns, DirectoryCache};
use orgfinder::profile::DiscoverySettings;
use orgfinder::Directory;
use std::sync::Arc;

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn load_fixture(relative: &str) -> String {
    std::fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", relative))
}

/// The two-person directory in `tests/fixtures/directory.csv`.
pub fn load_directory(cache: &mut DirectoryCache) -> Arc<Directory> {
    cache
        .load_path(&fixture_path("directory.csv"), &DatasetColumns::default())
        .expect("fixture directory should load")
}

pub fn discovery_settings() -> DiscoverySettings {
    DiscoverySettings {
        max_profiles: 5,
        profile_pattern: regex::Regex::new(r"^https://([a-z]{2,3}\.)?(www\.)?linkedin\.com/in/[^/?#\s]+/?").unwrap(),
    }
}

pub fn oracle_config(chat_server_uri: &str, max_tool_rounds: u32) -> OracleConfig {
    OracleConfig {
        endpoint: format!("{}/v1/chat/completions", chat_server_uri),
        model: "test-model".to_string(),
        api_key_env: "ORGFINDER_TEST_MODEL_KEY".to_string(),
        temperature: 0.0,
        max_tool_rounds,
        request_timeout_secs: 5,
    }
}

pub fn search_config(search_server_uri: Option<&str>) -> SearchConfig {
    match search_server_uri {
        Some(uri) => SearchConfig {
            enabled: true,
            endpoint: format!("{}/search", uri),
            ..SearchConfig::default()
        },
        None => SearchConfig::default(),
    }
}
