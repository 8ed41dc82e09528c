//! Configuration management for orgfinder
//!
//! All configuration is loaded from `./config/orgfinder.toml`.
//! The embedded template is what `--init` writes. Optional sections and keys
//! fall back to the serde defaults below, which must agree with it.

use serde::Deserialize;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use regex::Regex;

use crate::directory::DatasetColumns;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/orgfinder.toml";

/// Default configuration file content, written by `--init`
pub const DEFAULT_CONFIG: &str = include_str!("../config/orgfinder.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid regex pattern '{pattern_name}': {error}\n  Pattern: {pattern}")]
    InvalidRegex {
        pattern_name: String,
        pattern: String,
        error: String,
    },

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' must be greater than 0")]
    MustBePositive { field: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub oracle: OracleConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub dataset: DatasetColumns,
}

/// Chat-completions endpoint used by the research agent
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the model API key
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on tool-call round trips per query
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Per-request timeout; 0 disables the timeout
    #[serde(default)]
    pub request_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tool_rounds() -> u32 {
    4
}

/// Web search tool exposed to the research agent
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_num_results")]
    pub num_results: u32,
    /// Text budget per search result
    #[serde(default = "default_max_characters")]
    pub max_characters: u32,
}

fn default_search_endpoint() -> String {
    "https://api.exa.ai/search".to_string()
}

fn default_search_api_key_env() -> String {
    "EXA_API_KEY".to_string()
}

fn default_num_results() -> u32 {
    5
}

fn default_max_characters() -> u32 {
    2000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_search_endpoint(),
            api_key_env: default_search_api_key_env(),
            num_results: default_num_results(),
            max_characters: default_max_characters(),
        }
    }
}

/// Profile discovery settings
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum candidate profile URLs per searched name
    #[serde(default = "default_max_profiles")]
    pub max_profiles: usize,
    /// Identity-page URL pattern candidates must match
    #[serde(default = "default_profile_url_pattern")]
    pub profile_url_pattern: String,
}

fn default_max_profiles() -> usize {
    5
}

fn default_profile_url_pattern() -> String {
    r"^https://([a-z]{2,3}\.)?(www\.)?linkedin\.com/in/[^/?#\s]+/?".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_profiles: default_max_profiles(),
            profile_url_pattern: default_profile_url_pattern(),
        }
    }
}

impl DiscoveryConfig {
    /// Compile the profile URL pattern (validated at load time)
    pub fn profile_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.profile_url_pattern).map_err(|e| ConfigError::InvalidRegex {
            pattern_name: "discovery.profile_url_pattern".to_string(),
            pattern: self.profile_url_pattern.clone(),
            error: e.to_string(),
        })
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("oracle.model", &self.oracle.model)?;
        require_non_empty("oracle.api_key_env", &self.oracle.api_key_env)?;
        require_http_url("oracle.endpoint", &self.oracle.endpoint)?;

        if self.search.enabled {
            require_non_empty("search.api_key_env", &self.search.api_key_env)?;
            require_http_url("search.endpoint", &self.search.endpoint)?;
            if self.search.num_results == 0 {
                return Err(ConfigError::MustBePositive {
                    field: "search.num_results".to_string(),
                });
            }
        }

        if self.discovery.max_profiles == 0 {
            return Err(ConfigError::MustBePositive {
                field: "discovery.max_profiles".to_string(),
            });
        }
        self.discovery.profile_regex()?;

        require_non_empty("dataset.name_column", &self.dataset.name_column)?;
        require_non_empty("dataset.url_column", &self.dataset.url_column)?;
        require_non_empty("dataset.company_column", &self.dataset.company_column)?;
        require_non_empty("dataset.position_column", &self.dataset.position_column)?;

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyRequired {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn require_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ConfigError::InvalidUrl {
            field: field.to_string(),
            url: url.to_string(),
        });
    }
    Ok(())
}
