//! Research oracle interface
//!
//! The pipeline only ever sends a prompt and receives free text back. The
//! concrete agent lives in [`agent`]; [`scripted`] is a deterministic stand-in
//! used to exercise pipeline decision logic without a network.

pub mod agent;
pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;

pub use agent::AgentOracle;
pub use scripted::ScriptedOracle;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// A research capability: prompt in, best-effort text out.
#[async_trait]
pub trait ResearchOracle: Send + Sync {
    async fn query(&self, prompt: &str) -> Result<String, OracleError>;
}

#[async_trait]
impl<T: ResearchOracle + ?Sized> ResearchOracle for std::sync::Arc<T> {
    async fn query(&self, prompt: &str) -> Result<String, OracleError> {
        (**self).query(prompt).await
    }
}

/// API keys resolved once at startup and handed to the oracle adapter.
#[derive(Clone, Default)]
pub struct OracleCredentials {
    pub model_api_key: String,
    pub search_api_key: Option<String>,
}

impl OracleCredentials {
    /// Read keys from the named environment variables. The model key is
    /// required; the search key only when web search is enabled.
    pub fn from_env(model_key_var: &str, search_key_var: Option<&str>) -> Result<Self, OracleError> {
        let model_api_key = read_env(model_key_var)
            .ok_or_else(|| OracleError::MissingCredentials(model_key_var.to_string()))?;

        let search_api_key = match search_key_var {
            Some(var) => Some(read_env(var).ok_or_else(|| OracleError::MissingCredentials(var.to_string()))?),
            None => None,
        };

        Ok(Self {
            model_api_key,
            search_api_key,
        })
    }
}

impl std::fmt::Debug for OracleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleCredentials")
            .field("model_api_key", &"<redacted>")
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn read_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
