//! Deterministic oracle that answers from a fixed script.
//!
//! Each rule pairs a prompt substring with a canned reply or a failure. The
//! first rule whose substring occurs in the prompt answers; prompts that match
//! nothing fail with [`OracleError::Unavailable`]. Every prompt is recorded.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{OracleError, ResearchOracle};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Default)]
pub struct ScriptedOracle {
    rules: Vec<(String, Reply)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `needle` with `reply`.
    pub fn respond(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(reply.into())));
        self
    }

    /// Fail prompts containing `needle` as a transport error would.
    pub fn fail(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Fail(message.into())));
        self
    }

    /// All prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of prompts that contained `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl ResearchOracle for ScriptedOracle {
    async fn query(&self, prompt: &str) -> Result<String, OracleError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match self.rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((_, Reply::Fail(message))) => Err(OracleError::Unavailable(message.clone())),
            None => Err(OracleError::Unavailable("no scripted reply for prompt".to_string())),
        }
    }
}
