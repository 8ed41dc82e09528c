//! Tool-using research agent over an OpenAI-compatible chat API.
//!
//! The agent offers the model a single `web_search` function. Tool calls are
//! executed against the configured search API and fed back as `tool`
//! messages until the model answers in text or the round budget runs out.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{OracleCredentials, OracleError, ResearchOracle};
use crate::config::{OracleConfig, SearchConfig};

const SYSTEM_PROMPT: &str = "You are a research agent that looks up people and organizations. \
Use the web_search tool to find current, verifiable information before answering. \
Follow the requested output format exactly.";

const SEARCH_TOOL_NAME: &str = "web_search";

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct SearchArguments {
    query: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

struct SearchTool {
    endpoint: String,
    api_key: String,
    num_results: u32,
    max_characters: u32,
}

/// Research oracle backed by a chat model with an optional web search tool
pub struct AgentOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tool_rounds: u32,
    search: Option<SearchTool>,
}

impl AgentOracle {
    pub fn new(
        oracle: &OracleConfig,
        search: &SearchConfig,
        credentials: OracleCredentials,
    ) -> Result<Self, OracleError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("orgfinder/", env!("CARGO_PKG_VERSION")));
        if oracle.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(oracle.request_timeout_secs));
        }
        let client = builder.build()?;

        let search = if search.enabled {
            let api_key = credentials
                .search_api_key
                .clone()
                .ok_or_else(|| OracleError::MissingCredentials(search.api_key_env.clone()))?;
            Some(SearchTool {
                endpoint: search.endpoint.clone(),
                api_key,
                num_results: search.num_results,
                max_characters: search.max_characters,
            })
        } else {
            None
        };

        Ok(Self {
            client,
            endpoint: oracle.endpoint.clone(),
            model: oracle.model.clone(),
            api_key: credentials.model_api_key,
            temperature: oracle.temperature,
            max_tool_rounds: oracle.max_tool_rounds,
            search,
        })
    }

    fn tool_definitions() -> Value {
        json!([{
            "type": "function",
            "function": {
                "name": SEARCH_TOOL_NAME,
                "description": "Search the web and return matching pages with their text content.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Search query"}
                    },
                    "required": ["query"]
                }
            }
        }])
    }

    async fn chat(&self, messages: &[Value], with_tools: bool) -> Result<(Value, AssistantMessage), OracleError> {
        let mut body = json!({
            "model": &self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if with_tools {
            body["tools"] = Self::tool_definitions();
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status { status, body });
        }

        let raw: Value = response.json().await?;
        let message_value = raw
            .pointer("/choices/0/message")
            .cloned()
            .ok_or_else(|| OracleError::InvalidResponse("response contained no choices".to_string()))?;

        let message: AssistantMessage = serde_json::from_value(message_value.clone())
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        Ok((message_value, message))
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(search) = &self.search else {
            return "web search is not available".to_string();
        };
        if call.function.name != SEARCH_TOOL_NAME {
            return format!("unknown tool '{}'", call.function.name);
        }

        let args: SearchArguments = match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => return format!("invalid arguments for {}: {}", SEARCH_TOOL_NAME, e),
        };

        debug!("Agent web search: {}", args.query);
        match self.search_web(search, &args.query).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Web search failed for '{}': {}", args.query, e);
                format!("search failed: {}", e)
            }
        }
    }

    async fn search_web(&self, search: &SearchTool, query: &str) -> Result<String, OracleError> {
        let body = json!({
            "query": query,
            "numResults": search.num_results,
            "contents": {"text": {"maxCharacters": search.max_characters}},
        });

        let response = self
            .client
            .post(&search.endpoint)
            .header("x-api-key", &search.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status { status, body });
        }

        let parsed: SearchResponse = response.json().await?;
        if parsed.results.is_empty() {
            return Ok("no results".to_string());
        }

        let rendered = parsed
            .results
            .iter()
            .map(|hit| {
                format!(
                    "Title: {}\nURL: {}\n{}",
                    hit.title.as_deref().unwrap_or(""),
                    hit.url,
                    hit.text.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        Ok(rendered)
    }
}

#[async_trait]
impl ResearchOracle for AgentOracle {
    async fn query(&self, prompt: &str) -> Result<String, OracleError> {
        let mut messages = vec![
            json!({"role": "system", "content": SYSTEM_PROMPT}),
            json!({"role": "user", "content": prompt}),
        ];

        let mut rounds = 0;
        loop {
            let tools_allowed = self.search.is_some() && rounds < self.max_tool_rounds;
            let (raw_message, message) = self.chat(&messages, tools_allowed).await?;
            let tool_calls = message.tool_calls.unwrap_or_default();

            if tool_calls.is_empty() || !tools_allowed {
                return message
                    .content
                    .ok_or_else(|| OracleError::InvalidResponse("assistant message had no content".to_string()));
            }

            rounds += 1;
            debug!("Agent requested {} tool call(s) (round {})", tool_calls.len(), rounds);
            messages.push(raw_message);
            for call in &tool_calls {
                let output = self.run_tool(call).await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": output,
                }));
            }
        }
    }
}
