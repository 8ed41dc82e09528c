use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CHAT_PATH: &str = "/v1/chat/completions";
pub const SEARCH_PATH: &str = "/search";
pub const MODEL_KEY: &str = "test-model-key";
pub const SEARCH_KEY: &str = "test-search-key";

/// Chat-completions response whose assistant message is plain text.
pub fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// Chat-completions response asking for one `web_search` call.
pub fn tool_call_completion(call_id: &str, query: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": call_id,
                    "type": "function",
                    "function": {
                        "name": "web_search",
                        "arguments": json!({"query": query}).to_string()
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

/// Answer chat requests whose body contains `needle` with `content`.
pub async fn mount_chat_reply(server: &MockServer, needle: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", format!("Bearer {}", MODEL_KEY).as_str()))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(content)))
        .mount(server)
        .await;
}

/// Answer chat requests whose body contains `needle` with a tool call.
pub async fn mount_tool_call(server: &MockServer, needle: &str, call_id: &str, query: &str) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_completion(call_id, query)))
        .mount(server)
        .await;
}

/// Web-search API that returns the given (title, url, text) hits.
pub async fn mock_search_server(hits: &[(&str, &str, &str)]) -> MockServer {
    let server = MockServer::start().await;
    let results: Vec<Value> = hits
        .iter()
        .map(|(title, url, text)| json!({"title": title, "url": url, "text": text}))
        .collect();

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(header("x-api-key", SEARCH_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": results})))
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that returns the specified HTTP error status code.
///
/// Useful for testing error handling for 4xx and 5xx responses.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status_code).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    server
}

/// Chat server that answers every request with the given JSON body.
pub async fn mock_chat_body(body: Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    server
}

/// Bodies of every request the server received, parsed as JSON.
pub async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_search_server_requires_key() {
        let server = mock_search_server(&[("Acme", "https://acme.test", "Acme makes anvils")]).await;
        let client = reqwest::Client::new();

        let ok = client
            .post(format!("{}{}", server.uri(), SEARCH_PATH))
            .header("x-api-key", SEARCH_KEY)
            .json(&json!({"query": "acme"}))
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), 200);
        let body: Value = ok.json().await.unwrap();
        assert_eq!(body["results"][0]["title"], "Acme");

        let denied = client
            .post(format!("{}{}", server.uri(), SEARCH_PATH))
            .json(&json!({"query": "acme"}))
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 404);
    }

    #[tokio::test]
    async fn test_mock_error_server_returns_status_code() {
        let server = mock_error_server(503).await;

        let response = reqwest::Client::new()
            .post(format!("{}/any-path", server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 503);
    }
}
