use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Sampling temperature for diagnostic output (low: we want focused answers)
const TEMPERATURE: f32 = 0.1;
/// Response token cap
const MAX_TOKENS: u32 = 1024;
/// Network timeout ceiling for a completion request
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Sentinel returned when the response carries no content field
pub const NO_RESPONSE: &str = "No response from LLM";

/// What the model is asked to analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    BuildFailure,
    TestFailure,
    Warnings,
    Review,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::BuildFailure => "build_failure",
            AnalysisMode::TestFailure => "test_failure",
            AnalysisMode::Warnings => "warnings",
            AnalysisMode::Review => "review",
        }
    }

    /// Build the user prompt for this mode with the captured context appended verbatim
    pub fn prompt(&self, context: &str) -> String {
        let frame = match self {
            AnalysisMode::BuildFailure => {
                "The build failed. Analyze the following compiler output, identify the most \
                 likely root cause, and suggest a concrete fix:"
            }
            AnalysisMode::TestFailure => {
                "The build succeeded but tests failed. Analyze the following test output, \
                 identify which tests failed and why, and suggest a concrete fix:"
            }
            AnalysisMode::Warnings => {
                "The build and tests succeeded, but the compiler emitted warnings. Explain \
                 which of the following warnings matter and how to resolve them:"
            }
            AnalysisMode::Review => {
                "Review the following commit diff. Point out bugs, risky changes, and \
                 anything worth fixing before release:"
            }
        };
        format!("{}\n\n{}", frame, context)
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for a local llama-server chat-completion endpoint
pub struct LlamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaClient {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// Send a system+user prompt pair and return the response text.
    ///
    /// Network errors and non-2xx responses propagate; a well-formed response
    /// that is missing the content field degrades to [`NO_RESPONSE`].
    pub async fn query(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        };
        trace!("Request user prompt: {} chars", user_prompt.len());

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .context("inference request failed")?
            .error_for_status()
            .context("inference server returned an error status")?;

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("failed to decode inference response")?;
        debug!("Response has {} choices", chat_response.choices.len());

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_prompt_interpolates_context_verbatim() {
        let context = "foo.c:10: error: missing semicolon \"quoted\"\n\tweird\u{1}chars";
        let prompt = AnalysisMode::BuildFailure.prompt(context);
        assert!(prompt.ends_with(context));
    }

    #[test]
    fn test_mode_keys() {
        assert_eq!(AnalysisMode::BuildFailure.as_str(), "build_failure");
        assert_eq!(AnalysisMode::TestFailure.as_str(), "test_failure");
        assert_eq!(AnalysisMode::Warnings.as_str(), "warnings");
        assert_eq!(AnalysisMode::Review.as_str(), "review");
    }

    #[tokio::test]
    async fn test_query_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "temperature": 0.1,
                "max_tokens": 1024,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "looks like a typo"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlamaClient::new(server.uri()).unwrap();
        let result = client.query("system", "user").await.unwrap();
        assert_eq!(result, "looks like a typo");
    }

    #[tokio::test]
    async fn test_query_missing_content_yields_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = LlamaClient::new(server.uri()).unwrap();
        let result = client.query("system", "user").await.unwrap();
        assert_eq!(result, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_query_server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = LlamaClient::new(server.uri()).unwrap();
        assert!(client.query("system", "user").await.is_err());
    }

    #[tokio::test]
    async fn test_query_survives_arbitrary_log_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let client = LlamaClient::new(server.uri()).unwrap();
        let nasty = "line with \"quotes\", backslash \\, control \u{7} char, and 日本語";
        let result = client.query("system", nasty).await.unwrap();
        assert_eq!(result, "ok");
    }
}
