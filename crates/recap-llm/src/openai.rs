//! OpenAI-compatible chat completions (`/chat/completions`).
//!
//! DeepSeek and Qwen (DashScope compatible mode) speak the same protocol, so
//! one adapter serves all three; only the base URL and model differ.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Prompt, TextStream, check_status};
use crate::sse::decode_stream;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";
pub const QWEN_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

const DONE_SENTINEL: &str = "[DONE]";

pub struct OpenAiCompatProvider {
    http: reqwest::Client,
    name: String,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    delta: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(
        http: reqwest::Client,
        name: impl Into<String>,
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            name: name.into(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn request(&self, prompt: &Prompt, stream: bool) -> reqwest::RequestBuilder {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: 0.3,
            stream,
        };

        self.http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        info!(provider = %self.name, model = %self.model, "calling chat completions");

        let response = self.request(prompt, false).timeout(self.timeout).send().await?;
        let response = check_status(&self.name, response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::decode(&self.name, e))?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn stream(&self, prompt: &Prompt) -> Result<TextStream, LlmError> {
        info!(provider = %self.name, model = %self.model, "streaming chat completions");

        let response = self.request(prompt, true).send().await?;
        let response = check_status(&self.name, response).await?;

        let name = self.name.clone();
        let events = decode_stream(response.bytes_stream());
        let chunks = events
            .take_while(|event| {
                let done = matches!(event, Ok(msg) if msg.data.trim() == DONE_SENTINEL);
                async move { !done }
            })
            .filter_map(move |event| {
                let name = name.clone();
                async move {
                    let msg = match event {
                        Ok(msg) => msg,
                        Err(e) => return Some(Err(e)),
                    };
                    let parsed: ChatResponse = match serde_json::from_str(&msg.data) {
                        Ok(parsed) => parsed,
                        Err(e) => return Some(Err(LlmError::decode(&name, e))),
                    };
                    let text = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta)
                        .and_then(|d| d.content)
                        .unwrap_or_default();
                    debug!(len = text.len(), "chat completion chunk");
                    (!text.is_empty()).then_some(Ok(text))
                }
            });

        Ok(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            reqwest::Client::new(),
            "deepseek",
            "sk-test".into(),
            "deepseek-chat".into(),
            server.uri(),
            Duration::from_secs(5),
        )
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "sys".into(),
            user: "transcript".into(),
        }
    }

    #[tokio::test]
    async fn complete_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "deepseek-chat", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"overview\":\"ok\"}" } }]
            })))
            .mount(&server)
            .await;

        let text = provider(&server).complete(&prompt()).await.unwrap();
        assert_eq!(text, "{\"overview\":\"ok\"}");
    }

    #[tokio::test]
    async fn empty_answer_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "  " } }]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn stream_stops_at_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Key \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"decisions\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let chunks: Vec<String> = provider(&server)
            .stream(&prompt())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Key ", "decisions"]);
    }

    #[tokio::test]
    async fn server_errors_keep_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        match provider(&server).stream(&prompt()).await {
            Err(LlmError::Status { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
