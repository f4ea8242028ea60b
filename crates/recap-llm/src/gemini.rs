//! Google Gemini adapter (`generateContent` / `streamGenerateContent`).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Prompt, TextStream, check_status};
use crate::sse::decode_stream;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

const PROVIDER: &str = "gemini";

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }

    fn blocked(&self) -> Option<LlmError> {
        let reason = self.prompt_feedback.as_ref()?.block_reason.clone()?;
        Some(LlmError::Blocked {
            provider: PROVIDER.to_string(),
            reason,
        })
    }
}

impl GeminiProvider {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| GEMINI_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http,
            api_key,
            model,
            base_url,
            timeout,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        // Accept both "gemini-2.0-flash" and "models/gemini-2.0-flash"
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn request_body<'a>(prompt: &'a Prompt) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: &prompt.system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.user }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        info!(model = %self.model, "calling Gemini generateContent");

        let response = self
            .http
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&Self::request_body(prompt))
            .send()
            .await?;
        let response = check_status(PROVIDER, response).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::decode(PROVIDER, e))?;
        if let Some(err) = body.blocked() {
            return Err(err);
        }

        let text = body.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn stream(&self, prompt: &Prompt) -> Result<TextStream, LlmError> {
        info!(model = %self.model, "calling Gemini streamGenerateContent");

        let response = self
            .http
            .post(self.endpoint("streamGenerateContent"))
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await?;
        let response = check_status(PROVIDER, response).await?;

        let events = decode_stream(response.bytes_stream());
        let chunks = events.filter_map(|event| async move {
            let msg = match event {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e)),
            };
            let parsed: GenerateContentResponse = match serde_json::from_str(&msg.data) {
                Ok(parsed) => parsed,
                Err(e) => return Some(Err(LlmError::decode(PROVIDER, e))),
            };
            if let Some(err) = parsed.blocked() {
                return Some(Err(err));
            }
            let text = parsed.text();
            debug!(len = text.len(), "gemini chunk");
            (!text.is_empty()).then_some(Ok(text))
        });

        Ok(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(
            reqwest::Client::new(),
            "test-key".into(),
            DEFAULT_GEMINI_MODEL.into(),
            Some(server.uri()),
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
    async fn complete_concatenates_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "OVERVIEW:\n" }, { "text": "Sync." }] } }]
            })))
            .mount(&server)
            .await;

        let text = provider(&server).complete(&prompt()).await.unwrap();
        assert_eq!(text, "OVERVIEW:\nSync.");
    }

    #[tokio::test]
    async fn quota_errors_surface_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&prompt()).await.unwrap_err();
        assert!(err.is_quota(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn stream_yields_text_chunks() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello \"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"world\"}]}}]}\r\n\r\n",
        );
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
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
        assert_eq!(chunks, vec!["Hello ", "world"]);
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Blocked { ref reason, .. } if reason == "SAFETY"));
    }
}
