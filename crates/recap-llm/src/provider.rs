use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::LlmError;

/// Incremental model output. Ends after the last chunk; an `Err` item is final.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

/// A system instruction plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name, used in logs and the health check.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Run the prompt and return the whole answer.
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError>;

    /// Run the prompt and return the answer as it is generated.
    async fn stream(&self, prompt: &Prompt) -> Result<TextStream, LlmError>;
}

/// Turn a non-2xx response into [`LlmError::Status`], keeping the body for diagnostics.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, status = status.as_u16(), "provider request failed");
    Err(LlmError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}
