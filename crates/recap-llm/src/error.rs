use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {provider}: {detail}")]
    Decode { provider: String, detail: String },

    #[error("Request blocked by {provider}: {reason}")]
    Blocked { provider: String, reason: String },

    #[error("AI service returned empty response")]
    EmptyResponse,
}

impl LlmError {
    pub fn decode(provider: &str, detail: impl ToString) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn is_quota(&self) -> bool {
        match self {
            Self::Status { status: 429, .. } => true,
            Self::Status { body, .. } => {
                let body = body.to_ascii_lowercase();
                body.contains("quota") || body.contains("rate limit")
            }
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Status { status, .. } => *status == 408 || *status == 504,
            _ => false,
        }
    }

    /// Message safe to show an end user.
    pub fn user_message(&self) -> String {
        if self.is_quota() {
            "AI service quota exceeded. Please try again later.".to_string()
        } else if self.is_timeout() {
            "Request timeout. Please try again.".to_string()
        } else if matches!(self, Self::EmptyResponse) {
            self.to_string()
        } else {
            format!("Error processing transcript: {}", self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, body: &str) -> LlmError {
        LlmError::Status {
            provider: "gemini".into(),
            status: code,
            body: body.into(),
        }
    }

    #[test]
    fn quota_detection() {
        assert!(status(429, "").is_quota());
        assert!(status(403, r#"{"error":"Quota exceeded for project"}"#).is_quota());
        assert!(!status(500, "internal").is_quota());
        assert_eq!(
            status(429, "").user_message(),
            "AI service quota exceeded. Please try again later."
        );
    }

    #[test]
    fn timeout_and_generic_messages() {
        assert_eq!(status(504, "").user_message(), "Request timeout. Please try again.");
        assert_eq!(
            LlmError::EmptyResponse.user_message(),
            "AI service returned empty response"
        );
        assert!(status(500, "boom").user_message().starts_with("Error processing transcript:"));
    }
}
