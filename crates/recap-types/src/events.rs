use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Digest;

/// Frames sent over the digest SSE stream, one JSON object per `data:` line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Ids are allocated before the model is called so the client can link early
    Start { digest_id: Uuid, public_id: Uuid },

    /// A piece of model output, forwarded as received
    Content { text: String },

    /// The digest was parsed and stored
    Complete { digest: Digest },

    /// Generation failed; nothing was stored
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let json = serde_json::to_value(StreamEvent::Content { text: "hi".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "content", "text": "hi" }));

        let json = serde_json::to_value(StreamEvent::Error { message: "boom".into() }).unwrap();
        assert_eq!(json["type"], "error");
        assert!(StreamEvent::Error { message: String::new() }.is_terminal());
        assert!(!StreamEvent::Content { text: String::new() }.is_terminal());
    }
}
