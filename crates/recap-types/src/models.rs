use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A stored digest. `summary` keeps the raw model output so a digest can be
/// re-parsed later; the structured fields are what clients render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Digest {
    pub id: Uuid,
    pub public_id: Uuid,
    pub transcript: String,
    pub summary: String,
    pub overview: String,
    pub key_decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub is_public: bool,
    /// Anonymous grouping; digests made outside a session have none
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bucket of digests, typically one browser tab or meeting series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub digest_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The structured part of a digest, as carved out of model output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DigestContent {
    pub overview: String,
    pub key_decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub summary: String,
}

/// A task pulled from the meeting, optionally with an owner.
///
/// Models answer with either a bare string or an object; both shapes are
/// accepted on input, the object shape is always written back out.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionItem {
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl ActionItem {
    pub fn new(task: impl Into<String>, assignee: Option<String>) -> Self {
        Self {
            task: task.into(),
            assignee,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionItemRepr {
    Text(String),
    Object {
        #[serde(alias = "thing", alias = "item", alias = "action")]
        task: String,
        #[serde(default, alias = "owner", alias = "assigned_to")]
        assignee: Option<String>,
    },
}

impl<'de> Deserialize<'de> for ActionItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ActionItemRepr::deserialize(deserializer)? {
            ActionItemRepr::Text(task) => ActionItem { task, assignee: None },
            ActionItemRepr::Object { task, assignee } => ActionItem {
                task,
                // "" and "N/A" style placeholders mean nobody was named
                assignee: assignee
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case("n/a")),
            },
        })
    }
}
