use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use recap_db::models::{DigestRow, SessionRow};
use recap_types::models::{ActionItem, Digest, Session};

/// Canonical text form of a path id. Anything that is not a UUID cannot name
/// a stored row.
pub fn parse_id(raw: &str) -> Option<String> {
    raw.parse::<Uuid>().ok().map(|id| id.to_string())
}

/// Map a stored row to the API model. Corrupt columns are logged and
/// replaced with defaults rather than failing the whole request.
pub fn row_to_digest(row: DigestRow) -> Digest {
    let key_decisions: Vec<String> = serde_json::from_str(&row.key_decisions).unwrap_or_else(|e| {
        warn!("Corrupt key_decisions on digest '{}': {}", row.id, e);
        Vec::new()
    });
    let action_items: Vec<ActionItem> = serde_json::from_str(&row.action_items).unwrap_or_else(|e| {
        warn!("Corrupt action_items on digest '{}': {}", row.id, e);
        Vec::new()
    });

    let session_id = row
        .session_id
        .as_deref()
        .map(|raw| parse_uuid(raw, "session_id", &row.id));

    Digest {
        id: parse_uuid(&row.id, "id", &row.id),
        public_id: parse_uuid(&row.public_id, "public_id", &row.id),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
        transcript: row.transcript,
        summary: row.summary,
        overview: row.overview,
        key_decisions,
        action_items,
        is_public: row.is_public,
        session_id,
    }
}

pub fn row_to_session(row: SessionRow) -> Session {
    Session {
        id: parse_uuid(&row.id, "id", &row.id),
        digest_count: row.digest_count,
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
    }
}

fn parse_uuid(raw: &str, column: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", column, raw, row_id, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, column: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on row '{}': {}", column, raw, row_id, e);
            DateTime::default()
        })
}
