/// Database row types. These map directly to SQLite rows.
/// Distinct from the recap-types API models; list columns stay as their
/// stored JSON text.

#[derive(Debug, Clone, PartialEq)]
pub struct DigestRow {
    pub id: String,
    pub public_id: String,
    pub transcript: String,
    pub summary: String,
    pub overview: String,
    pub key_decisions: String,
    pub action_items: String,
    pub is_public: bool,
    pub session_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub id: String,
    pub digest_count: u64,
    pub created_at: String,
    pub updated_at: String,
}
