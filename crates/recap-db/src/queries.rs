use crate::Database;
use crate::models::{DigestRow, SessionRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use recap_types::models::DigestContent;
use rusqlite::{Connection, Row};

const DIGEST_COLUMNS: &str = "id, public_id, transcript, summary, overview, key_decisions, \
                              action_items, is_public, session_id, created_at, updated_at";

const SESSION_COLUMNS: &str = "s.id, (SELECT COUNT(*) FROM digests d WHERE d.session_id = s.id), \
                               s.created_at, s.updated_at";

impl Database {
    // -- Digests --

    /// Insert a freshly generated digest and return the stored row. A digest
    /// filed under a session also bumps that session's `updated_at`.
    pub fn insert_digest(
        &self,
        id: &str,
        public_id: &str,
        session_id: Option<&str>,
        transcript: &str,
        content: &DigestContent,
    ) -> Result<DigestRow> {
        let decisions = serde_json::to_string(&content.key_decisions)?;
        let actions = serde_json::to_string(&content.action_items)?;
        let now = timestamp();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO digests (id, public_id, transcript, summary, overview, key_decisions,
                                      action_items, is_public, session_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9)",
                rusqlite::params![
                    id,
                    public_id,
                    transcript,
                    &content.summary,
                    &content.overview,
                    decisions,
                    actions,
                    session_id,
                    now,
                ],
            )?;
            if let Some(session_id) = session_id {
                tx.execute(
                    "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
                    rusqlite::params![session_id, now],
                )?;
            }
            let row = query_digest(&tx, "id", id)?
                .ok_or_else(|| anyhow::anyhow!("Digest {} vanished after insert", id))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_digest(&self, id: &str) -> Result<Option<DigestRow>> {
        self.with_conn(|conn| query_digest(conn, "id", id))
    }

    /// Lookup by share token. Visibility is left to the caller.
    pub fn get_digest_by_public_id(&self, public_id: &str) -> Result<Option<DigestRow>> {
        self.with_conn(|conn| query_digest(conn, "public_id", public_id))
    }

    /// Newest first, optionally limited to one session.
    pub fn list_digests(&self, limit: u32, offset: u32, session_id: Option<&str>) -> Result<Vec<DigestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {DIGEST_COLUMNS} FROM digests
                 WHERE ?3 IS NULL OR session_id = ?3
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset, session_id], map_digest)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_digests(&self, session_id: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM digests WHERE ?1 IS NULL OR session_id = ?1",
                [session_id],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Swap in a regenerated digest for a new transcript. Ids and creation
    /// time are kept. Returns `None` when the id is unknown.
    pub fn replace_content(
        &self,
        id: &str,
        transcript: &str,
        content: &DigestContent,
    ) -> Result<Option<DigestRow>> {
        let decisions = serde_json::to_string(&content.key_decisions)?;
        let actions = serde_json::to_string(&content.action_items)?;
        let now = timestamp();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE digests
                 SET transcript = ?2, summary = ?3, overview = ?4, key_decisions = ?5,
                     action_items = ?6, updated_at = ?7
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    transcript,
                    &content.summary,
                    &content.overview,
                    decisions,
                    actions,
                    now,
                ],
            )?;
            let row = if changed == 0 { None } else { query_digest(&tx, "id", id)? };
            tx.commit()?;
            Ok(row)
        })
    }

    /// Returns the updated row, or `None` when the id is unknown.
    pub fn update_visibility(&self, id: &str, is_public: bool) -> Result<Option<DigestRow>> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE digests SET is_public = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, is_public, now],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_digest(conn, "id", id)
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_digest(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM digests WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// Delete every digest, or only those of one session.
    pub fn clear_digests(&self, session_id: Option<&str>) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM digests WHERE ?1 IS NULL OR session_id = ?1",
                [session_id],
            )?;
            Ok(removed as u64)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str) -> Result<SessionRow> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                rusqlite::params![id, now],
            )?;
            query_session(conn, id)?.ok_or_else(|| anyhow::anyhow!("Session {} vanished after insert", id))
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, id))
    }

    /// Most recently active first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions s ORDER BY s.updated_at DESC, s.rowid DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_session)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Remove a session together with its digests. Returns how many digests
    /// went with it, or `None` when the session is unknown.
    pub fn delete_session(&self, id: &str) -> Result<Option<u64>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let digests = tx.execute("DELETE FROM digests WHERE session_id = ?1", [id])?;
            let sessions = tx.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            if sessions == 0 {
                // nothing to commit; dropping the transaction rolls back
                return Ok(None);
            }
            tx.commit()?;
            Ok(Some(digests as u64))
        })
    }

    /// Cheap round-trip used by the health check.
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

fn query_digest(conn: &Connection, column: &str, value: &str) -> Result<Option<DigestRow>> {
    // `column` is one of our own literals, never user input
    let sql = format!("SELECT {DIGEST_COLUMNS} FROM digests WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_digest).optional()?;
    Ok(row)
}

fn map_digest(row: &Row<'_>) -> rusqlite::Result<DigestRow> {
    Ok(DigestRow {
        id: row.get(0)?,
        public_id: row.get(1)?,
        transcript: row.get(2)?,
        summary: row.get(3)?,
        overview: row.get(4)?,
        key_decisions: row.get(5)?,
        action_items: row.get(6)?,
        is_public: row.get(7)?,
        session_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn query_session(conn: &Connection, id: &str) -> Result<Option<SessionRow>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_session).optional()?;
    Ok(row)
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    let digest_count: i64 = row.get(1)?;
    Ok(SessionRow {
        id: row.get(0)?,
        digest_count: digest_count as u64,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_types::models::ActionItem;

    fn content(overview: &str) -> DigestContent {
        DigestContent {
            overview: overview.to_string(),
            key_decisions: vec!["Adopt Rust".to_string()],
            action_items: vec![ActionItem::new("Write the RFC", Some("Ana".to_string()))],
            summary: format!("OVERVIEW:\n{overview}"),
        }
    }

    fn insert(db: &Database, id: &str, public_id: &str) -> DigestRow {
        db.insert_digest(id, public_id, None, "transcript", &content("Planning sync")).unwrap()
    }

    #[test]
    fn insert_and_fetch_by_both_ids() {
        let db = Database::open_in_memory().unwrap();
        let row = insert(&db, "a", "pub-a");

        assert!(row.is_public);
        assert_eq!(row.overview, "Planning sync");
        assert_eq!(row.key_decisions, r#"["Adopt Rust"]"#);
        assert_eq!(row.created_at, row.updated_at);

        assert_eq!(db.get_digest("a").unwrap(), Some(row.clone()));
        assert_eq!(db.get_digest_by_public_id("pub-a").unwrap(), Some(row));
        assert_eq!(db.get_digest("missing").unwrap(), None);
    }

    #[test]
    fn public_id_is_unique() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "a", "shared");
        let dup = db.insert_digest("b", "shared", None, "t", &content("x"));
        assert!(dup.is_err());
        assert_eq!(db.count_digests(None).unwrap(), 1);
    }

    #[test]
    fn list_is_newest_first_with_paging() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            insert(&db, &format!("id-{i}"), &format!("pub-{i}"));
        }

        let ids: Vec<String> = db.list_digests(10, 0, None).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["id-4", "id-3", "id-2", "id-1", "id-0"]);

        let page: Vec<String> = db.list_digests(2, 1, None).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(page, ["id-3", "id-2"]);
    }

    #[test]
    fn visibility_toggle() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "a", "pub-a");

        let row = db.update_visibility("a", false).unwrap().unwrap();
        assert!(!row.is_public);
        assert!(db.update_visibility("missing", true).unwrap().is_none());
    }

    #[test]
    fn replace_content_keeps_identity() {
        let db = Database::open_in_memory().unwrap();
        let before = insert(&db, "a", "pub-a");

        let after = db
            .replace_content("a", "new transcript", &content("Retro"))
            .unwrap()
            .unwrap();
        assert_eq!(after.public_id, before.public_id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.transcript, "new transcript");
        assert_eq!(after.overview, "Retro");

        assert!(db.replace_content("missing", "t", &content("x")).unwrap().is_none());
    }

    #[test]
    fn delete_and_clear() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "a", "pub-a");
        insert(&db, "b", "pub-b");
        insert(&db, "c", "pub-c");

        assert!(db.delete_digest("a").unwrap());
        assert!(!db.delete_digest("a").unwrap());
        assert_eq!(db.count_digests(None).unwrap(), 2);

        assert_eq!(db.clear_digests(None).unwrap(), 2);
        assert_eq!(db.count_digests(None).unwrap(), 0);
        db.ping().unwrap();
    }

    #[test]
    fn sessions_scope_digests() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("s1").unwrap();
        assert_eq!(session.digest_count, 0);
        db.create_session("s2").unwrap();

        db.insert_digest("a", "pub-a", Some("s1"), "t", &content("one")).unwrap();
        db.insert_digest("b", "pub-b", Some("s1"), "t", &content("two")).unwrap();
        db.insert_digest("c", "pub-c", Some("s2"), "t", &content("three")).unwrap();
        db.insert_digest("d", "pub-d", None, "t", &content("loose")).unwrap();

        let ids: Vec<String> = db
            .list_digests(10, 0, Some("s1"))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(db.count_digests(Some("s2")).unwrap(), 1);
        assert_eq!(db.count_digests(None).unwrap(), 4);

        let s1 = db.get_session("s1").unwrap().unwrap();
        assert_eq!(s1.digest_count, 2);
        assert!(s1.updated_at > session.updated_at);

        // s2 received the latest digest
        let order: Vec<String> = db.list_sessions().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(order, ["s2", "s1"]);

        assert_eq!(db.clear_digests(Some("s2")).unwrap(), 1);
        assert_eq!(db.count_digests(None).unwrap(), 3);
    }

    #[test]
    fn unknown_session_is_rejected_on_insert() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_digest("a", "pub-a", Some("ghost"), "t", &content("x")).is_err());
        assert_eq!(db.count_digests(None).unwrap(), 0);
    }

    #[test]
    fn deleting_a_session_takes_its_digests() {
        let db = Database::open_in_memory().unwrap();
        db.create_session("s1").unwrap();
        db.insert_digest("a", "pub-a", Some("s1"), "t", &content("one")).unwrap();
        db.insert_digest("b", "pub-b", None, "t", &content("loose")).unwrap();

        assert_eq!(db.delete_session("s1").unwrap(), Some(1));
        assert_eq!(db.delete_session("s1").unwrap(), None);
        assert!(db.get_session("s1").unwrap().is_none());
        assert_eq!(db.count_digests(None).unwrap(), 1);
    }
}
