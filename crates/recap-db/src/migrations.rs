use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (digests)");
        conn.execute_batch(
            "
            CREATE TABLE digests (
                id              TEXT PRIMARY KEY,
                public_id       TEXT NOT NULL UNIQUE,
                transcript      TEXT NOT NULL,
                summary         TEXT NOT NULL DEFAULT '',
                overview        TEXT NOT NULL DEFAULT '',
                key_decisions   TEXT NOT NULL DEFAULT '[]',
                action_items    TEXT NOT NULL DEFAULT '[]',
                is_public       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_digests_created
                ON digests(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (sessions)");
        conn.execute_batch(
            "
            CREATE TABLE sessions (
                id              TEXT PRIMARY KEY,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            ALTER TABLE digests ADD COLUMN session_id TEXT REFERENCES sessions(id);

            CREATE INDEX idx_digests_session
                ON digests(session_id, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn v1_databases_gain_sessions() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL);
             CREATE TABLE digests (
                 id TEXT PRIMARY KEY, public_id TEXT NOT NULL UNIQUE, transcript TEXT NOT NULL,
                 summary TEXT NOT NULL DEFAULT '', overview TEXT NOT NULL DEFAULT '',
                 key_decisions TEXT NOT NULL DEFAULT '[]', action_items TEXT NOT NULL DEFAULT '[]',
                 is_public INTEGER NOT NULL DEFAULT 1, created_at TEXT NOT NULL, updated_at TEXT NOT NULL
             );
             INSERT INTO schema_version (version) VALUES (1);
             INSERT INTO digests (id, public_id, transcript, created_at, updated_at)
                 VALUES ('old', 'pub-old', 't', '2026-01-01', '2026-01-01');",
        )
        .unwrap();

        run(&conn).unwrap();

        let session: Option<String> = conn
            .query_row("SELECT session_id FROM digests WHERE id = 'old'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(session, None);
        let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0)).unwrap();
        assert_eq!(sessions, 0);
    }
}
