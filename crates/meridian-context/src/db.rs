use rusqlite::{Connection, Result};

/// Initialise the Context Store schema. Safe to call on every startup
/// (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_sessions_table(conn)
}

fn create_sessions_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id     TEXT PRIMARY KEY,
            turns          TEXT NOT NULL,
            variables      TEXT NOT NULL,
            results        TEXT NOT NULL,
            created_files  TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            expires_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_expires_at
            ON sessions(expires_at);",
    )
}
