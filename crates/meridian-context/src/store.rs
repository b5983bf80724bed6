use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use meridian_core::types::Context;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::ContextError;

/// Context Store (spec §4.2): `load`/`save`/`reset` keyed by session id,
/// SQLite-backed, TTL-refreshed on every save. Unlike `skynet-memory`'s
/// `MemoryManager`, this store keeps no in-memory cache — the ownership
/// contract (one in-flight message per session within a process) requires
/// the store itself to be the single source of truth between messages, so
/// every `load`/`save` goes straight to SQLite.
pub struct ContextStore {
    db: Mutex<Connection>,
    ttl: Duration,
}

impl ContextStore {
    pub fn new(conn: Connection, ttl_hours: i64) -> Result<Self, ContextError> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            ttl: Duration::hours(ttl_hours),
        })
    }

    /// Load a session's context. A missing key returns an empty `Context`,
    /// not an error (spec §4.2) — every session starts implicitly empty.
    pub fn load(&self, session_id: &str) -> Result<Context, ContextError> {
        let db = self.db.lock().unwrap();
        let row: Option<(String, String, String, String)> = db
            .query_row(
                "SELECT turns, variables, results, created_files FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((turns, variables, results, created_files)) = row else {
            debug!(session_id, "no stored context, returning empty");
            return Ok(Context::default());
        };

        Ok(Context {
            turns: serde_json::from_str(&turns)?,
            variables: serde_json::from_str(&variables)?,
            results: serde_json::from_str(&results)?,
            created_files: serde_json::from_str(&created_files)?,
        })
    }

    /// Persist a session's context and refresh its TTL from now.
    pub fn save(&self, session_id: &str, ctx: &Context) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        let now = Utc::now();
        let expires_at = now + self.ttl;

        db.execute(
            "INSERT INTO sessions (session_id, turns, variables, results, created_files, updated_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(session_id) DO UPDATE SET
                turns = excluded.turns,
                variables = excluded.variables,
                results = excluded.results,
                created_files = excluded.created_files,
                updated_at = excluded.updated_at,
                expires_at = excluded.expires_at",
            params![
                session_id,
                serde_json::to_string(&ctx.turns)?,
                serde_json::to_string(&ctx.variables)?,
                serde_json::to_string(&ctx.results)?,
                serde_json::to_string(&ctx.created_files)?,
                now.to_rfc3339(),
                expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Drop a session's stored context entirely.
    pub fn reset(&self, session_id: &str) -> Result<(), ContextError> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        Ok(())
    }

    /// Delete sessions whose TTL has elapsed. Not required by the live
    /// request path; a caller may run this periodically to bound table size.
    pub fn sweep_expired(&self) -> Result<usize, ContextError> {
        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let deleted = db.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;
        Ok(deleted)
    }

    #[allow(dead_code)]
    fn expires_at_for(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::types::Role;

    fn store() -> ContextStore {
        ContextStore::new(Connection::open_in_memory().unwrap(), 24).unwrap()
    }

    #[test]
    fn load_missing_session_returns_empty_context() {
        let store = store();
        let ctx = store.load("alice@desk:cli").unwrap();
        assert!(ctx.turns.is_empty());
        assert!(ctx.variables.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = store();
        let mut ctx = Context::default();
        ctx.push_turn(Role::User, "open pictures");
        ctx.set_var("target_dir", serde_json::json!("Pictures"));

        store.save("alice@desk:cli", &ctx).unwrap();
        let loaded = store.load("alice@desk:cli").unwrap();

        assert_eq!(loaded.turns.len(), 1);
        assert_eq!(loaded.get_var_str("target_dir"), Some("Pictures".to_string()));
    }

    #[test]
    fn reset_clears_stored_context() {
        let store = store();
        let mut ctx = Context::default();
        ctx.push_turn(Role::User, "hello");
        store.save("bob@desk:overlay", &ctx).unwrap();

        store.reset("bob@desk:overlay").unwrap();
        let loaded = store.load("bob@desk:overlay").unwrap();
        assert!(loaded.turns.is_empty());
    }

    #[test]
    fn sweep_expired_removes_only_past_ttl_rows() {
        let store = ContextStore::new(Connection::open_in_memory().unwrap(), -1).unwrap();
        let ctx = Context::default();
        store.save("expired@desk:cli", &ctx).unwrap();

        let deleted = store.sweep_expired().unwrap();
        assert_eq!(deleted, 1);
        assert!(store.load("expired@desk:cli").unwrap().turns.is_empty());
    }
}
