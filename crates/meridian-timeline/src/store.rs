use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use meridian_bus::Bus;
use rusqlite::{params, Connection};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::db::init_db;
use crate::error::{Result, TimelineError};
use crate::types::{EventKind, QueryFilter, TimelineEvent};

/// Per-kind retention windows (spec §3), expressed in hours for a uniform
/// comparison against `chrono::Duration`.
#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    pub command_hours: i64,
    pub file_hours: i64,
    pub focus_hours: i64,
    pub snapshot_hours: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            command_hours: 30 * 24,
            file_hours: 7 * 24,
            focus_hours: 7 * 24,
            snapshot_hours: 24,
        }
    }
}

impl RetentionConfig {
    fn hours_for(&self, kind: EventKind) -> i64 {
        match kind {
            EventKind::Command => self.command_hours,
            EventKind::File => self.file_hours,
            EventKind::AppFocus => self.focus_hours,
            EventKind::SystemSnapshot => self.snapshot_hours,
        }
    }
}

/// Timeline Store (spec §4.3): append-only per-kind event log with retention
/// sweep and fire-and-forget bus fan-out. Follows the teacher's
/// `db.rs`/engine split: schema lives in `db`, the owning connection and
/// the tick loop live here.
pub struct TimelineStore {
    conn: Mutex<Connection>,
    retention: RetentionConfig,
}

impl TimelineStore {
    pub fn new(conn: Connection, retention: RetentionConfig) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention,
        })
    }

    /// Append an event and, best-effort, publish it on `temporal.event.<kind>`.
    /// Publish failure never fails the append (spec §4.3: at-least-once
    /// storage, best-effort fan-out) — the bus publish happens after the
    /// row commit and its result is only logged.
    pub async fn append(&self, bus: &dyn Bus, event: TimelineEvent) -> Result<()> {
        self.insert(&event)?;

        let subject = format!("temporal.event.{}", event.kind.as_str());
        if let Err(e) = bus.publish(&subject, serde_json::to_value(&event)?).await {
            warn!(event_id = %event.event_id, subject, error = %e, "timeline fan-out publish failed");
        }
        Ok(())
    }

    fn insert(&self, event: &TimelineEvent) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let table = event.kind.table_name();
        conn.execute(
            &format!(
                "INSERT INTO {table} (event_id, timestamp, event_type, producer, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.kind.as_str(),
                event.producer,
                event.data.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Query events, most recent first, optionally filtered by kind/range.
    pub fn query(&self, filter: QueryFilter) -> Result<Vec<TimelineEvent>> {
        let kinds = match filter.kind {
            Some(k) => vec![k],
            None => EventKind::all().to_vec(),
        };

        let conn = self.conn.lock().unwrap();
        let mut all = Vec::new();
        for kind in kinds {
            let table = kind.table_name();
            let mut sql = format!("SELECT event_id, timestamp, event_type, producer, data FROM {table} WHERE 1=1");
            let mut bind: Vec<String> = Vec::new();
            if let Some(since) = filter.since {
                sql.push_str(" AND timestamp >= ?");
                bind.push(since.to_rfc3339());
            }
            if let Some(until) = filter.until {
                sql.push_str(" AND timestamp <= ?");
                bind.push(until.to_rfc3339());
            }
            sql.push_str(" ORDER BY timestamp DESC");

            let mut stmt = conn.prepare(&sql)?;
            let params_ref: Vec<&dyn rusqlite::ToSql> =
                bind.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
            let rows = stmt.query_map(params_ref.as_slice(), row_to_event)?;
            for row in rows {
                all.push(row?);
            }
        }

        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            all.truncate(limit);
        }
        Ok(all)
    }

    /// Delete rows past their kind's retention window. Runs one bounded
    /// `DELETE ... WHERE timestamp < ?` per kind per call — short enough
    /// that SQLite never holds a lock long enough for readers to notice
    /// (spec §9 Open Questions resolution).
    pub fn sweep(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let mut deleted = 0;
        for kind in EventKind::all() {
            let cutoff = Utc::now() - chrono::Duration::hours(self.retention.hours_for(kind));
            let table = kind.table_name();
            deleted += conn.execute(
                &format!("DELETE FROM {table} WHERE timestamp < ?1"),
                params![cutoff.to_rfc3339()],
            )?;
        }
        Ok(deleted)
    }

    /// Run `sweep()` on a fixed interval until `shutdown` signals true,
    /// mirroring the teacher's single-purpose tick loop shape.
    pub async fn run_sweeper(self: Arc<Self>, interval_secs: u64, mut shutdown: watch::Receiver<bool>) {
        info!("timeline sweeper started");
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep() {
                        Ok(n) if n > 0 => info!(deleted = n, "timeline retention sweep"),
                        Ok(_) => {}
                        Err(e) => error!("timeline sweep failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("timeline sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimelineEvent> {
    let event_type: String = row.get(2)?;
    let kind: EventKind = event_type.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(TimelineError::UnknownKind(event_type.clone())),
        )
    })?;
    let data_str: String = row.get(4)?;
    let timestamp_str: String = row.get(1)?;
    Ok(TimelineEvent {
        event_id: row.get(0)?,
        timestamp: chrono::DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        kind,
        producer: row.get(3)?,
        data: serde_json::from_str(&data_str).unwrap_or(serde_json::Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_bus::LoopbackBus;

    fn store() -> TimelineStore {
        TimelineStore::new(Connection::open_in_memory().unwrap(), RetentionConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn append_then_query_returns_newest_first() {
        let store = store();
        let bus = LoopbackBus::new();
        store
            .append(&bus, TimelineEvent::new(EventKind::Command, "shell", serde_json::json!({"cmd": "ls"})))
            .await
            .unwrap();
        store
            .append(&bus, TimelineEvent::new(EventKind::Command, "shell", serde_json::json!({"cmd": "pwd"})))
            .await
            .unwrap();

        let events = store.query(QueryFilter { kind: Some(EventKind::Command), ..Default::default() }).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data["cmd"], "pwd");
    }

    #[tokio::test]
    async fn append_publishes_fire_and_forget_event() {
        let store = store();
        let bus = LoopbackBus::new();
        let mut sub = bus.subscribe("temporal.event.file").await.unwrap();

        store
            .append(&bus, TimelineEvent::new(EventKind::File, "fswatch", serde_json::json!({"path": "/tmp/a"})))
            .await
            .unwrap();

        let msg = sub.next().await.unwrap();
        assert_eq!(msg.subject, "temporal.event.file");
    }

    #[test]
    fn sweep_removes_events_past_retention() {
        let store = TimelineStore::new(
            Connection::open_in_memory().unwrap(),
            RetentionConfig {
                command_hours: 0,
                file_hours: 0,
                focus_hours: 0,
                snapshot_hours: 0,
            },
        )
        .unwrap();

        let mut event = TimelineEvent::new(EventKind::Command, "shell", serde_json::json!({}));
        event.timestamp = Utc::now() - chrono::Duration::hours(1);
        store.insert(&event).unwrap();

        let deleted = store.sweep().unwrap();
        assert_eq!(deleted, 1);
    }
}
