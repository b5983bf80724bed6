use rusqlite::Connection;

use crate::error::Result;
use crate::types::EventKind;

/// Initialise the Timeline Store schema: four tables sharing the header
/// `(event_id, timestamp, event_type)` plus a `producer`/`data` pair that
/// carries each kind's specific fields as JSON (spec §6 on-disk layout).
pub fn init_db(conn: &Connection) -> Result<()> {
    for kind in EventKind::all() {
        create_event_table(conn, kind)?;
    }
    Ok(())
}

fn create_event_table(conn: &Connection, kind: EventKind) -> Result<()> {
    let table = kind.table_name();
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            event_id    TEXT PRIMARY KEY,
            timestamp   TEXT NOT NULL,
            event_type  TEXT NOT NULL,
            producer    TEXT NOT NULL,
            data        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table}(timestamp);"
    ))?;
    Ok(())
}
