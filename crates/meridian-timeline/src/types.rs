use serde::{Deserialize, Serialize};

/// The four event kinds the Timeline Store persists (spec §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Command,
    File,
    AppFocus,
    SystemSnapshot,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Command => "command",
            EventKind::File => "file",
            EventKind::AppFocus => "app_focus",
            EventKind::SystemSnapshot => "system_snapshot",
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            EventKind::Command => "command_events",
            EventKind::File => "file_events",
            EventKind::AppFocus => "focus_events",
            EventKind::SystemSnapshot => "snapshot_events",
        }
    }

    pub fn all() -> [EventKind; 4] {
        [
            EventKind::Command,
            EventKind::File,
            EventKind::AppFocus,
            EventKind::SystemSnapshot,
        ]
    }
}

impl std::str::FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "command" => Ok(EventKind::Command),
            "file" => Ok(EventKind::File),
            "app_focus" => Ok(EventKind::AppFocus),
            "system_snapshot" => Ok(EventKind::SystemSnapshot),
            _ => Err(()),
        }
    }
}

/// One immutable row in the Timeline Store. `data` carries the kind-specific
/// fields (§3: CommandEvent/FileEvent/AppFocusEvent/SystemSnapshotEvent) as a
/// JSON object so every kind's table shares the exact same Rust shape; the
/// table split is purely a storage/retention concern, not a type concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub kind: EventKind,
    pub producer: String,
    pub data: serde_json::Value,
}

impl TimelineEvent {
    pub fn new(kind: EventKind, producer: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            timestamp: chrono::Utc::now(),
            kind,
            producer: producer.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub kind: Option<EventKind>,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub until: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<usize>,
}
