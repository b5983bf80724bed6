//! `meridian-timeline` — append-only event log with per-kind retention and
//! the collectors that feed it.
//!
//! # Overview
//!
//! Four event kinds (command, file, app_focus, system_snapshot) are stored
//! in their own SQLite table sharing a common header. [`store::TimelineStore`]
//! owns the connection; [`collectors`] contains the producers that append
//! to it (`SnapshotCollector`, `FilesystemCollector`, `CommandIngress`).

pub mod collectors;
pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, TimelineError};
pub use store::{RetentionConfig, TimelineStore};
pub use types::{EventKind, QueryFilter, TimelineEvent};
