use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown event kind: {0}")]
    UnknownKind(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;

impl From<TimelineError> for meridian_core::error::MeridianError {
    fn from(e: TimelineError) -> Self {
        match e {
            TimelineError::Database(e) => meridian_core::error::MeridianError::Database(e.to_string()),
            TimelineError::Serialization(e) => meridian_core::error::MeridianError::Serialization(e),
            TimelineError::UnknownKind(k) => meridian_core::error::MeridianError::InvalidInput(k),
        }
    }
}
