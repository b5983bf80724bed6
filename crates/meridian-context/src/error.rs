use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ContextError> for meridian_core::error::MeridianError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::Database(e) => meridian_core::error::MeridianError::Database(e.to_string()),
            ContextError::Serialization(e) => meridian_core::error::MeridianError::Serialization(e),
        }
    }
}
