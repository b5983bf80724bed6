use thiserror::Error;

/// The error taxonomy surfaced to bus callers as `{error:{kind,message}}`
/// (spec §7). Every component-level error converts into one of these
/// variants at the edge; `.code()` is the `kind` string on the wire.
#[derive(Debug, Error)]
pub enum MeridianError {
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("no responders for subject '{subject}'")]
    NoResponders { subject: String },

    #[error("bus session disconnected")]
    Disconnected,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unbound placeholder '{name}' in action {action_id}")]
    UnboundPlaceholder { action_id: String, name: String },

    #[error("ambiguous reference: {0}")]
    AmbiguousReference(String),

    #[error("action requires approval before it can execute")]
    ApprovalRequired,

    #[error("backend busy, retry after {retry_after_ms}ms")]
    ResourceBusy { retry_after_ms: u64 },

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MeridianError {
    /// Short error code string sent to bus callers in the `error.kind` field.
    pub fn code(&self) -> &'static str {
        match self {
            MeridianError::Timeout { .. } => "Timeout",
            MeridianError::NoResponders { .. } => "NoResponders",
            MeridianError::Disconnected => "Disconnected",
            MeridianError::InvalidInput(_) => "InvalidInput",
            MeridianError::UnboundPlaceholder { .. } => "UnboundPlaceholder",
            MeridianError::AmbiguousReference(_) => "AmbiguousReference",
            MeridianError::ApprovalRequired => "ApprovalRequired",
            MeridianError::ResourceBusy { .. } => "ResourceBusy",
            MeridianError::BackendError(_) => "BackendError",
            MeridianError::Cancelled => "Cancelled",
            MeridianError::Config(_) => "ConfigError",
            MeridianError::Database(_) => "DatabaseError",
            MeridianError::Serialization(_) => "SerializationError",
            MeridianError::Io(_) => "IoError",
            MeridianError::Internal(_) => "InternalError",
        }
    }

    /// Whether a bus caller should retry this error once (idempotent ops
    /// only — spec §7 propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, MeridianError::Timeout { .. })
    }

    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape {
            kind: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Wire shape of `{error: {kind, message}}` (spec §7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorShape {
    pub kind: String,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, MeridianError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec_taxonomy_names() {
        assert_eq!(MeridianError::Disconnected.code(), "Disconnected");
        assert_eq!(
            MeridianError::UnboundPlaceholder {
                action_id: "a1".into(),
                name: "x".into()
            }
            .code(),
            "UnboundPlaceholder"
        );
        assert_eq!(MeridianError::ApprovalRequired.code(), "ApprovalRequired");
    }

    #[test]
    fn only_timeout_is_retryable() {
        assert!(MeridianError::Timeout { ms: 100 }.is_retryable());
        assert!(!MeridianError::Cancelled.is_retryable());
        assert!(!MeridianError::BackendError("x".into()).is_retryable());
    }
}
