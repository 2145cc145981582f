//! Error type shared by the workflow core and the store.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised by workflow operations and persistence.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("cannot {event} {entity} {id} while it is {from}")]
    InvalidTransition {
        entity: &'static str,
        id: u64,
        from: String,
        event: &'static str,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no active session; log in first")]
    NotLoggedIn,

    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkflowError::NotFound { entity, id: id.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        WorkflowError::ValidationFailed(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        WorkflowError::PermissionDenied(msg.into())
    }

    /// Domain errors are for the caller to present; storage faults are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkflowError::Storage { .. } | WorkflowError::Corrupt { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = WorkflowError::InvalidTransition {
            entity: "report",
            id: 7,
            from: "forwarded".into(),
            event: "forward",
        };
        assert_eq!(e.to_string(), "cannot forward report 7 while it is forwarded");
        assert_eq!(WorkflowError::not_found("task", 3).to_string(), "task 3 not found");
    }

    #[test]
    fn test_recoverable() {
        assert!(WorkflowError::InvalidCredentials.is_recoverable());
        assert!(WorkflowError::validation("x").is_recoverable());
        let io = WorkflowError::Storage {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        };
        assert!(!io.is_recoverable());
    }
}
