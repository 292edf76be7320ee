//! Error types for the Gateway API Operator

use thiserror::Error;

/// Result type for the operator
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the operator
#[derive(Debug, Error)]
pub enum Error {
    /// Object does not exist
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    /// Object with the same key already exists
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: String, name: String },

    /// Stale resource version on update
    #[error("conflict writing {kind} {name:?}: {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    /// Stored data could not be decoded
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Data could not be encoded
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Kubernetes API error
    #[error("Kubernetes API error during {operation}: {source}")]
    Kube {
        operation: String,
        #[source]
        source: kube::Error,
    },

    /// Backend unavailable
    #[error("transport error: {0}")]
    Transport(String),

    /// The pass was cancelled before it finished
    #[error("reconciliation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A sub-controller could not be started
    #[error("failed to start {controller} controller: {message}")]
    ControllerStart { controller: String, message: String },

    /// Another error annotated with the operation that produced it
    #[error("failed to {action}: {source}")]
    Context {
        action: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Wrap this error with the action that was being attempted
    pub fn during(self, action: impl Into<String>) -> Self {
        Self::Context {
            action: action.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`Error::Context`] wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.root(), Error::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Error::Conflict { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }
}
