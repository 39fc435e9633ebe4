use thiserror::Error;

use crate::chain::Step;

pub type Result<T> = std::result::Result<T, HandlerError>;

/// Failures reported by a `ResourceStore`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by API server ({code}): {message}")]
    Rejected { code: u16, message: String },
}

impl StoreError {
    /// Whether the call may succeed if repeated unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => match ae.code {
                409 if ae.reason == "AlreadyExists" => StoreError::AlreadyExists(ae.message),
                409 => StoreError::Conflict(ae.message),
                404 => StoreError::NotFound(ae.message),
                401 | 403 | 429 => StoreError::Transport(ae.message),
                code if code >= 500 => StoreError::Transport(ae.message),
                code => StoreError::Rejected {
                    code,
                    message: ae.message,
                },
            },
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// Failures returned by a `Handler`
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid object {object}: {reason}")]
    InvalidObject { object: String, reason: String },

    #[error("Handler used before init")]
    NotInitialized,

    #[error("Handler already initialized")]
    AlreadyInitialized,

    #[error("Resource store unreachable: {0}")]
    Connectivity(#[source] StoreError),

    #[error("Provisioning {step} for {object} (chain {chain}) failed: {source}")]
    Provision {
        object: String,
        chain: String,
        step: Step,
        #[source]
        source: StoreError,
    },

    #[error("Teardown of {step} for {object} (chain {chain}) failed: {source}")]
    Teardown {
        object: String,
        chain: String,
        step: Step,
        #[source]
        source: StoreError,
    },
}

/// Startup configuration failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
