use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failure of a single call against the ledger provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger call timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned an error: {message}")]
    Rpc { message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Reserve reads never default to zero; every failure is one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("reserve read failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("malformed reserves for {token_in}/{token_out}: {reason}")]
    Malformed {
        token_in: String,
        token_out: String,
        reason: String,
    },

    #[error("pool has no reserves for {token_in}/{token_out}")]
    UnknownPair { token_in: String, token_out: String },
}

/// Event polling failures. The caller keeps its cursor on any of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("event query failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("malformed event page: {0}")]
    Malformed(String),
}

/// Failure of a single response submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("response submission failed: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("startup failed: {0}")]
    Startup(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Io(std::io::Error::other(err.to_string()))
    }
}
