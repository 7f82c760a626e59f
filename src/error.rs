//! Error families. Input defects never reach here: the sanitizer resolves them to defaults.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be read, parsed, or validated. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("rules file not found: {0}")]
    RulesMissing(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Anomaly model failures. At startup these are fatal; per event they fail closed.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model returned a non-finite decision value")]
    NonFinite,
}

/// Audit persistence failures. Never fatal to the caller of the pipeline.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("corrupt audit row: {0}")]
    Corrupt(String),

    #[error("audit store lock poisoned")]
    Poisoned,

    #[error("audit secret not set (expected in ${0})")]
    MissingSecret(String),
}

/// Anything that prevents the agent from starting to serve events.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
