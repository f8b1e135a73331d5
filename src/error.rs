//! Typed errors for the library surface.
//!
//! Only two conditions abort an analysis: a missing or unreadable source
//! root, and a store that cannot be opened. Everything else (bad files,
//! unresolved calls, cycles) is recorded and skipped.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::MemberId;

/// Fatal analysis failures.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("source root does not exist: {0}")]
    SourceRootMissing(PathBuf),

    #[error("source root is not readable: {path}: {source}")]
    SourceRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("analysis cancelled")]
    Cancelled,
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Query failures. An empty result is not an error.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown member id {0}")]
    UnknownMember(MemberId),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}
