use std::path::PathBuf;

use crate::hash::{Hash, HashAlgorithm};

/// error type for shardsync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed hash '{input}': {reason}")]
    MalformedHash { input: String, reason: String },

    #[error("invalid {algorithm} digest length: got {actual} bytes")]
    InvalidDigestLength {
        algorithm: HashAlgorithm,
        actual: usize,
    },

    #[error("'{line}' is in an invalid format for a dir list entry")]
    MalformedEntry { line: String },

    #[error("malformed file status: '{text}'")]
    MalformedStatus { text: String },

    #[error("cannot list path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("store not found at {0}")]
    NoStore(PathBuf),

    #[error("store already exists at {0}")]
    StoreExists(PathBuf),

    #[error("object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("corrupt object: hash mismatch for {0}")]
    CorruptObject(Hash),

    #[error("content of {0} changed while it was being stored")]
    ContentChanged(PathBuf),

    #[error("label not found: {0}")]
    LabelNotFound(String),

    #[error("invalid label: {0}")]
    InvalidLabel(String),

    #[error("interrupted while {0}")]
    Interrupted(&'static str),

    #[error("failed reading snapshot at line {line}: {source}")]
    SnapshotRead {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
