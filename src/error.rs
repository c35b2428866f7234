use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote API returned {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Release tag {tag:?} is not a valid semantic version: {source}")]
    InvalidTag {
        tag: String,
        #[source]
        source: semver::Error,
    },

    #[error("Refusing unsafe asset name {0:?}")]
    UnsafeAssetName(String),

    #[error("Failed to download asset {asset}: {source}")]
    Download {
        asset: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Asset {asset} size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        asset: String,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with {}", exit_description(.code))]
    Transport { program: String, code: Option<i32> },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "termination by signal".to_string(),
    }
}

impl SyncError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
