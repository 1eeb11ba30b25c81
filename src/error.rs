// Copyright (c) 2026 rezky_nightky

use std::path::PathBuf;

use thiserror::Error;

/// Host-side failures. The engine itself never produces one of these: bad
/// configuration values and missing images are recovered where they occur.
#[derive(Debug, Error)]
pub enum Error {
    #[error("terminal i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("render worker is no longer running")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, Error>;
