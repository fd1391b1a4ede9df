use std::io;

use thiserror::Error;

/// Why a content pack could not be loaded.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid pack id `{0}`")]
    InvalidId(String),

    #[error("pack `{0}` not found")]
    NotFound(String),

    #[error("failed to read pack `{pack_id}`: {source}")]
    Io {
        pack_id: String,
        #[source]
        source: io::Error,
    },

    #[error("pack `{pack_id}` is not valid JSON: {source}")]
    Json {
        pack_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pack `{0}` must be a JSON object")]
    Shape(String),

    #[error("pack `{0}` contains no usable commands")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid timestamp in history: {0}")]
    Timestamp(String),
}

pub type Result<T> = std::result::Result<T, Error>;
