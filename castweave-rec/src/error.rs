use std::io;

use thiserror::Error;

/// Errors raised while reading and splitting recordings.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input is not an asciinema v2 recording")]
    UnsupportedInputFormat,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] castweave_vte::Error),

    #[error(transparent)]
    Render(#[from] castweave_html::Error),
}

/// Convenient result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
