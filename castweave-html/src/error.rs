use std::io;

use thiserror::Error;

/// Errors originating from the rendering pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("select graphic rendition code {0} is not implemented")]
    UnsupportedSgr(u16),

    #[error("control sequence CSI {params} {final_byte} is not implemented")]
    UnsupportedCsi { params: String, final_byte: char },

    #[error("line edit touched the frozen prompt prefix")]
    PrefixViolation,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Convenient result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
