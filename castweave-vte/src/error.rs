use thiserror::Error;

use crate::enums::State;

/// Errors originating from the state machine itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no transition mapped for input 0x{byte:02x} in state {state:?}")]
    UnmappedInput { byte: u8, state: State },
}

/// Convenient result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
