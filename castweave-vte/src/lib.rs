mod actor;
mod enums;
mod error;
mod parser;
mod stats;
mod transitions;

pub use actor::VtActor;
pub use enums::{Action, State};
pub use error::{Error, Result};
pub use parser::Parser;
pub use stats::Stats;
