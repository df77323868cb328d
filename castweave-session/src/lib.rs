mod actor;
mod detector;
mod vim;

pub use actor::{SessionActor, VimSessionProps};
pub use castweave_vte as vte;
pub use detector::{SessionConfig, SessionParser};
pub use vim::VimBoundaryDetector;
