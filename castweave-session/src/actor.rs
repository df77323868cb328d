//! Session-level events layered on top of the raw parser callbacks.

use castweave_vte::VtActor;

/// Properties captured from a recognised editor start sequence.
///
/// Both fields are best-effort: the window-label and cursor-query patterns
/// carry a height (and sometimes a file name), the editor-wait hint carries
/// neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VimSessionProps {
    /// Terminal height the editor reconfigured, in rows.
    pub height: Option<u16>,
    /// Name of the file being edited, as raw bytes from the capture.
    pub file: Option<Vec<u8>>,
}

/// Consumer interface for the session detector.
///
/// Implementations receive the raw [`VtActor`] stream plus the boundary
/// events recognised by the [`SessionParser`](crate::SessionParser). The
/// detector guarantees the ordering `prompt_start` → `prompt_active` →
/// `prompt_end` within a command block, and emits `vim_end` before
/// `prompt_start` whenever a prompt shows up while an editor session is
/// still open.
pub trait SessionActor: VtActor {
    /// A shell prompt header was recognised; a new command block begins.
    fn prompt_start(&mut self) {}

    /// The `$` delimiter was reached; command-line editing starts here.
    fn prompt_active(&mut self) {}

    /// The command line is complete.
    fn prompt_end(&mut self) {}

    /// An editor session begins.
    fn vim_start(&mut self, _props: &VimSessionProps) {}

    /// The editor session is over.
    fn vim_end(&mut self) {}
}
