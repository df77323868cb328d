//! Callbacks invoked by the VT500 parser.
//!
//! The [`Parser`](crate::Parser) walks a byte stream and translates it into
//! the actions of the DEC ANSI state machine. Those actions are handed to a
//! [`VtActor`] implementation, which is free to build lines, detect session
//! boundaries, or write formatted output. All methods have empty default
//! implementations so a consumer only overrides the callbacks it cares
//! about. Layered consumers wrap an inner actor, inspect each event and
//! forward it, rather than replacing the parser's handler slots.

/// Consumer-facing interface for the parser's dispatched actions.
///
/// `private` is the private marker byte (0x3C–0x3F) collected before the
/// parameters, if any. `params` is the raw parameter string: digits and
/// semicolon separators exactly as they appeared in the input. Splitting
/// and integer conversion are left to the consumer, which keeps default
/// (omitted) parameters distinguishable from explicit zeros.
pub trait VtActor {
    /// A printable byte. GR bytes (0xA0..=0xFF) arrive here unchanged.
    fn print(&mut self, _byte: u8) {}

    /// A C0 or C1 control function to execute immediately.
    fn execute(&mut self, _byte: u8) {}

    /// Final byte of an escape sequence.
    fn esc_dispatch(&mut self, _intermediates: &[u8], _byte: u8) {}

    /// Final byte of a control sequence (CSI).
    fn csi_dispatch(
        &mut self,
        _private: Option<u8>,
        _params: &[u8],
        _intermediates: &[u8],
        _byte: u8,
    ) {}

    /// Final byte in the first part of a device control string; selects the
    /// handler for the following `put` calls.
    fn hook(
        &mut self,
        _private: Option<u8>,
        _params: &[u8],
        _intermediates: &[u8],
        _byte: u8,
    ) {}

    /// One byte of the device control string payload.
    fn put(&mut self, _byte: u8) {}

    /// The device control string was terminated.
    fn unhook(&mut self) {}

    /// An operating system command string begins.
    fn osc_start(&mut self) {}

    /// One byte of the operating system command payload.
    fn osc_put(&mut self, _byte: u8) {}

    /// The operating system command was terminated; `osc` is the buffered
    /// payload, truncated if it exceeded the safety bound.
    fn osc_end(&mut self, _osc: &[u8]) {}
}
