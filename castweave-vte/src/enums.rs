/// States of the VT500 escape sequence state machine.
///
/// The set mirrors the DEC ANSI parser described by Paul Flo Williams
/// (<https://vt100.net/emu/dec_ansi_parser>): one ground state, the escape
/// and CSI/DCS collection states, and the string states for OSC and
/// SOS/PM/APC payloads.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    OscString,
    SosPmApcString,
}

/// Actions performed while stepping the state machine.
///
/// `None` marks a transition without an action and is never reported
/// through the [`VtActor`](crate::VtActor) callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    None,
    Ignore,
    Print,
    Execute,
    Clear,
    Collect,
    Param,
    EscDispatch,
    CsiDispatch,
    Hook,
    Put,
    Unhook,
    OscStart,
    OscPut,
    OscEnd,
}
