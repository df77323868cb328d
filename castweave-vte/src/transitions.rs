//! Transition table of the VT500 state machine.
//!
//! Each function in this module covers one parser state: given an input byte
//! it returns the action to perform and, when the byte causes a transition,
//! the state to enter. A rule of `(action, None)` runs the action without
//! leaving the current state; `(action, Some(state))` additionally runs the
//! exit action of the old state and the entry action of the new one. Bytes
//! without a rule bubble up as [`Error::UnmappedInput`](crate::Error).
//!
//! GR bytes (0xA0..=0xFF) take the transition of their GL counterpart
//! (byte − 0x80); the aliasing applies to the table lookup only, actions
//! always receive the original byte.

use crate::enums::{Action, State};

pub(crate) type Rule = (Action, Option<State>);

/// Transitions that apply in every state: CAN/SUB, ESC and the C1 controls.
#[inline(always)]
const fn anywhere(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x18 | 0x1a | 0x80..=0x8f | 0x91..=0x97 | 0x99 | 0x9a => {
            Some((Execute, Some(Ground)))
        },
        0x9c => Some((None, Some(Ground))),
        0x1b => Some((None, Some(Escape))),
        0x98 | 0x9e | 0x9f => Some((None, Some(SosPmApcString))),
        0x90 => Some((None, Some(DcsEntry))),
        0x9b => Some((None, Some(CsiEntry))),
        0x9d => Some((None, Some(OscString))),
        _ => Option::None,
    }
}

/// Ground state printing GL data and executing C0 controls.
#[inline(always)]
const fn ground(byte: u8) -> Option<Rule> {
    use Action::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x20..=0x7f => Some((Print, Option::None)),
        _ => anywhere(byte),
    }
}

/// ESC seen, waiting for the byte that selects the sequence family.
#[inline(always)]
const fn escape(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x7f => Some((Ignore, Option::None)),
        0x20..=0x2f => Some((Collect, Some(EscapeIntermediate))),
        0x30..=0x4f | 0x51..=0x57 | 0x59 | 0x5a | 0x5c | 0x60..=0x7e => {
            Some((EscDispatch, Some(Ground)))
        },
        0x50 => Some((None, Some(DcsEntry))),
        0x58 | 0x5e | 0x5f => Some((None, Some(SosPmApcString))),
        0x5b => Some((None, Some(CsiEntry))),
        0x5d => Some((None, Some(OscString))),
        _ => anywhere(byte),
    }
}

/// Escape sequence with intermediate bytes collected before dispatch.
#[inline(always)]
const fn escape_intermediate(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x20..=0x2f => Some((Collect, Option::None)),
        0x7f => Some((Ignore, Option::None)),
        0x30..=0x7e => Some((EscDispatch, Some(Ground))),
        _ => anywhere(byte),
    }
}

/// CSI entry point routing parameter, intermediate and final bytes.
#[inline(always)]
const fn csi_entry(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x7f => Some((Ignore, Option::None)),
        0x20..=0x2f => Some((Collect, Some(CsiIntermediate))),
        0x30..=0x39 | 0x3b => Some((Param, Some(CsiParam))),
        0x3c..=0x3f => Some((Collect, Some(CsiParam))),
        0x3a => Some((None, Some(CsiIgnore))),
        0x40..=0x7e => Some((CsiDispatch, Some(Ground))),
        _ => anywhere(byte),
    }
}

/// CSI parameter collection of digits and semicolon separators.
#[inline(always)]
const fn csi_param(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x30..=0x39 | 0x3b => Some((Param, Option::None)),
        0x7f => Some((Ignore, Option::None)),
        0x3a | 0x3c..=0x3f => Some((None, Some(CsiIgnore))),
        0x20..=0x2f => Some((Collect, Some(CsiIntermediate))),
        0x40..=0x7e => Some((CsiDispatch, Some(Ground))),
        _ => anywhere(byte),
    }
}

/// CSI intermediate bytes before the final byte arrives.
#[inline(always)]
const fn csi_intermediate(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x20..=0x2f => Some((Collect, Option::None)),
        0x7f => Some((Ignore, Option::None)),
        0x30..=0x3f => Some((None, Some(CsiIgnore))),
        0x40..=0x7e => Some((CsiDispatch, Some(Ground))),
        _ => anywhere(byte),
    }
}

/// Malformed CSI, swallowing everything up to the final byte.
#[inline(always)]
const fn csi_ignore(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f => Some((Execute, Option::None)),
        0x20..=0x3f | 0x7f => Some((Ignore, Option::None)),
        0x40..=0x7e => Some((None, Some(Ground))),
        _ => anywhere(byte),
    }
}

/// DCS entry point; C0 controls are ignored inside device control strings.
#[inline(always)]
const fn dcs_entry(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f | 0x7f => {
            Some((Ignore, Option::None))
        },
        0x20..=0x2f => Some((Collect, Some(DcsIntermediate))),
        0x30..=0x39 | 0x3b => Some((Param, Some(DcsParam))),
        0x3c..=0x3f => Some((Collect, Some(DcsParam))),
        0x3a => Some((None, Some(DcsIgnore))),
        0x40..=0x7e => Some((None, Some(DcsPassthrough))),
        _ => anywhere(byte),
    }
}

/// DCS parameter collection, the DCS counterpart of `csi_param`.
#[inline(always)]
const fn dcs_param(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f | 0x7f => {
            Some((Ignore, Option::None))
        },
        0x30..=0x39 | 0x3b => Some((Param, Option::None)),
        0x3a | 0x3c..=0x3f => Some((None, Some(DcsIgnore))),
        0x20..=0x2f => Some((Collect, Some(DcsIntermediate))),
        0x40..=0x7e => Some((None, Some(DcsPassthrough))),
        _ => anywhere(byte),
    }
}

/// DCS intermediate bytes before passthrough starts.
#[inline(always)]
const fn dcs_intermediate(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f | 0x7f => {
            Some((Ignore, Option::None))
        },
        0x20..=0x2f => Some((Collect, Option::None)),
        0x30..=0x3f => Some((None, Some(DcsIgnore))),
        0x40..=0x7e => Some((None, Some(DcsPassthrough))),
        _ => anywhere(byte),
    }
}

/// DCS payload forwarded byte by byte to the hooked handler.
#[inline(always)]
const fn dcs_passthrough(byte: u8) -> Option<Rule> {
    use Action::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f | 0x20..=0x7e => {
            Some((Put, Option::None))
        },
        0x7f => Some((Ignore, Option::None)),
        _ => anywhere(byte),
    }
}

/// Malformed DCS, swallowed until the string terminator.
#[inline(always)]
const fn dcs_ignore(byte: u8) -> Option<Rule> {
    use Action::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f | 0x20..=0x7f => {
            Some((Ignore, Option::None))
        },
        _ => anywhere(byte),
    }
}

/// OSC payload collection until BEL or ST.
///
/// Accepting BEL as a terminator follows XTerm and deviates from the
/// original VT500 diagram.
#[inline(always)]
const fn osc_string(byte: u8) -> Option<Rule> {
    use Action::*;
    use State::*;

    match byte {
        0x00..=0x06 | 0x08..=0x17 | 0x19 | 0x1c..=0x1f => {
            Some((Ignore, Option::None))
        },
        0x07 => Some((None, Some(Ground))),
        0x20..=0x7f => Some((OscPut, Option::None)),
        _ => anywhere(byte),
    }
}

/// SOS/PM/APC strings are consumed without any effect.
#[inline(always)]
const fn sos_pm_apc_string(byte: u8) -> Option<Rule> {
    use Action::*;

    match byte {
        0x00..=0x17 | 0x19 | 0x1c..=0x1f | 0x20..=0x7f => {
            Some((Ignore, Option::None))
        },
        _ => anywhere(byte),
    }
}

/// Action run when a state is entered, before the next byte is read.
#[inline(always)]
pub(crate) const fn entry_action(state: State) -> Action {
    use Action::*;
    use State::*;

    match state {
        Escape | CsiEntry | DcsEntry => Clear,
        DcsPassthrough => Hook,
        OscString => OscStart,
        _ => None,
    }
}

/// Action run when a state is left, used to finalize string buffers.
#[inline(always)]
pub(crate) const fn exit_action(state: State) -> Action {
    use Action::*;
    use State::*;

    match state {
        DcsPassthrough => Unhook,
        OscString => OscEnd,
        _ => None,
    }
}

/// Look up the rule for `byte` in `state`, with GR bytes aliased to GL.
#[inline(always)]
pub(crate) const fn transit(state: State, byte: u8) -> Option<Rule> {
    use State::*;

    let byte = if byte >= 0xa0 { byte - 0x80 } else { byte };

    match state {
        Ground => ground(byte),
        Escape => escape(byte),
        EscapeIntermediate => escape_intermediate(byte),
        CsiEntry => csi_entry(byte),
        CsiParam => csi_param(byte),
        CsiIntermediate => csi_intermediate(byte),
        CsiIgnore => csi_ignore(byte),
        DcsEntry => dcs_entry(byte),
        DcsParam => dcs_param(byte),
        DcsIntermediate => dcs_intermediate(byte),
        DcsPassthrough => dcs_passthrough(byte),
        DcsIgnore => dcs_ignore(byte),
        OscString => osc_string(byte),
        SosPmApcString => sos_pm_apc_string(byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Action, State};

    #[test]
    fn every_byte_is_mapped_in_every_state() {
        let states = [
            State::Ground,
            State::Escape,
            State::EscapeIntermediate,
            State::CsiEntry,
            State::CsiParam,
            State::CsiIntermediate,
            State::CsiIgnore,
            State::DcsEntry,
            State::DcsParam,
            State::DcsIntermediate,
            State::DcsPassthrough,
            State::DcsIgnore,
            State::OscString,
            State::SosPmApcString,
        ];

        for state in states {
            for byte in 0u8..=0xff {
                assert!(
                    transit(state, byte).is_some(),
                    "byte 0x{byte:02x} unmapped in {state:?}"
                );
            }
        }
    }

    #[test]
    fn gr_bytes_alias_to_gl() {
        for byte in 0xa0u8..=0xff {
            assert_eq!(
                transit(State::Ground, byte),
                transit(State::Ground, byte - 0x80)
            );
        }
    }

    #[test]
    fn esc_enters_escape_from_any_state() {
        assert_eq!(
            transit(State::OscString, 0x1b),
            Some((Action::None, Some(State::Escape)))
        );
        assert_eq!(
            transit(State::DcsPassthrough, 0x1b),
            Some((Action::None, Some(State::Escape)))
        );
    }

    #[test]
    fn osc_terminates_on_bel() {
        assert_eq!(
            transit(State::OscString, 0x07),
            Some((Action::None, Some(State::Ground)))
        );
    }
}
