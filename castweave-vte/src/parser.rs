use log::warn;

use crate::actor::VtActor;
use crate::enums::{Action, State};
use crate::error::{Error, Result};
use crate::stats::Stats;
use crate::transitions;

/// Safety bound for buffered OSC strings. Anything longer is truncated
/// with a warning instead of growing without limit.
const MAX_OSC_LEN: usize = 4096;

/// Collected pieces of the sequence currently being parsed.
///
/// Reset by the `clear` action on entry to the escape, CSI-entry and
/// DCS-entry states.
#[derive(Debug, Default)]
struct Context {
    private: Option<u8>,
    intermediates: Vec<u8>,
    params: Vec<u8>,
}

impl Context {
    fn clear(&mut self) {
        self.private = None;
        self.intermediates.clear();
        self.params.clear();
    }

    /// Key used for the sequence statistics, e.g. `Esc[0;1m` or `EscPq`.
    fn sequence_key(&self, introducer: &str, final_byte: u8) -> String {
        let mut key = String::from(introducer);
        if let Some(p) = self.private {
            key.push(p as char);
        }
        key.push_str(&String::from_utf8_lossy(&self.params));
        key.push_str(&String::from_utf8_lossy(&self.intermediates));
        key.push(final_byte as char);
        key
    }
}

/// Byte-driven implementation of the VT500 escape sequence state machine.
///
/// Events are reported to a [`VtActor`] as they are recognised; the parser
/// itself only owns the collection buffers and the statistics. Modeled
/// after <https://vt100.net/emu/dec_ansi_parser>.
#[derive(Default)]
pub struct Parser {
    state: State,
    ctx: Context,
    osc: Vec<u8>,
    osc_truncated: bool,
    dcs: Vec<u8>,
    stats: Stats,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the machine.
    ///
    /// After a finite input this is [`State::Ground`] exactly when every
    /// escape, CSI, DCS and OSC sequence was properly terminated.
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Statistics collected since construction.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Advance the parser with a chunk of bytes.
    pub fn advance<A: VtActor>(
        &mut self,
        bytes: &[u8],
        actor: &mut A,
    ) -> Result<()> {
        for &byte in bytes {
            self.input(byte, actor)?;
        }
        Ok(())
    }

    /// Process a single input byte.
    pub fn input<A: VtActor>(&mut self, byte: u8, actor: &mut A) -> Result<()> {
        let Some((action, next)) = transitions::transit(self.state, byte)
        else {
            return Err(Error::UnmappedInput {
                byte,
                state: self.state,
            });
        };

        match next {
            Some(next) => {
                self.perform(transitions::exit_action(self.state), byte, actor);
                self.perform(action, byte, actor);
                self.state = next;
                self.stats.state_entered(next);
                self.perform(transitions::entry_action(next), byte, actor);
            },
            None => self.perform(action, byte, actor),
        }

        Ok(())
    }

    fn perform<A: VtActor>(&mut self, action: Action, byte: u8, actor: &mut A) {
        use Action::*;

        if action == None {
            return;
        }
        self.stats.action_performed(action);

        match action {
            None | Ignore => {},
            Print => actor.print(byte),
            Execute => {
                self.stats.control_executed(byte);
                actor.execute(byte);
            },
            Clear => self.ctx.clear(),
            Collect => {
                // Private markers (0x3C-0x3F) are kept apart from the
                // intermediates so CSI consumers can tell `CSI ? 1 h`
                // from `CSI 1 h`.
                if (0x3c..=0x3f).contains(&byte) {
                    self.ctx.private = Some(byte);
                } else {
                    self.ctx.intermediates.push(byte);
                }
            },
            Param => self.ctx.params.push(byte),
            EscDispatch => {
                self.stats
                    .escape_sequence(self.ctx.sequence_key("Esc", byte));
                actor.esc_dispatch(&self.ctx.intermediates, byte);
            },
            CsiDispatch => {
                self.stats
                    .control_sequence(self.ctx.sequence_key("Esc[", byte));
                actor.csi_dispatch(
                    self.ctx.private,
                    &self.ctx.params,
                    &self.ctx.intermediates,
                    byte,
                );
            },
            Hook => {
                self.dcs.clear();
                self.stats
                    .device_control_function(self.ctx.sequence_key("EscP", byte));
                actor.hook(
                    self.ctx.private,
                    &self.ctx.params,
                    &self.ctx.intermediates,
                    byte,
                );
            },
            Put => {
                self.dcs.push(byte);
                actor.put(byte);
            },
            Unhook => {
                self.stats.device_control_string(&self.dcs);
                actor.unhook();
            },
            OscStart => {
                self.osc.clear();
                self.osc_truncated = false;
                actor.osc_start();
            },
            OscPut => {
                if self.osc.len() < MAX_OSC_LEN {
                    self.osc.push(byte);
                    actor.osc_put(byte);
                } else if !self.osc_truncated {
                    self.osc_truncated = true;
                    warn!(
                        "OSC string exceeds {MAX_OSC_LEN} bytes, truncating"
                    );
                }
            },
            OscEnd => {
                self.stats.os_command(&self.osc);
                actor.osc_end(&self.osc);
            },
        }
    }
}
