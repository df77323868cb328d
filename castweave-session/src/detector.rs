//! Prompt and editor boundary detection layered over the VT500 parser.
//!
//! The [`SessionParser`] feeds terminal data line by line into the raw
//! parser while running a second, orthogonal state machine over the same
//! bytes. Prompts are found via the window-title OSC that shells emit
//! right before the prompt header; editor sessions via the probe patterns
//! in [`VimBoundaryDetector`]. The detector inspects every dispatched
//! event before forwarding it to the wrapped [`SessionActor`], so the
//! consumer sees the full parser stream plus the boundary events.

use log::{info, warn};
use regex::bytes::{Regex, RegexBuilder};

use castweave_vte::{Parser, Result, Stats, VtActor};

use crate::actor::{SessionActor, VimSessionProps};
use crate::vim::VimBoundaryDetector;

/// Default prompt-header shape: `user@host <env> <cwd>`, each piece
/// optionally wrapped in SGR coloring. A custom pattern must keep the
/// `cwd` capture group; the anchored start makes offset matching explicit.
const DEFAULT_PROMPT_HEADER: &str = r"\A(?:\x1b\[[0-9;]+m)?[-\w.]+@[-\w.]+ (?:\x1b\[[0-9;]+m)?\S+(?:\x1b\[[0-9;]+m)? (?:\x1b\[[0-9;]+m)?(?P<cwd>[-.\w/ ~]+)";

/// Configuration of the session detector.
pub struct SessionConfig {
    prompt_header: Regex,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::with_prompt_pattern(DEFAULT_PROMPT_HEADER)
            .expect("default prompt pattern must compile")
    }
}

impl SessionConfig {
    /// Use a custom prompt-header pattern. The pattern is matched against
    /// raw bytes at an explicit offset and must expose a `cwd` capture
    /// group for the window-title cross-check.
    pub fn with_prompt_pattern(
        pattern: &str,
    ) -> std::result::Result<Self, regex::Error> {
        let prompt_header = RegexBuilder::new(pattern)
            .unicode(false)
            .dot_matches_new_line(false)
            .build()?;
        Ok(Self { prompt_header })
    }
}

/// Detector state, orthogonal to the parser's own state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlpState {
    Normal,
    /// A window-title OSC was seen; the prompt header should follow.
    PromptOsc,
    /// The prompt header matched; waiting for the `$` delimiter.
    PromptImminent,
    /// Inside the prompt, accumulating the command line.
    Prompt,
    /// Inside an editor session. `ended` is set once a teardown pattern
    /// has been seen; the `vim_end` event fires at the next line boundary
    /// (or immediately, when a window-title OSC preempts it).
    VimSession { ended: bool },
}

struct Core {
    state: TlpState,
    prompt_header: Regex,
    vim: VimBoundaryDetector,
    last_osc: Vec<u8>,
    /// Byte offset of the most recent `CSI ? 1 l` in the current line.
    cursor_app_reset_at: Option<usize>,
    /// Byte offset of the most recent `ESC >` in the current line.
    keypad_normal_at: Option<usize>,
}

/// Line-driven session parser.
///
/// Lines are delimited by `0x0A` on the input side; the caller reads one
/// line at a time and hands it over together with the actor that consumes
/// the events.
pub struct SessionParser {
    vt: Parser,
    core: Core,
}

impl Default for SessionParser {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionParser {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            vt: Parser::new(),
            core: Core {
                state: TlpState::Normal,
                prompt_header: config.prompt_header,
                vim: VimBoundaryDetector::new(),
                last_osc: Vec::new(),
                cursor_app_reset_at: None,
                keypad_normal_at: None,
            },
        }
    }

    /// Parse one line of terminal data, forwarding parser events and
    /// emitting boundary events on `actor`.
    pub fn parse_line<A: SessionActor>(
        &mut self,
        line: &[u8],
        actor: &mut A,
    ) -> Result<()> {
        let Self { vt, core } = self;

        core.cursor_app_reset_at = None;
        core.keypad_normal_at = None;
        core.begin_line(line, actor);

        for (pos, &byte) in line.iter().enumerate() {
            core.before_byte(line, pos, byte, actor);
            let mut hooked = Hooked {
                core: &mut *core,
                actor: &mut *actor,
                line,
                pos,
            };
            vt.input(byte, &mut hooked)?;
        }

        Ok(())
    }

    /// Close any boundary that is still open at end of input.
    pub fn finish<A: SessionActor>(&mut self, actor: &mut A) {
        match self.core.state {
            TlpState::Prompt => actor.prompt_end(),
            TlpState::VimSession { .. } => actor.vim_end(),
            _ => {},
        }
        self.core.enter(TlpState::Normal);
    }

    /// Statistics collected by the underlying parser.
    pub fn stats(&self) -> &Stats {
        self.vt.stats()
    }

    /// State of the underlying VT500 parser.
    pub fn vt_state(&self) -> castweave_vte::State {
        self.vt.state()
    }
}

impl Core {
    fn enter(&mut self, state: TlpState) {
        if self.state != state {
            info!("entering session state {state:?}");
        }
        self.state = state;
    }

    /// Whole-line checks that run before any byte reaches the parser.
    fn begin_line<A: SessionActor>(&mut self, line: &[u8], actor: &mut A) {
        match self.state {
            TlpState::PromptOsc => self.try_prompt_header(line, 0, actor),
            TlpState::Prompt => {
                actor.prompt_end();
                self.enter(TlpState::Normal);
            },
            TlpState::VimSession { ended: true } => {
                actor.vim_end();
                self.enter(TlpState::Normal);
            },
            TlpState::VimSession { ended: false } => {
                if self.vim.ends_at_tail(line) {
                    self.enter(TlpState::VimSession { ended: true });
                }
            },
            _ => {},
        }

        if !matches!(self.state, TlpState::VimSession { .. }) {
            if let Some(props) = self.vim.find_start(line) {
                actor.vim_start(&props);
                let ended = self.vim.ends_at_tail(line);
                self.enter(TlpState::VimSession { ended });
            }
        }
    }

    /// Per-byte checks that run before the byte reaches the parser.
    fn before_byte<A: SessionActor>(
        &mut self,
        line: &[u8],
        pos: usize,
        byte: u8,
        actor: &mut A,
    ) {
        match self.state {
            // An inline prompt directly after the title OSC is common, so
            // the header is re-tried at every offset of the line.
            TlpState::PromptOsc if pos > 0 => {
                self.try_prompt_header(line, pos, actor);
            },
            TlpState::PromptImminent if byte == b'$' => {
                actor.prompt_active();
                self.enter(TlpState::Prompt);
            },
            _ => {},
        }
    }

    /// Match the prompt header at `offset` and cross-check the captured
    /// cwd against the tail of the last window title.
    fn try_prompt_header<A: SessionActor>(
        &mut self,
        line: &[u8],
        offset: usize,
        actor: &mut A,
    ) {
        let Some(caps) = self.prompt_header.captures(&line[offset..]) else {
            return;
        };
        let Some(cwd) = caps.name("cwd") else {
            warn!("prompt pattern matched but has no cwd capture");
            return;
        };

        let cwd = trim_trailing_spaces(cwd.as_bytes());
        if cwd == b"~" || self.last_osc.ends_with(cwd) {
            actor.prompt_start();
            self.enter(TlpState::PromptImminent);
        } else {
            // Not an error: the next window title resets the candidate.
            warn!(
                "prompt header matched but cwd {:?} is not the window title tail",
                String::from_utf8_lossy(cwd)
            );
        }
    }

    fn observe_esc<A: SessionActor>(
        &mut self,
        line: &[u8],
        pos: usize,
        byte: u8,
        actor: &mut A,
    ) {
        match byte {
            // DECPAM: entering keypad application mode invalidates any
            // pending exit pair.
            b'=' => {
                self.cursor_app_reset_at = None;
                self.keypad_normal_at = None;
            },
            // DECPNM
            b'>' => {
                self.keypad_normal_at = Some(pos);
                self.check_app_mode_exit(line, pos, actor);
            },
            _ => {},
        }
    }

    fn observe_csi<A: SessionActor>(
        &mut self,
        line: &[u8],
        pos: usize,
        private: Option<u8>,
        params: &[u8],
        byte: u8,
        actor: &mut A,
    ) {
        if private == Some(b'?') && params == b"1" {
            match byte {
                b'h' => self.cursor_app_reset_at = None,
                b'l' => self.cursor_app_reset_at = Some(pos),
                _ => {},
            }
        } else if private.is_none() && params == b"23;0;0" && byte == b't' {
            self.vim_end_mid_line(line, pos, actor);
        }
    }

    /// Full-screen applications leave cursor-key and keypad application
    /// mode back to back on exit. When that pair is followed by something
    /// that looks like a prompt header, treat it as a prompt candidate
    /// even without a window-title OSC.
    fn check_app_mode_exit<A: SessionActor>(
        &mut self,
        line: &[u8],
        pos: usize,
        actor: &mut A,
    ) {
        let (Some(reset), Some(normal)) =
            (self.cursor_app_reset_at, self.keypad_normal_at)
        else {
            return;
        };
        // `CSI ? 1 l` final byte, ESC, `>`: exactly two bytes apart.
        if normal != reset + 2 || self.state != TlpState::Normal {
            return;
        }

        let offset = pos + 1;
        if offset >= line.len() {
            return;
        }
        if self
            .prompt_header
            .captures(&line[offset..])
            .and_then(|caps| caps.name("cwd"))
            .is_some()
        {
            actor.prompt_start();
            self.enter(TlpState::PromptImminent);
        }
    }

    /// The window-title pop arrived inside a line. Either another editor
    /// session follows right away (git chains them) or the session winds
    /// down at the next line boundary.
    fn vim_end_mid_line<A: SessionActor>(
        &mut self,
        line: &[u8],
        pos: usize,
        actor: &mut A,
    ) {
        if !matches!(self.state, TlpState::VimSession { .. }) {
            return;
        }

        let rest = &line[(pos + 1).min(line.len())..];
        match self.vim.hint_offset(rest) {
            Some(hint) => {
                actor.vim_end();
                actor.vim_start(&VimSessionProps::default());
                let ended = self.vim.ends_within(&rest[hint..]);
                self.enter(TlpState::VimSession { ended });
            },
            None => self.enter(TlpState::VimSession { ended: true }),
        }
    }

    fn observe_osc_end<A: SessionActor>(
        &mut self,
        osc: &[u8],
        actor: &mut A,
    ) {
        self.last_osc.clear();
        self.last_osc.extend_from_slice(osc);

        // OSC 0 sets the window title; shells do that right before the
        // prompt, which makes it the marker that a prompt is coming up.
        if osc.starts_with(b"0;") {
            match self.state {
                TlpState::VimSession { .. } => actor.vim_end(),
                TlpState::Prompt => actor.prompt_end(),
                _ => {},
            }
            self.enter(TlpState::PromptOsc);
        }
    }
}

fn trim_trailing_spaces(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |idx| idx + 1);
    &bytes[..end]
}

/// Adapter that lets the detector observe every parser event before it is
/// forwarded to the consumer.
struct Hooked<'a, A: SessionActor> {
    core: &'a mut Core,
    actor: &'a mut A,
    line: &'a [u8],
    pos: usize,
}

impl<A: SessionActor> VtActor for Hooked<'_, A> {
    fn print(&mut self, byte: u8) {
        self.actor.print(byte);
    }

    fn execute(&mut self, byte: u8) {
        self.actor.execute(byte);
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], byte: u8) {
        self.core.observe_esc(self.line, self.pos, byte, self.actor);
        self.actor.esc_dispatch(intermediates, byte);
    }

    fn csi_dispatch(
        &mut self,
        private: Option<u8>,
        params: &[u8],
        intermediates: &[u8],
        byte: u8,
    ) {
        self.core
            .observe_csi(self.line, self.pos, private, params, byte, self.actor);
        self.actor.csi_dispatch(private, params, intermediates, byte);
    }

    fn hook(
        &mut self,
        private: Option<u8>,
        params: &[u8],
        intermediates: &[u8],
        byte: u8,
    ) {
        self.actor.hook(private, params, intermediates, byte);
    }

    fn put(&mut self, byte: u8) {
        self.actor.put(byte);
    }

    fn unhook(&mut self) {
        self.actor.unhook();
    }

    fn osc_start(&mut self) {
        self.actor.osc_start();
    }

    fn osc_put(&mut self, byte: u8) {
        self.actor.osc_put(byte);
    }

    fn osc_end(&mut self, osc: &[u8]) {
        self.core.observe_osc_end(osc, self.actor);
        self.actor.osc_end(osc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        PromptStart,
        PromptActive,
        PromptEnd,
        VimStart(VimSessionProps),
        VimEnd,
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        printed: Vec<u8>,
    }

    impl VtActor for Recorder {
        fn print(&mut self, byte: u8) {
            self.printed.push(byte);
        }
    }

    impl SessionActor for Recorder {
        fn prompt_start(&mut self) {
            self.events.push(Event::PromptStart);
        }

        fn prompt_active(&mut self) {
            self.events.push(Event::PromptActive);
        }

        fn prompt_end(&mut self) {
            self.events.push(Event::PromptEnd);
        }

        fn vim_start(&mut self, props: &VimSessionProps) {
            self.events.push(Event::VimStart(props.clone()));
        }

        fn vim_end(&mut self) {
            self.events.push(Event::VimEnd);
        }
    }

    fn run(lines: &[&[u8]]) -> Recorder {
        let mut parser = SessionParser::default();
        let mut recorder = Recorder::default();
        for line in lines {
            parser.parse_line(line, &mut recorder).unwrap();
        }
        parser.finish(&mut recorder);
        recorder
    }

    #[test]
    fn detects_inline_prompt_after_title_osc() {
        let recorder = run(&[
            b"\x1b]0;user@host:/tmp\x07user@host MINGW64 /tmp $ ls\r\n"
                as &[u8],
            b"total 0\r\n",
        ]);
        assert_eq!(
            recorder.events,
            vec![Event::PromptStart, Event::PromptActive, Event::PromptEnd]
        );
    }

    #[test]
    fn detects_prompt_spread_over_lines() {
        let recorder = run(&[
            b"\x1b]0;user@host:~\x07\n" as &[u8],
            b"user@host MINGW64 ~\n",
            b"$ git status\n",
            b"On branch main\n",
        ]);
        assert_eq!(
            recorder.events,
            vec![Event::PromptStart, Event::PromptActive, Event::PromptEnd]
        );
    }

    #[test]
    fn cwd_mismatch_keeps_waiting_for_the_next_title() {
        let recorder = run(&[
            b"\x1b]0;user@host:/home/user/work\x07\n" as &[u8],
            b"user@host MINGW64 /somewhere/else\n",
            b"\x1b]0;user@host:/somewhere/else\x07\n",
            b"user@host MINGW64 /somewhere/else\n",
            b"$ true\n",
            b"\n",
        ]);
        assert_eq!(
            recorder.events,
            vec![Event::PromptStart, Event::PromptActive, Event::PromptEnd]
        );
    }

    #[test]
    fn vim_session_brackets_are_emitted() {
        let recorder = run(&[
            b"\x1b[22;0;0t\x1b[1;40r\x1b[22;2t\x1b[22;1tvim body\n" as &[u8],
            b"edit edit edit\n",
            b"ZZ done\x1b[?1l\x1b>\n",
            b"back to shell\n",
        ]);
        assert_eq!(
            recorder.events,
            vec![
                Event::VimStart(VimSessionProps {
                    height: Some(40),
                    file: None,
                }),
                Event::VimEnd,
            ]
        );
    }

    #[test]
    fn vim_end_precedes_prompt_start_on_title_osc() {
        let recorder = run(&[
            b"\x1b[22;0;0t\x1b[22;2t\x1b[22;1tvim starts\n" as &[u8],
            b"\x1b]0;user@host:/tmp\x07user@host MINGW64 /tmp $ exit\n",
            b"\n",
        ]);
        assert_eq!(
            recorder.events,
            vec![
                Event::VimStart(VimSessionProps::default()),
                Event::VimEnd,
                Event::PromptStart,
                Event::PromptActive,
                Event::PromptEnd,
            ]
        );
    }

    #[test]
    fn consecutive_editor_sessions_in_one_line() {
        let mut line = Vec::new();
        line.extend_from_slice(b"hint: Waiting for your editor...");
        line.extend_from_slice(b"editing\x1b[23;0;0t");
        line.extend_from_slice(b"hint: Waiting for your editor again");
        line.push(b'\n');

        let recorder =
            run(&[line.as_slice(), b"still in second session\n"]);
        assert_eq!(
            recorder.events,
            vec![
                Event::VimStart(VimSessionProps::default()),
                Event::VimEnd,
                Event::VimStart(VimSessionProps::default()),
                Event::VimEnd,
            ]
        );
    }

    #[test]
    fn oneline_session_closes_at_next_line() {
        let mut line = Vec::new();
        line.extend_from_slice(b"\x1b[22;0;0t\x1b[22;2t\x1b[22;1t body ");
        line.extend_from_slice(b"\x1b[?1l\x1b>\n");

        let recorder = run(&[line.as_slice(), b"after\n"]);
        assert_eq!(
            recorder.events,
            vec![
                Event::VimStart(VimSessionProps::default()),
                Event::VimEnd,
            ]
        );
    }

    #[test]
    fn output_bytes_are_forwarded() {
        let recorder = run(&[b"plain output\n" as &[u8]]);
        assert_eq!(recorder.printed, b"plain output");
    }
}
