//! Byte patterns that bracket an editor session in a terminal capture.
//!
//! Vim can be entered directly or spawned by git, so the detector watches
//! the output stream instead of the typed command. On startup vim probes
//! the terminal (scroll region, cursor position, window labels); those
//! probes are distinctive enough to serve as start markers. The patterns
//! are heuristics over raw bytes and are kept in one place with named
//! sub-patterns so they can be tested against captured vectors.

use memchr::memmem;
use regex::bytes::{Regex, RegexBuilder};

use crate::actor::VimSessionProps;

/// Git prints this while it waits for the spawned editor to exit.
const HINT_MARKER: &[u8] = b"hint: Waiting for your editor";

/// Window-label probe: `CSI 22;0;0 t` (push title) followed by
/// `CSI 22;2 t CSI 22;1 t`, with the scroll-region height optionally set
/// in between.
const WINDOW_LABEL: &str = r"\x1b\[22;0;0t(?:.*?\x1b\[[0-9]+;(?P<height>[0-9]+)r)?.*?\x1b\[22;2t\x1b\[22;1t";

/// Cursor probe: scroll region setup, optionally the edited file name on
/// the status row, then the glyph test at row 2 with a cursor position
/// query.
const CURSOR_QUERY: &str = r#"\x1b\[[0-9];(?P<height>[0-9]+)r(?:.*\x1b\[[0-9]+;[0-9]+H"(?P<file>[^"]+)")?.*\x1b\[2;1H\xE2\x96\xBD\x1b\[6n\x1b\[2;1H  "#;

/// `CSI 23;0;0 t` pops the window title back when vim exits.
const END_TITLE: &str = r"\x1b\[23;0;0t";

/// Cursor-key mode reset plus keypad-normal, vim's teardown tail.
const END_MODES: &str = r"\x1b\[\?1l\x1b>";

/// How many trailing bytes of a line are considered when testing whether
/// the line *ends* with an editor teardown sequence.
const END_TAIL_LEN: usize = 70;

/// Recognises editor session boundaries in single lines of terminal data.
pub struct VimBoundaryDetector {
    window_label: Regex,
    cursor_query: Regex,
    end_title: Regex,
    end_modes: Regex,
}

impl Default for VimBoundaryDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl VimBoundaryDetector {
    #[must_use]
    pub fn new() -> Self {
        let compile = |pattern| {
            RegexBuilder::new(pattern)
                .unicode(false)
                .dot_matches_new_line(true)
                .build()
                .expect("vim boundary pattern must compile")
        };

        Self {
            window_label: compile(WINDOW_LABEL),
            cursor_query: compile(CURSOR_QUERY),
            end_title: compile(END_TITLE),
            end_modes: compile(END_MODES),
        }
    }

    /// Check a line for any of the editor start markers.
    pub fn find_start(&self, line: &[u8]) -> Option<VimSessionProps> {
        if memmem::find(line, HINT_MARKER).is_some() {
            return Some(VimSessionProps::default());
        }

        // The glyph probe contains 0x96; cheap gate before the regexes run.
        if memchr::memchr(0x96, line).is_some() {
            if let Some(caps) = self.cursor_query.captures(line) {
                return Some(VimSessionProps {
                    height: caps
                        .name("height")
                        .and_then(|m| parse_u16(m.as_bytes())),
                    file: caps.name("file").map(|m| m.as_bytes().to_vec()),
                });
            }
        }

        if let Some(caps) = self.window_label.captures(line) {
            return Some(VimSessionProps {
                height: caps
                    .name("height")
                    .and_then(|m| parse_u16(m.as_bytes())),
                file: None,
            });
        }

        None
    }

    /// Offset of the editor-wait hint within `line`, if present.
    pub fn hint_offset(&self, line: &[u8]) -> Option<usize> {
        memmem::find(line, HINT_MARKER)
    }

    /// True if an editor teardown sequence occurs anywhere in `line`.
    ///
    /// Used by the frame pipeline, where the teardown may sit in the middle
    /// of a frame payload.
    pub fn ends_within(&self, line: &[u8]) -> bool {
        self.end_title.is_match(line) || self.end_modes.is_match(line)
    }

    /// True if `line` ends with an editor teardown sequence, judged on the
    /// last [`END_TAIL_LEN`] bytes.
    pub fn ends_at_tail(&self, line: &[u8]) -> bool {
        let tail = &line[line.len().saturating_sub(END_TAIL_LEN)..];
        self.ends_within(tail)
    }
}

fn parse_u16(digits: &[u8]) -> Option<u16> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> VimBoundaryDetector {
        VimBoundaryDetector::new()
    }

    #[test]
    fn hint_marker_starts_a_session() {
        let line = b"hint: Waiting for your editor to close the file...\n";
        let props = detector().find_start(line).unwrap();
        assert_eq!(props, VimSessionProps::default());
        assert_eq!(detector().hint_offset(line), Some(0));
    }

    #[test]
    fn window_label_sequence_with_height() {
        let line =
            b"\x1b[22;0;0t\x1b[1;48r\x1b[?12h\x1b[22;2t\x1b[22;1t rest";
        let props = detector().find_start(line).unwrap();
        assert_eq!(props.height, Some(48));
        assert_eq!(props.file, None);
    }

    #[test]
    fn window_label_sequence_without_height() {
        let line = b"\x1b[22;0;0t\x1b[22;2t\x1b[22;1t";
        let props = detector().find_start(line).unwrap();
        assert_eq!(props.height, None);
    }

    #[test]
    fn cursor_query_with_file_name() {
        let line: Vec<u8> = [
            b"\x1b[1;49r\x1b[0m\x1b[49;1H\"notes.txt\" 12L, 340B".as_ref(),
            b"\x1b[2;1H\xe2\x96\xbd\x1b[6n\x1b[2;1H  ".as_ref(),
        ]
        .concat();
        let props = detector().find_start(&line).unwrap();
        assert_eq!(props.height, Some(49));
        assert_eq!(props.file.as_deref(), Some(b"notes.txt".as_ref()));
    }

    #[test]
    fn cursor_query_without_file_name() {
        let line =
            b"\x1b[1;38r\x1b[2;1H\xe2\x96\xbd\x1b[6n\x1b[2;1H  ".to_vec();
        let props = detector().find_start(&line).unwrap();
        assert_eq!(props.height, Some(38));
        assert_eq!(props.file, None);
    }

    #[test]
    fn plain_output_is_not_a_session_start() {
        assert!(detector().find_start(b"compiling 14 crates\n").is_none());
        assert!(
            detector()
                .find_start(b"\x1b[22;0;0t title push only")
                .is_none()
        );
    }

    #[test]
    fn teardown_patterns_match() {
        let det = detector();
        assert!(det.ends_within(b"...\x1b[23;0;0t\x1b[?1004l"));
        assert!(det.ends_within(b"...\x1b[?1l\x1b>..."));
        assert!(!det.ends_within(b"\x1b[?1h\x1b="));
    }

    #[test]
    fn tail_check_ignores_early_teardown() {
        let mut line = b"\x1b[?1l\x1b>".to_vec();
        line.extend(std::iter::repeat_n(b'x', 200));
        let det = detector();
        assert!(det.ends_within(&line));
        assert!(!det.ends_at_tail(&line));
    }
}
