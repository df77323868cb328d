//! Logical line assembly under terminal editing controls.
//!
//! Shells redraw the command line aggressively (carriage returns,
//! backspaces, erase and insert sequences), so the printable content of a
//! line only exists after replaying those edits. The builder keeps a
//! sequence of elements and a cursor; SGR sequences are stored as opaque
//! elements in place so later rendering can reopen the right spans at the
//! right column, and all cursor arithmetic steps over them explicitly.

use log::info;

use crate::error::{Error, Result};

/// One element of a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elem {
    /// A printable byte, occupying one terminal column.
    Printable(u8),
    /// An opaque control sequence, occupying no columns.
    Csi {
        private: Option<u8>,
        params: Vec<u8>,
        intermediates: Vec<u8>,
        final_byte: u8,
    },
}

impl Elem {
    fn is_printable(&self) -> bool {
        matches!(self, Self::Printable(_))
    }
}

/// Builds one logical line from printable bytes and editing controls.
///
/// `prefix` marks the element index where the editable region starts;
/// everything before it was written by an earlier builder (the prompt
/// header) and is off-limits to cursor movement and mutation.
#[derive(Debug, Default)]
pub struct LineBuilder {
    elems: Vec<Elem>,
    cursor: usize,
    prefix: usize,
}

impl LineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the current content as the immutable prefix region. The
    /// cursor is parked at the end of the prefix.
    pub fn freeze_prefix(&mut self) {
        self.prefix = self.elems.len();
        self.cursor = self.elems.len();
    }

    /// All elements of the line, prefix included.
    pub fn elems(&self) -> &[Elem] {
        &self.elems
    }

    /// The elements after the frozen prefix.
    pub fn tail(&self) -> &[Elem] {
        &self.elems[self.prefix..]
    }

    /// Number of terminal columns the line occupies; opaque control
    /// sequences do not count.
    pub fn printable_size(&self) -> usize {
        self.elems.iter().filter(|e| e.is_printable()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Clear the line, dropping the prefix as well.
    pub fn reset(&mut self) {
        self.elems.clear();
        self.cursor = 0;
        self.prefix = 0;
    }

    /// Add a printable byte at the cursor, overwriting what is there.
    pub fn print(&mut self, byte: u8) {
        self.skip_opaque_forward();
        if self.cursor < self.elems.len() {
            self.elems[self.cursor] = Elem::Printable(byte);
        } else {
            self.elems.push(Elem::Printable(byte));
        }
        self.cursor += 1;
    }

    /// Handle a C0 control byte. Controls without a line-editing meaning
    /// are discarded.
    pub fn ctrl(&mut self, byte: u8) -> Result<()> {
        match byte {
            // BS
            0x08 => self.step_back(1),
            // TAB is kept as a printable character
            0x09 => self.print(byte),
            // CR
            0x0d => self.cursor = self.prefix,
            // LF terminates the line; keep it so it gets printed.
            0x0a => {
                if self.cursor < self.prefix {
                    return Err(Error::PrefixViolation);
                }
                self.elems.push(Elem::Printable(byte));
                self.cursor = self.elems.len();
            },
            _ => {},
        }
        Ok(())
    }

    /// Handle a control sequence. Editing sequences mutate the line; SGR
    /// is stored opaquely unless `ignore_sgr` is set; everything else is
    /// discarded.
    pub fn csi(
        &mut self,
        private: Option<u8>,
        params: &[u8],
        intermediates: &[u8],
        final_byte: u8,
        ignore_sgr: bool,
    ) -> Result<()> {
        match final_byte {
            // ICH: insert blank characters
            b'@' if intermediates.is_empty() => {
                if self.cursor < self.prefix {
                    return Err(Error::PrefixViolation);
                }
                for _ in 0..param_or(params, 1) {
                    self.elems.insert(self.cursor, Elem::Printable(b' '));
                }
            },
            // CUF: step over opaque elements, pad with spaces past the end
            b'C' => {
                for _ in 0..param_or(params, 1) {
                    self.skip_opaque_forward();
                    if self.cursor >= self.elems.len() {
                        self.elems.push(Elem::Printable(b' '));
                    }
                    self.cursor += 1;
                }
            },
            // CUB
            b'D' => self.step_back(param_or(params, 1)),
            // EL: only erase-to-end is used on command lines
            b'K' => {
                if params.is_empty() || params == b"0" {
                    self.elems.truncate(self.cursor);
                } else {
                    return Err(Error::UnsupportedCsi {
                        params: String::from_utf8_lossy(params).into_owned(),
                        final_byte: final_byte as char,
                    });
                }
            },
            // DCH: delete characters, attributes stay in place
            b'P' => {
                let mut remaining = param_or(params, 1);
                let mut idx = self.cursor;
                while remaining > 0 && idx < self.elems.len() {
                    if self.elems[idx].is_printable() {
                        self.elems.remove(idx);
                        remaining -= 1;
                    } else {
                        idx += 1;
                    }
                }
            },
            // ECH: erase characters in place
            b'X' => {
                let mut remaining = param_or(params, 1);
                let mut idx = self.cursor;
                while remaining > 0 && idx < self.elems.len() {
                    if self.elems[idx].is_printable() {
                        self.elems[idx] = Elem::Printable(b' ');
                        remaining -= 1;
                    }
                    idx += 1;
                }
            },
            b'm' => {
                if ignore_sgr {
                    info!(
                        "discarding SGR on command line: CSI {} m",
                        String::from_utf8_lossy(params)
                    );
                } else {
                    self.insert_csi(private, params, intermediates, final_byte);
                }
            },
            _ => {
                info!(
                    "discarding unused control sequence CSI {} {}",
                    String::from_utf8_lossy(params),
                    final_byte as char
                );
            },
        }
        Ok(())
    }

    fn insert_csi(
        &mut self,
        private: Option<u8>,
        params: &[u8],
        intermediates: &[u8],
        final_byte: u8,
    ) {
        let elem = Elem::Csi {
            private,
            params: params.to_vec(),
            intermediates: intermediates.to_vec(),
            final_byte,
        };
        self.elems.insert(self.cursor.min(self.elems.len()), elem);
        self.cursor += 1;
    }

    /// Move the cursor back over `n` printable positions, never below the
    /// prefix, stepping over opaque elements.
    fn step_back(&mut self, n: usize) {
        for _ in 0..n {
            let mut idx = self.cursor;
            let mut target = None;
            while idx > self.prefix {
                idx -= 1;
                if self.elems[idx].is_printable() {
                    target = Some(idx);
                    break;
                }
            }
            match target {
                Some(idx) => self.cursor = idx,
                None => break,
            }
        }
    }

    fn skip_opaque_forward(&mut self) {
        while self
            .elems
            .get(self.cursor)
            .is_some_and(|e| !e.is_printable())
        {
            self.cursor += 1;
        }
    }
}

fn param_or(params: &[u8], default: usize) -> usize {
    if params.is_empty() {
        return default;
    }
    std::str::from_utf8(params)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &LineBuilder) -> Vec<u8> {
        line.elems()
            .iter()
            .filter_map(|e| match e {
                Elem::Printable(b) => Some(*b),
                Elem::Csi { .. } => None,
            })
            .collect()
    }

    fn type_str(line: &mut LineBuilder, s: &[u8]) {
        for &b in s {
            line.print(b);
        }
    }

    #[test]
    fn printing_appends_and_overwrites() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"hello");
        line.ctrl(0x0d).unwrap();
        type_str(&mut line, b"J");
        assert_eq!(text(&line), b"Jello");
    }

    #[test]
    fn cr_print_twice_is_idempotent() {
        let mut once = LineBuilder::new();
        type_str(&mut once, b"abc");
        once.ctrl(0x0d).unwrap();
        type_str(&mut once, b"xy");

        let mut twice = LineBuilder::new();
        type_str(&mut twice, b"abc");
        twice.ctrl(0x0d).unwrap();
        type_str(&mut twice, b"xy");
        twice.ctrl(0x0d).unwrap();
        type_str(&mut twice, b"xy");

        assert_eq!(text(&once), text(&twice));
        assert_eq!(text(&once), b"xyc");
    }

    #[test]
    fn backspace_stops_at_prefix() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"$ ");
        line.freeze_prefix();
        type_str(&mut line, b"x");
        line.ctrl(0x08).unwrap();
        line.ctrl(0x08).unwrap();
        line.ctrl(0x08).unwrap();
        type_str(&mut line, b"y");
        assert_eq!(text(&line), b"$ y");
    }

    #[test]
    fn cr_returns_to_prefix_not_column_zero() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"$ ");
        line.freeze_prefix();
        type_str(&mut line, b"old");
        line.ctrl(0x0d).unwrap();
        type_str(&mut line, b"new");
        assert_eq!(text(&line), b"$ new");
    }

    #[test]
    fn insert_blank_inserts_spaces() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"ac");
        line.ctrl(0x08).unwrap();
        line.csi(None, b"2", b"", b'@', true).unwrap();
        assert_eq!(text(&line), b"a  c");
    }

    #[test]
    fn cursor_forward_pads_with_spaces() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"a");
        line.csi(None, b"3", b"", b'C', true).unwrap();
        type_str(&mut line, b"b");
        assert_eq!(text(&line), b"a   b");
    }

    #[test]
    fn cursor_movement_steps_over_opaque_csi() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"ab");
        line.csi(None, b"1", b"", b'm', false).unwrap();
        type_str(&mut line, b"cd");
        // back over d, c (the SGR element does not count as a column)
        line.csi(None, b"2", b"", b'D', true).unwrap();
        type_str(&mut line, b"C");
        assert_eq!(text(&line), b"abCd");
        assert_eq!(line.printable_size(), 4);
    }

    #[test]
    fn erase_to_end_truncates() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"abcdef");
        line.ctrl(0x0d).unwrap();
        line.csi(None, b"", b"", b'C', true).unwrap();
        line.csi(None, b"", b"", b'C', true).unwrap();
        line.csi(None, b"", b"", b'K', true).unwrap();
        assert_eq!(text(&line), b"ab");
    }

    #[test]
    fn erase_with_other_params_is_unsupported() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"abc");
        let err = line.csi(None, b"2", b"", b'K', true).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCsi { .. }));
    }

    #[test]
    fn delete_character_removes_at_cursor() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"abcd");
        line.ctrl(0x0d).unwrap();
        line.csi(None, b"2", b"", b'P', true).unwrap();
        assert_eq!(text(&line), b"cd");
    }

    #[test]
    fn erase_character_blanks_in_place() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"abcd");
        line.ctrl(0x0d).unwrap();
        line.csi(None, b"2", b"", b'X', true).unwrap();
        assert_eq!(text(&line), b"  cd");
    }

    #[test]
    fn tab_counts_as_printable() {
        let mut line = LineBuilder::new();
        line.ctrl(0x09).unwrap();
        type_str(&mut line, b"x");
        assert_eq!(text(&line), b"\tx");
        assert_eq!(line.printable_size(), 2);
    }

    #[test]
    fn printable_size_ignores_opaque_elements() {
        let mut line = LineBuilder::new();
        type_str(&mut line, b"ab");
        line.csi(None, b"31", b"", b'm', false).unwrap();
        type_str(&mut line, b"cd");
        assert_eq!(line.printable_size(), 4);
        assert_eq!(line.elems().len(), 5);
    }
}
