//! Event consumer that turns the parsed session stream into HTML.
//!
//! The renderer owns two line builders: `term_line` accumulates normal
//! output until a linefeed flushes it into the document, `command_line`
//! replays the shell's line editing between `prompt_active` and
//! `prompt_end`. Editor session output is discarded here; the frame
//! pipeline hands the captured sub-recording over just before `vim_end`.
//!
//! Callbacks cannot return errors, so the first fatal error is stashed
//! and surfaced through [`HtmlRenderer::check`], which the input loop
//! calls after every line.

use std::io::Write;

use log::info;

use castweave_session::{SessionActor, VimSessionProps};
use castweave_vte::VtActor;

use crate::document::{DocumentConfig, HtmlDocument, PlayerSession};
use crate::error::{Error, Result};
use crate::line::{Elem, LineBuilder};

pub struct HtmlRenderer<W: Write> {
    doc: HtmlDocument<W>,
    command_line: LineBuilder,
    term_line: LineBuilder,
    in_prompt: bool,
    in_vim: bool,
    prompt_count: u32,
    pending_session: Option<PlayerSession>,
    error: Option<Error>,
}

impl<W: Write> HtmlRenderer<W> {
    pub fn new(out: W, config: DocumentConfig) -> Result<Self> {
        Ok(Self {
            doc: HtmlDocument::new(out, config)?,
            command_line: LineBuilder::new(),
            term_line: LineBuilder::new(),
            in_prompt: false,
            in_vim: false,
            prompt_count: 0,
            pending_session: None,
            error: None,
        })
    }

    /// Timestamp of the frame currently being fed, for review mode.
    pub fn set_frame_ts(&mut self, ts: f64) {
        self.doc.set_frame_ts(ts);
    }

    /// Number of command blocks started so far.
    pub fn command_count(&self) -> u32 {
        self.prompt_count
    }

    /// Hand over a finalized editor sub-recording; it is embedded when
    /// the matching `vim_end` event arrives.
    pub fn attach_editor_session(&mut self, session: PlayerSession) {
        self.pending_session = Some(session);
    }

    /// Surface the first error raised inside a callback since the last
    /// check. Rendering stops at the first fatal error.
    pub fn check(&mut self) -> Result<()> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Flush pending output and close the document. The document is
    /// returned so the collected editor sessions can be written out.
    pub fn finish(mut self) -> Result<HtmlDocument<W>> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if !self.term_line.is_empty() {
            let line = std::mem::take(&mut self.term_line);
            self.render_elems(line.elems())?;
        }
        self.doc.finish()?;
        Ok(self.doc)
    }

    fn render_elems(&mut self, elems: &[Elem]) -> Result<()> {
        for elem in elems {
            match elem {
                Elem::Printable(byte) => self.doc.write_byte(*byte)?,
                Elem::Csi {
                    private,
                    params,
                    intermediates,
                    final_byte,
                } => self.doc.convert_csi(
                    *private,
                    params,
                    intermediates,
                    *final_byte,
                )?,
            }
        }
        Ok(())
    }

    fn flush_term_line(&mut self) {
        let line = std::mem::take(&mut self.term_line);
        let result = self.render_elems(line.elems());
        self.stash(result);
    }

    fn stash(&mut self, result: Result<()>) {
        if let Err(err) = result {
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }

    #[cfg(test)]
    fn open_span_count(&self) -> usize {
        self.doc.open_span_count()
    }
}

impl<W: Write> VtActor for HtmlRenderer<W> {
    fn print(&mut self, byte: u8) {
        if self.error.is_some() || self.in_vim {
            return;
        }
        if self.in_prompt {
            self.command_line.print(byte);
        } else {
            self.term_line.print(byte);
        }
    }

    fn execute(&mut self, byte: u8) {
        if self.error.is_some() || self.in_vim {
            return;
        }
        if self.in_prompt {
            let result = self.command_line.ctrl(byte);
            self.stash(result);
            return;
        }

        let result = self.term_line.ctrl(byte);
        self.stash(result);
        if byte == 0x0a {
            self.flush_term_line();
        }
    }

    fn csi_dispatch(
        &mut self,
        private: Option<u8>,
        params: &[u8],
        intermediates: &[u8],
        byte: u8,
    ) {
        if self.error.is_some() || self.in_vim {
            return;
        }

        // Sequences that would trigger terminal responses: nobody is
        // listening anymore, drop them.
        if byte == b'n' || (byte == b'c' && (params.is_empty() || params == b"0"))
        {
            info!("discarding device status CSI {}", byte as char);
            return;
        }

        let result = if self.in_prompt {
            self.command_line
                .csi(private, params, intermediates, byte, true)
        } else {
            self.term_line
                .csi(private, params, intermediates, byte, false)
        };
        self.stash(result);
    }
}

impl<W: Write> SessionActor for HtmlRenderer<W> {
    fn prompt_start(&mut self) {
        if self.error.is_some() {
            return;
        }
        self.prompt_count += 1;
        let count = self.prompt_count;
        let result = self.doc.new_cmd_row(count);
        self.stash(result);
    }

    fn prompt_active(&mut self) {
        if self.error.is_some() {
            return;
        }
        // The buffered line is the prompt header; flush it, then freeze
        // its length as the immutable prefix of the command line.
        let mut prefix = std::mem::take(&mut self.term_line);
        let result = self.render_elems(prefix.elems());
        self.stash(result);
        prefix.freeze_prefix();
        self.command_line = prefix;
        self.in_prompt = true;
    }

    fn prompt_end(&mut self) {
        if self.error.is_some() {
            return;
        }
        let cmd = std::mem::take(&mut self.command_line);
        let result = self.render_elems(cmd.tail());
        self.stash(result);
        self.in_prompt = false;
    }

    fn vim_start(&mut self, _props: &VimSessionProps) {
        self.in_vim = true;
    }

    fn vim_end(&mut self) {
        if self.error.is_some() {
            return;
        }
        self.in_vim = false;
        let session = self.pending_session.take();
        let result = self.doc.vim_session(session.as_ref());
        self.stash(result);
    }
}
