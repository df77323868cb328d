//! The generated HTML document: stylesheet, command rows, span stack and
//! embedded editor session players.
//!
//! All presentation choices live in a per-document [`DocumentConfig`]
//! record handed over at construction; the document owns its output sink
//! and the stack of open spans for its whole lifetime.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;

use crate::error::Result;
use crate::palette::Palette;
use crate::sgr;
use crate::span::{Span, SpanKind};

/// Which asciinema player protocol the embedded sessions target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerVersion {
    /// Custom element with a base64 data URL.
    #[default]
    V2,
    /// Script-initialised player.
    V3,
}

/// Cross-transcript hop links shown next to selected command rows.
#[derive(Debug, Clone, Default)]
pub struct HopLinks {
    /// Identifier of the transcript the links point to.
    pub id: String,
    /// Output file of that transcript, relative to this document.
    pub target_file: String,
    /// Command indices that get a hop link.
    pub hops: BTreeSet<u32>,
    /// Link text: prefix, link label, suffix.
    pub pre: String,
    pub to: String,
    pub post: String,
    /// Review-mode attention hops `(from_ts, to_ts)` in frame time.
    pub rev_hops: Vec<(f64, f64)>,
}

/// Presentation configuration of one document.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub palette: Palette,
    pub dark_bg: bool,
    pub bold_as_bright: bool,
    pub title: Option<String>,
    pub review: bool,
    /// Chapter headings keyed by command index.
    pub chapters: BTreeMap<u32, String>,
    /// Command indices whose output is discarded entirely.
    pub suppress: BTreeSet<u32>,
    pub hopto: Option<HopLinks>,
    pub player: PlayerVersion,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            dark_bg: true,
            bold_as_bright: true,
            title: None,
            review: false,
            chapters: BTreeMap::new(),
            suppress: BTreeSet::new(),
            hopto: None,
            player: PlayerVersion::default(),
        }
    }
}

/// A finalized editor sub-session ready for embedding.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub cols: u32,
    pub rows: u32,
    /// Timestamp of the last frame, used for the poster position.
    pub end_time: f64,
    /// The complete sub-recording, one JSON record per line.
    pub data: String,
}

/// HTML document writer for one converted session.
pub struct HtmlDocument<W: Write> {
    out: W,
    config: DocumentConfig,
    spans: Vec<Span>,
    cmd_number: u32,
    dd_count: u32,
    frame_ts: f64,
    next_rev_hop: usize,
    suppressed: bool,
    row_open: bool,
    sessions: Vec<(String, String)>,
}

impl<W: Write> HtmlDocument<W> {
    pub fn new(out: W, config: DocumentConfig) -> Result<Self> {
        let mut doc = Self {
            out,
            config,
            spans: Vec::new(),
            cmd_number: 0,
            dd_count: 0,
            frame_ts: 0.0,
            next_rev_hop: 0,
            suppressed: false,
            row_open: false,
            sessions: Vec::new(),
        };
        doc.write_intro()?;
        doc.start_cmd_row(0)?;
        Ok(doc)
    }

    /// Frame timestamp of the input currently being rendered; only used
    /// for review-mode annotations.
    pub fn set_frame_ts(&mut self, ts: f64) {
        self.frame_ts = ts;
    }

    pub fn cmd_number(&self) -> u32 {
        self.cmd_number
    }

    /// Write one byte of text content, HTML-escaped.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        match byte {
            b'&' => self.write_str("&amp;"),
            b'<' => self.write_str("&lt;"),
            b'>' => self.write_str("&gt;"),
            b'"' => self.write_str("&quot;"),
            _ => {
                if !self.suppressed {
                    self.out.write_all(&[byte])?;
                }
                Ok(())
            },
        }
    }

    /// Translate a control sequence captured in normal output. Only SGR
    /// has a representation here; everything else is dropped.
    pub fn convert_csi(
        &mut self,
        _private: Option<u8>,
        params: &[u8],
        _intermediates: &[u8],
        final_byte: u8,
    ) -> Result<()> {
        if final_byte == b'm' {
            sgr::perform(self, params)?;
        }
        Ok(())
    }

    /// Begin a new command row: close the previous one, emit review and
    /// hop annotations, chapter heading, and open the row for `count`.
    pub fn new_cmd_row(&mut self, count: u32) -> Result<()> {
        self.end_cmd_row()?;
        self.suppressed = self.config.suppress.contains(&count);

        debug!("beginning command row {count} at frame ts {}", self.frame_ts);

        if self.config.review {
            self.add_review_hop()?;
        }
        self.add_hop_link(count)?;

        if let Some(title) = self.config.chapters.get(&count).cloned() {
            self.write_str(&format!("  <h3 class=\"chapter\">{title}</h3>\n"))?;
        }

        if self.config.review {
            self.write_str(&format!(
                "  <div class=\"review-frame-ts\">{:.6}</div>\n",
                self.frame_ts
            ))?;
        }

        self.start_cmd_row(count)
    }

    /// Embed an editor sub-session as a collapsible player, or a marker
    /// line when no recording is available.
    pub fn vim_session(
        &mut self,
        session: Option<&PlayerSession>,
    ) -> Result<()> {
        if self.suppressed {
            return Ok(());
        }

        self.close_all_spans()?;
        self.write_str("\n</pre>\n")?;
        self.write_str("      <details class=\"vimsession-dropdown\">\n")?;
        self.write_str(
            "        <summary><span class=\"vim-session\">  \
             [==-- Vim editor session --==]</span></summary>\n",
        )?;
        self.write_str("        <div class=\"vimsession-player-wrapper\">\n")?;

        match session {
            Some(session) => {
                let session_id =
                    format!("{}_{}", self.dd_count, self.cmd_number);
                match self.config.player {
                    PlayerVersion::V2 => {
                        self.insert_player_v2(session)?;
                    },
                    PlayerVersion::V3 => {
                        self.insert_player_v3(session, &session_id)?;
                    },
                }
                self.sessions.push((session_id, session.data.clone()));
            },
            None => {
                self.write_str(
                    "          <span class=\"vim-session\">     \
                     [==-- recording unavailable --==]</span>\n",
                )?;
            },
        }

        self.write_str("        </div>\n")?;
        self.write_str("      </details>\n")?;
        self.dd_count += 1;
        self.write_str("<pre>")?;
        Ok(())
    }

    /// Close the document. The embedded sub-sessions stay available via
    /// [`take_sessions`](Self::take_sessions).
    pub fn finish(&mut self) -> Result<()> {
        self.end_cmd_row()?;
        self.out.write_all(b"</body>\n</html>\n")?;
        self.out.flush()?;
        Ok(())
    }

    /// The editor sub-sessions collected while rendering, keyed by
    /// `<ddcount>_<cmdnumber>`.
    pub fn take_sessions(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.sessions)
    }

    /// Consume the document and return its output sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub(crate) fn open_span(&mut self, span: Span) -> Result<()> {
        self.write_str(&span.open_tag())?;
        self.spans.push(span);
        Ok(())
    }

    pub(crate) fn close_all_spans(&mut self) -> Result<()> {
        for _ in 0..self.spans.len() {
            self.write_str("</span>")?;
        }
        self.spans.clear();
        Ok(())
    }

    /// Close the innermost span of `kind`, keeping spans opened after it
    /// by closing them and reopening the survivors in order.
    pub(crate) fn close_one(&mut self, kind: SpanKind) -> Result<()> {
        let Some(idx) = self.spans.iter().rposition(|s| s.kind() == kind)
        else {
            debug!("no open span of kind {kind:?} to close");
            return Ok(());
        };

        for _ in idx..self.spans.len() {
            self.write_str("</span>")?;
        }
        let survivors: Vec<Span> =
            self.spans.drain(idx..).skip(1).collect();
        for span in survivors {
            self.open_span(span)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn open_span_count(&self) -> usize {
        self.spans.len()
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        if !self.suppressed {
            self.out.write_all(s.as_bytes())?;
        }
        Ok(())
    }

    fn start_cmd_row(&mut self, count: u32) -> Result<()> {
        self.cmd_number = count;
        self.write_str(&format!(
            "<div class=\"cmd-row\" id=\"c{count}\">\n<pre>"
        ))?;
        self.row_open = true;
        Ok(())
    }

    fn end_cmd_row(&mut self) -> Result<()> {
        if !self.row_open {
            return Ok(());
        }
        self.close_all_spans()?;
        self.write_str("\n</pre>\n</div>\n")?;
        self.row_open = false;
        Ok(())
    }

    /// In review mode, note where the paired transcript took over.
    fn add_review_hop(&mut self) -> Result<()> {
        let Some(hopto) = &self.config.hopto else {
            return Ok(());
        };
        let Some(&(from_ts, to_ts)) = hopto.rev_hops.get(self.next_rev_hop)
        else {
            return Ok(());
        };
        if from_ts > self.frame_ts {
            return Ok(());
        }

        debug!(
            "at ts {} detected previous jump from {from_ts} to {to_ts}",
            self.frame_ts
        );
        self.next_rev_hop += 1;
        self.write_str(&format!(
            "\n  <div class=\"review-cmd-hop\">\n    before TS {} detected \
             jump to {to_ts}\n  </div>\n\n",
            self.frame_ts
        ))
    }

    fn add_hop_link(&mut self, count: u32) -> Result<()> {
        let Some(hopto) = &self.config.hopto else {
            return Ok(());
        };
        if !hopto.hops.contains(&count) {
            return Ok(());
        }

        let link = format!(
            "  <div class=\"cmd-hop\">{}<a href=\"{}#c{count}\">{}</a>{}</div>\n",
            hopto.pre, hopto.target_file, hopto.to, hopto.post
        );
        self.write_str(&link)
    }

    fn insert_player_v2(&mut self, session: &PlayerSession) -> Result<()> {
        let encoded = BASE64.encode(session.data.as_bytes());
        let poster = poster_time(session.end_time);

        self.write_str("          <div>\n")?;
        self.write_str(&format!(
            "            <asciinema-player idle-time-limit=\"3\" \
             speed=\"1.75\" poster=\"npt:{poster}\" cols=\"{}\" rows=\"{}\" \
             src=\"data:application/json;base64,{encoded}\" />\n",
            session.cols, session.rows
        ))?;
        self.write_str("          </div>\n")?;
        self.write_controls_help()?;

        if self.config.review {
            self.write_str(&format!(
                "          <input class=\"vimsession-dump\" \
                 id=\"ddcheck{0}\" type=\"checkbox\" name=\"asciinema\"/>\n\
                           <label class=\"vimsession-dump\" \
                 for=\"ddcheck{0}\">Show Vim editor session dump</label>\n",
                self.dd_count
            ))?;
            self.write_str("          <pre class=\"vimsession-dump\">\n")?;
            let data = session.data.clone();
            self.write_str(&data)?;
            self.write_str("\n          </pre>\n")?;
        }
        Ok(())
    }

    fn insert_player_v3(
        &mut self,
        session: &PlayerSession,
        session_id: &str,
    ) -> Result<()> {
        let encoded = BASE64.encode(session.data.as_bytes());
        let poster = poster_time(session.end_time);

        self.write_str(&format!(
            "          <div id=\"vimsess_{session_id}\"></div>\n"
        ))?;
        self.write_controls_help()?;

        if self.config.review {
            self.write_str(&format!(
                "          <input class=\"vimsession-dump\" \
                 id=\"ddcheck{0}\" type=\"checkbox\" name=\"asciinema\"/>\n\
                           <label class=\"vimsession-dump\" \
                 for=\"ddcheck{0}\">Show Vim editor session dump</label>\n",
                self.dd_count
            ))?;
            self.write_str(&format!(
                "          <pre class=\"vimsession-dump\" \
                 id=\"vimsess_{session_id}_dump\">\n"
            ))?;
            let data = session.data.clone();
            self.write_str(&data)?;
            self.write_str("\n          </pre>\n")?;
        }

        self.write_str("          <script>\n")?;
        self.write_str(&format!(
            "            AsciinemaPlayer.create('data:text/plain;base64,\
             {encoded}',\n                                   \
             document.getElementById('vimsess_{session_id}'), {{\n\
                                                  cols: {}, rows: {}, \
             fit: false,\n                                      \
             idleTimeLimit: 3, speed: 1.75, poster: 'npt:{poster}'\n\
                                                }});\n",
            session.cols, session.rows
        ))?;
        self.write_str("          </script>\n")?;
        Ok(())
    }

    fn write_controls_help(&mut self) -> Result<()> {
        self.write_str("          <div class=\"controls-help vim-session\">\n")?;
        self.write_str("  Controls:\n")?;
        self.write_str("    space       - play / pause\n")?;
        self.write_str("    &lt; / &gt;       - de- / increase playback speed\n")?;
        self.write_str("    0, 1, ... 9 - jump to 0%, 10%, ... 90%\n")?;
        self.write_str("          </div>\n")?;
        Ok(())
    }

    fn write_intro(&mut self) -> Result<()> {
        let pc = self.config.palette.colors();
        let fw = if self.config.bold_as_bright { "normal" } else { "bold" };
        let (cf9, cb9) = if self.config.dark_bg {
            (pc[7], pc[0])
        } else {
            (pc[0], pc[7])
        };
        let bf9 = match (self.config.bold_as_bright, self.config.dark_bg) {
            (true, true) => pc[15],
            (true, false) => pc[8],
            (false, true) => pc[7],
            (false, false) => pc[0],
        };
        let title = self.config.title.clone().unwrap_or_default();

        let mut head = String::new();
        head.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        head.push_str(
            "<meta http-equiv=\"Content-Type\" content=\"text/html; \
             charset=utf-8\"/>\n",
        );
        head.push_str(&format!("<title>{title}</title>\n"));
        head.push_str("<style type=\"text/css\">\n");
        head.push_str("h1 { text-align: center; color: #f0f5f5; }\n");
        head.push_str("h2 { text-align: center; color: #f0f5f5; }\n");
        head.push_str("h3.chapter { color: #e0e0c0; }\n");
        head.push_str("pre { white-space: pre-wrap; }\n");

        for (i, color) in pc.iter().enumerate().take(8) {
            head.push_str(&format!(
                ".ef{i},.f{i} {{ color: {color}; }} \
                 .eb{i},.b{i} {{ background-color: {color}; }}\n"
            ));
        }
        for (i, color) in pc.iter().enumerate().skip(8) {
            let base = i - 8;
            head.push_str(&format!(
                ".ef{i}, .f{base} > .bold,.bold > .f{base} \
                 {{ color: {color}; font-weight: {fw}; }}\n"
            ));
        }
        for (i, color) in pc.iter().enumerate().skip(8) {
            head.push_str(&format!(
                ".eb{i} {{ background-color: {color}; }}\n"
            ));
        }

        head.push_str(&format!(".f9 {{ color: {cf9}; }}\n"));
        head.push_str(&format!(".b9 {{ background-color: {cb9}; }}\n"));
        head.push_str(&format!(
            ".f9 > .bold,.bold > .f9, body.f9 > pre > .bold {{\n  \
             color: {bf9};\n  font-weight: bold;\n}}\n"
        ));
        head.push_str(&format!(
            ".reverse {{ color: {}; background-color: {}; }}\n",
            pc[0], pc[7]
        ));
        head.push_str(".underline { text-decoration: underline; }\n");
        head.push_str(".line-through { text-decoration: line-through; }\n");
        head.push_str(".blink { text-decoration: blink; }\n");
        head.push_str(".vim-session { color: #9696cc; font-family: monospace; }\n");
        head.push_str(
            ".vimsession-dropdown { position: relative; top: -6ex; \
             margin-bottom: -6ex; }\n\
             .vimsession-dropdown > summary { cursor:pointer; \
             color: #e6e6ff; }\n\
             .vimsession-player-wrapper { display: flex; flex-wrap: wrap; \
             margin-left: 1em; margin-top: 18px; }\n\
             .controls-help { white-space: pre-wrap; }\n\
             pre.vimsession-dump { display: none }\n",
        );
        head.push_str(
            "input:checked~pre.vimsession-dump { display: block; }\n\
             input.vimsession-dump { display: none }\n\
             label.vimsession-dump { cursor:pointer; color: #13141a; }\n\
             .review-frame-ts { color: cadetblue; font-size: smaller; }\n\
             .review-cmd-hop { color: navajowhite; font-size: smaller; \
             margin-bottom: 5ex; }\n",
        );
        head.push_str("</style>\n");
        head.push_str(&format!(
            "<link rel=\"stylesheet\" type=\"text/css\" \
             href=\"js/v{0}/asciinema-player.css\" />\n\
             <script src=\"js/v{0}/asciinema-player.js\"></script>\n",
            match self.config.player {
                PlayerVersion::V2 => 2,
                PlayerVersion::V3 => 3,
            }
        ));
        head.push_str("</head>\n\n<body class=\"f9 b9\">\n");
        head.push_str(&format!("<h1>{title}</h1>\n"));

        self.out.write_all(head.as_bytes())?;
        Ok(())
    }
}

fn poster_time(end_time: f64) -> f64 {
    if end_time > 2.0 {
        end_time - 1.0
    } else {
        end_time - 0.4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> HtmlDocument<Vec<u8>> {
        HtmlDocument::new(Vec::new(), DocumentConfig::default()).unwrap()
    }

    fn finish(mut doc: HtmlDocument<Vec<u8>>) -> String {
        doc.finish().unwrap();
        String::from_utf8(doc.into_inner()).unwrap()
    }

    #[test]
    fn escapes_html_metacharacters() {
        let mut d = doc();
        for byte in b"<a & \"b\">".iter() {
            d.write_byte(*byte).unwrap();
        }
        let html = finish(d);
        assert!(html.contains("&lt;a &amp; &quot;b&quot;&gt;"));
    }

    #[test]
    fn close_one_preserves_later_spans() {
        let mut d = doc();
        d.open_span(Span::Class("bold".into())).unwrap();
        d.open_span(Span::Class("f1".into())).unwrap();
        d.open_span(Span::Class("underline".into())).unwrap();
        d.close_one(SpanKind::Bold).unwrap();

        assert_eq!(
            d.spans,
            vec![
                Span::Class("f1".into()),
                Span::Class("underline".into()),
            ]
        );
        let html = finish(d);
        assert!(html.contains(
            "<span class=\"bold\"><span class=\"f1\">\
             <span class=\"underline\"></span></span></span>\
             <span class=\"f1\"><span class=\"underline\">"
        ));
    }

    #[test]
    fn rows_carry_anchor_ids() {
        let mut d = doc();
        d.new_cmd_row(1).unwrap();
        d.new_cmd_row(2).unwrap();
        let html = finish(d);
        assert!(html.contains("<div class=\"cmd-row\" id=\"c1\">"));
        assert!(html.contains("<div class=\"cmd-row\" id=\"c2\">"));
    }

    #[test]
    fn suppressed_rows_emit_nothing() {
        let config = DocumentConfig {
            suppress: BTreeSet::from([2]),
            ..DocumentConfig::default()
        };
        let mut d = HtmlDocument::new(Vec::new(), config).unwrap();
        d.new_cmd_row(1).unwrap();
        for byte in b"visible" {
            d.write_byte(*byte).unwrap();
        }
        d.new_cmd_row(2).unwrap();
        for byte in b"hidden" {
            d.write_byte(*byte).unwrap();
        }
        d.new_cmd_row(3).unwrap();
        let html = finish(d);
        assert!(html.contains("visible"));
        assert!(!html.contains("hidden"));
        assert!(!html.contains("id=\"c2\""));
        assert!(html.contains("id=\"c3\""));
    }

    #[test]
    fn vim_session_embeds_base64_player() {
        let mut d = doc();
        d.new_cmd_row(1).unwrap();
        let session = PlayerSession {
            cols: 80,
            rows: 24,
            end_time: 4.5,
            data: "{\"version\": 2}".into(),
        };
        d.vim_session(Some(&session)).unwrap();
        let sessions = d.take_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].0, "0_1");

        let html = finish(d);
        assert!(html.contains("<details class=\"vimsession-dropdown\">"));
        assert!(html.contains("data:application/json;base64,"));
        assert!(html.contains("poster=\"npt:3.5\""));
    }

    #[test]
    fn chapters_emit_headings() {
        let config = DocumentConfig {
            chapters: BTreeMap::from([(1, "First steps".to_string())]),
            ..DocumentConfig::default()
        };
        let mut d = HtmlDocument::new(Vec::new(), config).unwrap();
        d.new_cmd_row(1).unwrap();
        let html = finish(d);
        assert!(html.contains("<h3 class=\"chapter\">First steps</h3>"));
    }

    #[test]
    fn review_mode_annotates_frame_timestamps() {
        let config = DocumentConfig {
            review: true,
            ..DocumentConfig::default()
        };
        let mut d = HtmlDocument::new(Vec::new(), config).unwrap();
        d.set_frame_ts(12.25);
        d.new_cmd_row(1).unwrap();
        let html = finish(d);
        assert!(html.contains("<div class=\"review-frame-ts\">12.250000</div>"));
    }
}
