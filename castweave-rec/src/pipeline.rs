//! Frame splitter and editor capture for asciinema input.
//!
//! Frames are fed byte-wise into the session parser, which only accepts
//! whole lines; bytes accumulate until a linefeed arrives. Frames seen
//! since the last linefeed stay in a pending buffer, because an editor
//! start sequence may straddle several frames without a newline and the
//! sub-recording must include all of them. While an editor session is
//! being captured, its frames bypass the buffer and go straight into the
//! sub-recording; the frame carrying the teardown sequence is dropped so
//! the replay never closes the secondary screen.

use std::io::Write;

use castweave_html::HtmlRenderer;
use castweave_session::{
    SessionActor, SessionParser, VimBoundaryDetector, VimSessionProps,
};
use castweave_vte::VtActor;

use crate::editor::EditorRecording;
use crate::error::Result;
use crate::format::{Frame, Header};

struct CaptureState {
    header: Header,
    pending: Vec<Frame>,
    capturing: bool,
    in_vim: bool,
    recording: Option<EditorRecording>,
    vim: VimBoundaryDetector,
}

/// Drives one asciinema recording through detection and rendering.
pub struct CastPipeline<W: Write> {
    session: SessionParser,
    renderer: HtmlRenderer<W>,
    state: CaptureState,
    byteline: Vec<u8>,
}

impl<W: Write> CastPipeline<W> {
    pub fn new(header: Header, renderer: HtmlRenderer<W>) -> Self {
        Self::with_session(header, renderer, SessionParser::default())
    }

    pub fn with_session(
        header: Header,
        renderer: HtmlRenderer<W>,
        session: SessionParser,
    ) -> Self {
        Self {
            session,
            renderer,
            state: CaptureState {
                header,
                pending: Vec::new(),
                capturing: false,
                in_vim: false,
                recording: None,
                vim: VimBoundaryDetector::new(),
            },
            byteline: Vec::new(),
        }
    }

    /// Feed one frame of the recording.
    pub fn feed(&mut self, frame: &Frame) -> Result<()> {
        self.renderer.set_frame_ts(frame.ts());

        if self.state.in_vim {
            if self.state.capturing {
                // The frame carrying the teardown sequence ends the
                // capture and is excluded from the sub-recording.
                if self.state.vim.ends_within(frame.data().as_bytes()) {
                    self.state.capturing = false;
                } else if let Some(rec) = self.state.recording.as_mut() {
                    rec.push(frame);
                }
            }
        } else {
            self.state.pending.push(frame.clone());
        }

        for idx in 0..frame.data().len() {
            let byte = frame.data().as_bytes()[idx];
            self.byteline.push(byte);
            if byte == 0x0a {
                self.parse_byteline()?;
                self.state.pending.clear();
            }
        }

        Ok(())
    }

    /// Flush whatever is still buffered and close the document. Returns
    /// the finished renderer output document.
    pub fn finish(
        mut self,
    ) -> Result<castweave_html::HtmlDocument<W>> {
        if !self.byteline.is_empty() {
            self.parse_byteline()?;
        }

        let mut capture = Capture {
            renderer: &mut self.renderer,
            state: &mut self.state,
        };
        self.session.finish(&mut capture);
        self.renderer.check()?;

        Ok(self.renderer.finish()?)
    }

    /// Statistics of the underlying parser.
    pub fn stats(&self) -> &castweave_vte::Stats {
        self.session.stats()
    }

    fn parse_byteline(&mut self) -> Result<()> {
        let line = std::mem::take(&mut self.byteline);
        let mut capture = Capture {
            renderer: &mut self.renderer,
            state: &mut self.state,
        };
        self.session.parse_line(&line, &mut capture)?;
        self.renderer.check()?;
        Ok(())
    }
}

/// Actor adapter between the session parser and the renderer: forwards
/// everything, and manages the sub-recording around the editor events.
struct Capture<'a, W: Write> {
    renderer: &'a mut HtmlRenderer<W>,
    state: &'a mut CaptureState,
}

impl<W: Write> VtActor for Capture<'_, W> {
    fn print(&mut self, byte: u8) {
        self.renderer.print(byte);
    }

    fn execute(&mut self, byte: u8) {
        self.renderer.execute(byte);
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], byte: u8) {
        self.renderer.esc_dispatch(intermediates, byte);
    }

    fn csi_dispatch(
        &mut self,
        private: Option<u8>,
        params: &[u8],
        intermediates: &[u8],
        byte: u8,
    ) {
        self.renderer
            .csi_dispatch(private, params, intermediates, byte);
    }

    fn osc_end(&mut self, osc: &[u8]) {
        self.renderer.osc_end(osc);
    }
}

impl<W: Write> SessionActor for Capture<'_, W> {
    fn prompt_start(&mut self) {
        self.renderer.prompt_start();
    }

    fn prompt_active(&mut self) {
        self.renderer.prompt_active();
    }

    fn prompt_end(&mut self) {
        self.renderer.prompt_end();
    }

    fn vim_start(&mut self, props: &VimSessionProps) {
        let state = &mut *self.state;
        state.in_vim = true;
        state.capturing = true;

        // The pending buffer holds every frame since the last newline;
        // its first frame is the time origin of the sub-recording.
        let origin = state.pending.first().map_or(0.0, Frame::ts);
        let mut recording =
            EditorRecording::start(&state.header, origin, props.height);

        // A one-frame session may already contain the teardown: keep the
        // closing frame out and do not enter capture at all.
        if let Some(last) = state.pending.last() {
            if state.vim.ends_within(last.data().as_bytes()) {
                state.pending.pop();
                state.capturing = false;
            }
        }
        recording.extend(&state.pending);
        state.recording = Some(recording);

        self.renderer.vim_start(props);
    }

    fn vim_end(&mut self) {
        self.state.in_vim = false;
        self.state.capturing = false;
        if let Some(recording) = self.state.recording.take() {
            self.renderer
                .attach_editor_session(recording.player_session());
        }
        self.renderer.vim_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castweave_html::DocumentConfig;

    fn header() -> Header {
        Header::parse(
            r#"{"version": 2, "width": 80, "height": 24, "timestamp": 1000}"#,
        )
        .unwrap()
    }

    fn pipeline() -> CastPipeline<Vec<u8>> {
        let renderer =
            HtmlRenderer::new(Vec::new(), DocumentConfig::default()).unwrap();
        CastPipeline::new(header(), renderer)
    }

    fn out_frame(ts: f64, data: &str) -> Frame {
        Frame(ts, "o".into(), data.into())
    }

    #[test]
    fn editor_frames_become_a_sub_recording() {
        let mut pipe = pipeline();
        let frames = vec![
            out_frame(0.0, "\x1b[22;0;0t\x1b[22;2t\x1b[22;1t\r\n"),
            out_frame(0.5, "editor screen one"),
            out_frame(1.0, "editor screen two"),
            out_frame(1.2, "editor screen three"),
            out_frame(1.3, "\x1b[23;0;0tdone\r\n"),
            out_frame(2.0, "back at the shell\r\n"),
        ];
        for frame in &frames {
            pipe.feed(frame).unwrap();
        }
        let mut doc = pipe.finish().unwrap();

        let sessions = doc.take_sessions();
        assert_eq!(sessions.len(), 1);
        let body: Vec<&str> = sessions[0].1.lines().collect();
        // header + start frame + three content frames, teardown excluded
        assert_eq!(body.len(), 5);
        assert!(!sessions[0].1.contains("23;0;0"));

        let html = String::from_utf8(doc.into_inner()).unwrap();
        assert!(html.contains("vimsession-dropdown"));
        assert!(html.contains("back at the shell"));
        assert!(!html.contains("editor screen"));
    }

    #[test]
    fn sub_recording_times_are_quantized_and_monotonic() {
        let mut pipe = pipeline();
        let frames = vec![
            out_frame(10.0, "\x1b[22;0;0t\x1b[22;2t\x1b[22;1t\r\n"),
            out_frame(10.02, "a"),
            out_frame(10.52, "b"),
            out_frame(15.52, "c"),
            out_frame(16.0, "\x1b[23;0;0t\r\n"),
        ];
        for frame in &frames {
            pipe.feed(frame).unwrap();
        }
        let mut doc = pipe.finish().unwrap();
        let sessions = doc.take_sessions();
        let times: Vec<f64> = sessions[0]
            .1
            .lines()
            .skip(1)
            .map(|line| Frame::parse(line).unwrap().ts())
            .collect();
        assert_eq!(times, vec![0.0, 0.02, 0.52, 4.52]);
    }

    #[test]
    fn oneline_session_excludes_the_closing_frame() {
        let mut pipe = pipeline();
        // Start and teardown arrive in frames of the same line.
        let frames = vec![
            out_frame(0.0, "\x1b[22;0;0t\x1b[22;2t\x1b[22;1t"),
            out_frame(0.2, "quick edit \x1b[23;0;0t\r\n"),
            out_frame(1.0, "after\r\n"),
        ];
        for frame in &frames {
            pipe.feed(frame).unwrap();
        }
        let mut doc = pipe.finish().unwrap();
        let sessions = doc.take_sessions();
        assert_eq!(sessions.len(), 1);
        let body: Vec<&str> = sessions[0].1.lines().collect();
        // header + the start frame; the closing frame is popped
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn height_override_from_session_props() {
        let mut pipe = pipeline();
        let frames = vec![
            out_frame(0.0, "\x1b[22;0;0t\x1b[1;50r\x1b[22;2t\x1b[22;1t\r\n"),
            out_frame(0.5, "body"),
            out_frame(1.0, "\x1b[23;0;0t\r\n"),
        ];
        for frame in &frames {
            pipe.feed(frame).unwrap();
        }
        let mut doc = pipe.finish().unwrap();
        let sessions = doc.take_sessions();
        let header_line = sessions[0].1.lines().next().unwrap().to_string();
        let header = Header::parse(&header_line).unwrap();
        assert_eq!(header.height, 50);
    }

    #[test]
    fn plain_frames_render_without_sessions() {
        let mut pipe = pipeline();
        pipe.feed(&out_frame(0.0, "hello\r\n")).unwrap();
        pipe.feed(&out_frame(0.5, "world\r\n")).unwrap();
        let mut doc = pipe.finish().unwrap();
        assert!(doc.take_sessions().is_empty());
        let html = String::from_utf8(doc.into_inner()).unwrap();
        assert!(html.contains("hello"));
        assert!(html.contains("world"));
    }
}
