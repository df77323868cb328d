//! Re-recorded editor sub-sessions.
//!
//! Frames captured between the editor boundaries become a standalone
//! recording. Inter-frame gaps are quantized so long human pauses
//! collapse while the typing rhythm survives the replay.

use std::fmt;

use log::debug;

use castweave_html::PlayerSession;

use crate::format::{Frame, Header};

/// Quantization steps, largest first. A gap maps to the largest step it
/// reaches; gaps below the smallest step pass through unchanged.
const QUANT_STEPS: [f64; 8] = [4.0, 2.0, 1.0, 0.5, 0.3, 0.18, 0.1, 0.03];

fn quantize(dt: f64) -> f64 {
    for step in QUANT_STEPS {
        if dt >= step {
            return step;
        }
    }
    dt
}

fn round5(ts: f64) -> f64 {
    (ts * 100_000.0).round() / 100_000.0
}

/// A replayable slice of the input recording holding only editor frames,
/// with its own header and re-based, quantized timestamps.
#[derive(Debug, Clone)]
pub struct EditorRecording {
    header: Header,
    frames: Vec<Frame>,
    last_src_ts: f64,
}

impl EditorRecording {
    /// Start a sub-recording at `start_ts` (the timestamp of the first
    /// frame that belongs to the session). A differing height override
    /// from the editor probe replaces the header height on a copy.
    pub fn start(base: &Header, start_ts: f64, height: Option<u16>) -> Self {
        let mut header = base.clone();
        if let Some(height) = height {
            if u32::from(height) != header.height {
                debug!(
                    "editor recording at ts {start_ts} overrides height {} with {height}",
                    header.height
                );
                header.height = height.into();
            }
        }

        Self {
            header,
            frames: Vec::new(),
            last_src_ts: start_ts,
        }
    }

    /// Append one frame, re-timing it relative to the previous one.
    pub fn push(&mut self, frame: &Frame) {
        let ts = self.frame_time(frame.ts());
        self.frames
            .push(Frame(ts, frame.1.clone(), frame.2.clone()));
    }

    pub fn extend<'a>(&mut self, frames: impl IntoIterator<Item = &'a Frame>) {
        for frame in frames {
            self.push(frame);
        }
    }

    fn frame_time(&mut self, ts: f64) -> f64 {
        let dt = quantize(ts - self.last_src_ts);
        let prev = self.frames.last().map_or(0.0, Frame::ts);
        self.last_src_ts = ts;
        round5(prev + dt)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Timestamp of the last frame, 0 when empty.
    pub fn end_time(&self) -> f64 {
        self.frames.last().map_or(0.0, Frame::ts)
    }

    /// Package the recording for embedding in the document.
    pub fn player_session(&self) -> PlayerSession {
        PlayerSession {
            cols: self.header.width,
            rows: self.header.height,
            end_time: self.end_time(),
            data: self.to_string(),
        }
    }
}

/// Serialises as a complete asciinema v2 recording: header line followed
/// by one frame per line.
impl fmt::Display for EditorRecording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header =
            serde_json::to_string(&self.header).map_err(|_| fmt::Error)?;
        write!(f, "{header}")?;
        for frame in &self.frames {
            let frame = serde_json::to_string(frame).map_err(|_| fmt::Error)?;
            write!(f, "\n{frame}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header::parse(r#"{"version": 2, "width": 80, "height": 24}"#).unwrap()
    }

    fn frame(ts: f64) -> Frame {
        Frame(ts, "o".into(), "x".into())
    }

    #[test]
    fn quantize_picks_largest_step_not_exceeding_the_gap() {
        let cases = vec![
            (5.0, 4.0),
            (4.0, 4.0),
            (1.7, 1.0),
            (0.6, 0.5),
            (0.48, 0.3),
            (0.2, 0.18),
            (0.11, 0.1),
            (0.05, 0.03),
            (0.02, 0.02),
            (0.0, 0.0),
        ];
        for (input, expected) in cases {
            assert_eq!(quantize(input), expected, "dt = {input}");
        }
    }

    #[test]
    fn retimes_relative_to_the_session_start() {
        let mut rec = EditorRecording::start(&header(), 0.0, None);
        for ts in [0.0, 0.02, 0.5, 5.0] {
            rec.push(&frame(ts));
        }
        let times: Vec<f64> = rec.frames().iter().map(Frame::ts).collect();
        assert_eq!(times, vec![0.0, 0.02, 0.32, 4.32]);
    }

    #[test]
    fn output_deltas_are_quantization_steps() {
        let mut rec = EditorRecording::start(&header(), 10.0, None);
        for ts in [10.0, 10.01, 10.02, 12.5, 12.52, 99.0] {
            rec.push(&frame(ts));
        }
        let times: Vec<f64> = rec.frames().iter().map(Frame::ts).collect();
        assert!(times.windows(2).all(|w| w[1] >= w[0]));
        for delta in times.windows(2).map(|w| round5(w[1] - w[0])) {
            assert!(
                QUANT_STEPS.contains(&delta) || delta < 0.03,
                "unexpected delta {delta}"
            );
        }
    }

    #[test]
    fn height_override_deep_copies_the_header() {
        let base = header();
        let rec = EditorRecording::start(&base, 0.0, Some(48));
        assert_eq!(rec.header().height, 48);
        assert_eq!(base.height, 24);

        let same = EditorRecording::start(&base, 0.0, Some(24));
        assert_eq!(same.header().height, 24);
    }

    #[test]
    fn serialises_header_plus_frames() {
        let mut rec = EditorRecording::start(&header(), 1.0, None);
        rec.push(&frame(1.0));
        rec.push(&frame(1.5));
        let text = rec.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"version\":2"));
        assert!(lines[1].starts_with("[0.0,"));
    }
}
