//! Wall-clock alignment of two parallel recordings.
//!
//! Two captures of the same working session (say, two terminals side by
//! side) are walked together on a shared clock derived from the header
//! timestamps. At any moment exactly one recording is "active"; whenever
//! the paused one's next frame comes due, attention hops over. The
//! resulting hop lists let review pages point from a command row in one
//! transcript to the matching moment in the other.

use std::io::BufRead;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::format::{Frame, Header};

/// Attention switches collected per side. `(from_ts, to_ts)`: the moment
/// of the switch on the shared clock, and the frame-relative timestamp
/// the other recording is at.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Hops {
    pub hops_from_left: Vec<(f64, f64)>,
    pub hops_from_right: Vec<(f64, f64)>,
}

struct StreamCursor<R: BufRead> {
    lines: std::io::Lines<R>,
    /// Wall offset of this recording relative to the earlier one.
    offset: f64,
    frame: Option<Frame>,
    wall: f64,
}

impl<R: BufRead> StreamCursor<R> {
    fn new(lines: std::io::Lines<R>, offset: f64) -> Result<Self> {
        let mut cursor = Self {
            lines,
            offset,
            frame: None,
            wall: f64::INFINITY,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    fn advance(&mut self) -> Result<()> {
        match self.lines.next() {
            Some(line) => {
                let frame = Frame::parse(&line?)?;
                self.wall = self.offset + frame.ts();
                self.frame = Some(frame);
            },
            None => self.wall = f64::INFINITY,
        }
        Ok(())
    }

    /// Advance until the wall time reaches or passes `stop`. Consumes at
    /// least one frame per turn so two cursors on identical timestamps
    /// cannot trade turns forever.
    fn skip_to(&mut self, stop: f64) -> Result<()> {
        if !self.exhausted() && self.wall >= stop {
            self.advance()?;
        }
        while self.wall < stop {
            self.advance()?;
        }
        Ok(())
    }

    fn exhausted(&self) -> bool {
        self.wall.is_infinite()
    }

    fn frame_ts(&self) -> f64 {
        self.frame.as_ref().map_or(0.0, Frame::ts)
    }
}

/// Type-erased view of a `StreamCursor`, so the active/paused pair can be
/// swapped between left and right even though each side parses a
/// different `BufRead` type.
trait Cursor {
    fn wall(&self) -> f64;
    fn skip_to(&mut self, stop: f64) -> Result<()>;
    fn exhausted(&self) -> bool;
    fn frame_ts(&self) -> f64;
}

impl<R: BufRead> Cursor for StreamCursor<R> {
    fn wall(&self) -> f64 {
        self.wall
    }

    fn skip_to(&mut self, stop: f64) -> Result<()> {
        StreamCursor::skip_to(self, stop)
    }

    fn exhausted(&self) -> bool {
        StreamCursor::exhausted(self)
    }

    fn frame_ts(&self) -> f64 {
        StreamCursor::frame_ts(self)
    }
}

fn read_header<R: BufRead>(lines: &mut std::io::Lines<R>) -> Result<Header> {
    let line = lines.next().ok_or(Error::UnsupportedInputFormat)??;
    Header::parse(&line)
}

/// Time-align two recordings and collect the attention hops.
///
/// Both headers must carry a wall-clock `timestamp`; the shared clock has
/// its origin at the earlier recording's start.
pub fn align<L: BufRead, R: BufRead>(left: L, right: R) -> Result<Hops> {
    let mut left_lines = left.lines();
    let mut right_lines = right.lines();

    let left_header = read_header(&mut left_lines)?;
    let right_header = read_header(&mut right_lines)?;
    let left_start = left_header
        .timestamp
        .ok_or(Error::UnsupportedInputFormat)?;
    let right_start = right_header
        .timestamp
        .ok_or(Error::UnsupportedInputFormat)?;

    let diff = right_start - left_start;
    info!(
        "aligning recordings, right starts {diff} seconds after left"
    );

    let mut left = StreamCursor::new(left_lines, diff.min(0.0).abs())?;
    let mut right = StreamCursor::new(right_lines, diff.max(0.0))?;

    let mut hops = Hops::default();
    let mut left_active = diff >= 0.0;

    loop {
        let (active, paused): (&mut dyn Cursor, &mut dyn Cursor) = if left_active {
            (&mut left, &mut right)
        } else {
            (&mut right, &mut left)
        };

        active.skip_to(paused.wall())?;
        if active.exhausted() && paused.exhausted() {
            break;
        }

        let hop = (paused.wall(), paused.frame_ts());
        debug!(
            "switching {} at wall {} to frame ts {}",
            if left_active { "left -> right" } else { "right -> left" },
            hop.0,
            hop.1
        );
        if left_active {
            hops.hops_from_left.push(hop);
        } else {
            hops.hops_from_right.push(hop);
        }
        left_active = !left_active;
    }

    Ok(hops)
}
