//! Asciinema v2 recording records.
//!
//! A recording is a JSON header object on the first line followed by one
//! JSON array `[timestamp, channel, data]` per line.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Recording header. Unknown fields are preserved so a deep-copied header
/// round-trips with its original metadata (shell, term, env).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Header {
    /// Parse the header line, rejecting anything but version 2.
    pub fn parse(line: &str) -> Result<Self> {
        let header: Self = serde_json::from_str(line)?;
        if header.version != 2 {
            return Err(Error::UnsupportedInputFormat);
        }
        Ok(header)
    }
}

/// One frame: `(timestamp_seconds, channel, data)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame(pub f64, pub String, pub String);

impl Frame {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Timestamp in seconds, relative to the recording start.
    pub fn ts(&self) -> f64 {
        self.0
    }

    /// Channel marker, `"o"` for output frames.
    pub fn channel(&self) -> &str {
        &self.1
    }

    /// The UTF-8 payload chunk.
    pub fn data(&self) -> &str {
        &self.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_v2_header() {
        let header = Header::parse(
            r#"{"version": 2, "width": 126, "height": 41, "timestamp": 1600000000, "env": {"SHELL": "/usr/bin/bash"}}"#,
        )
        .unwrap();
        assert_eq!(header.width, 126);
        assert_eq!(header.height, 41);
        assert_eq!(header.timestamp, Some(1_600_000_000.0));
        assert!(header.extra.contains_key("env"));
    }

    #[test]
    fn rejects_other_versions() {
        let err = Header::parse(r#"{"version": 1, "width": 80, "height": 24}"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedInputFormat));
    }

    #[test]
    fn frame_round_trips_as_json_array() {
        let frame = Frame::parse(r#"[1.234, "o", "ls\r\n"]"#).unwrap();
        assert_eq!(frame.ts(), 1.234);
        assert_eq!(frame.channel(), "o");
        assert_eq!(frame.data(), "ls\r\n");

        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"[1.234,"o","ls\r\n"]"#);
    }
}
