//! Incremental parser for the streamed teaching protocol.
//!
//! The tutor backend streams newline-delimited JSON objects, optionally in
//! SSE style with a `data: ` prefix. Bytes arrive in arbitrary chunks, so the
//! parser buffers until a full line is available. Each line maps to one
//! [`Action`], except `layout`, which is always followed by a settle wait.

use super::action::{Action, Concept, LayoutMode};
use serde::Deserialize;
use std::time::Duration;

/// Pause inserted after every layout change so the transition can finish.
pub const LAYOUT_SETTLE: Duration = Duration::from_millis(500);

/// Why a single line was rejected. The stream itself continues.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("line is not a valid teaching event: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown layout mode '{0}'")]
    UnknownLayoutMode(String),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireEvent {
    Speak { text: String },
    Layout { mode: String },
    Code { content: String },
    Concept { title: String, text: String },
    Highlight { code_to_highlight: String },
}

/// Parses one complete, non-empty line into an action.
pub fn parse_line(line: &str) -> Result<Action, ParseError> {
    let line = line.trim();
    let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);

    let action = match serde_json::from_str::<WireEvent>(payload)? {
        WireEvent::Speak { text } => Action::Speak(text),
        WireEvent::Layout { mode } => {
            Action::Layout(mode.parse().map_err(ParseError::UnknownLayoutMode)?)
        }
        WireEvent::Code { content } => Action::Code(content),
        WireEvent::Concept { title, text } => Action::Concept(Concept { title, text }),
        WireEvent::Highlight { code_to_highlight } => Action::Highlight(code_to_highlight),
    };
    Ok(action)
}

/// Buffers raw stream bytes and yields parsed actions line by line.
#[derive(Debug, Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the outcome of every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Action, ParseError>> {
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            decode_into(&line[..line.len() - 1], &mut out);
        }
        out
    }

    /// Parses whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Vec<Result<Action, ParseError>> {
        let rest = std::mem::take(&mut self.buffer);
        let mut out = Vec::new();
        decode_into(&rest, &mut out);
        out
    }
}

fn decode_into(raw: &[u8], out: &mut Vec<Result<Action, ParseError>>) {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            out.push(Err(e.into()));
            return;
        }
    };
    if line.trim().is_empty() {
        return;
    }

    match parse_line(line) {
        Ok(Action::Layout(mode)) => {
            out.push(Ok(Action::Layout(mode)));
            out.push(Ok(Action::Wait(LAYOUT_SETTLE)));
        }
        other => out.push(other),
    }
}
