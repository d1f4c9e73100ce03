//! Playback of streamed teaching content.
//!
//! - `parser`: turns the newline-delimited teaching stream into [`Action`]s.
//! - `director`: the single consumer that executes actions in order.
//! - `stage`: the presentation state the director mutates.
//! - `narrator`: the speech engine seam awaited by SPEAK actions.
//! - `pump`: glue that feeds a byte stream through the parser into the director.

mod action;
mod director;
mod narrator;
mod parser;
mod pump;
mod stage;

pub use action::{Action, Concept, LayoutMode};
pub use director::{Command, Director, DirectorClosed, DirectorConfig, DirectorHandle, StageEvent};
pub use narrator::{NarrationError, Narrator};
pub use parser::{LAYOUT_SETTLE, ParseError, StreamParser, parse_line};
pub use pump::{PumpSummary, pump_stream};
pub use stage::{
    Speaker, Stage, TranscriptEntry, highlighted_lines, normalize_code, normalize_query,
};
