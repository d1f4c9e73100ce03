//! Outlrn tutoring core.
//!
//! - `curriculum` and `progress`: per-learner curriculum progress and readiness.
//! - `storage`: the key-value backends progress is persisted through.
//! - `playback`: parsing and ordered execution of streamed teaching actions.
//! - `tutor_client`: opens the teaching stream for a user turn.
//! - `tools`: MCP tools letting a tutoring model update progress.

pub mod curriculum;
pub mod playback;
pub mod progress;
pub mod storage;
pub mod tools;
pub mod tutor_client;
