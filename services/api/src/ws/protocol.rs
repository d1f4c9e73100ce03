//! Defines the WebSocket message protocol between the browser client and the API server.

use outlrn_core::playback::{LayoutMode, Speaker, StageEvent};
use serde::{Deserialize, Serialize};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A question or instruction from the learner; starts a teaching turn.
    Ask {
        message: String,
        student_id: String,
        company_id: String,
        #[serde(default)]
        skill: Option<String>,
    },
    /// Toggles browser narration of the assistant's speech.
    SetVoiceEnabled { enabled: bool },
    /// The browser finished speaking the utterance with this id.
    SpeechEnded { id: u64 },
    /// The browser could not speak the utterance with this id.
    SpeechFailed {
        id: u64,
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Switch the presentation layout.
    Layout { mode: LayoutMode },
    /// Replace the code buffer (already normalized).
    Code { code: String },
    /// Replace the concept panel.
    Concept { title: String, text: String },
    /// Set or clear the highlighted snippet.
    Highlight { query: Option<String> },
    /// Create or replace the transcript entry at `index`.
    Transcript {
        index: usize,
        role: Speaker,
        text: String,
    },
    /// Speak `text` and answer with `speech_ended` or `speech_failed` for `id`.
    Speak {
        id: u64,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
    },
    /// Every queued action has been played.
    Drained,
    /// The teaching stream for the current turn has ended.
    TurnFinished { enqueued: usize, dropped: usize },
    /// Reports an error to the client.
    Error { message: String },
}

impl From<StageEvent> for ServerMessage {
    fn from(event: StageEvent) -> Self {
        match event {
            StageEvent::LayoutChanged(mode) => ServerMessage::Layout { mode },
            StageEvent::CodeChanged(code) => ServerMessage::Code { code },
            StageEvent::ConceptChanged(concept) => ServerMessage::Concept {
                title: concept.title,
                text: concept.text,
            },
            StageEvent::HighlightChanged(query) => ServerMessage::Highlight { query },
            StageEvent::Transcript { index, entry } => ServerMessage::Transcript {
                index,
                role: entry.role,
                text: entry.text,
            },
            StageEvent::Drained => ServerMessage::Drained,
        }
    }
}
