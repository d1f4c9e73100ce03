//! The playback director: executes teaching actions strictly in arrival order.
//!
//! A single task owns the receiving end of the command channel, so there is
//! exactly one consumer no matter how many producers push. Every action runs
//! to completion, including its awaited side effects, before the next one is
//! taken off the queue.

use super::action::{Action, Concept, LayoutMode};
use super::narrator::Narrator;
use super::stage::{Stage, TranscriptEntry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Tuning for the director loop.
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    /// Whether SPEAK actions go through the narrator. Can be toggled at runtime.
    pub narration_enabled: bool,
    /// Voice selector passed to the narrator.
    pub voice: Option<String>,
    /// Upper bound on a single narration. `None` waits for the narrator indefinitely.
    pub speech_timeout: Option<Duration>,
    /// Stand-in speaking time per character when narration is off.
    pub silent_delay_per_char: Duration,
    /// Pause after every action.
    pub action_yield: Duration,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            narration_enabled: true,
            voice: None,
            speech_timeout: None,
            silent_delay_per_char: Duration::from_millis(50),
            action_yield: Duration::from_millis(10),
        }
    }
}

/// Work items accepted by the director.
#[derive(Debug, Clone)]
pub enum Command {
    /// Execute a teaching action.
    Perform(Action),
    /// Record a user utterance in the transcript, in queue order.
    UserSaid(String),
}

/// Observable changes to the stage, emitted in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    LayoutChanged(LayoutMode),
    CodeChanged(String),
    ConceptChanged(Concept),
    HighlightChanged(Option<String>),
    Transcript { index: usize, entry: TranscriptEntry },
    /// The queue was empty after the last action.
    Drained,
}

#[derive(Debug, thiserror::Error)]
#[error("the director has stopped")]
pub struct DirectorClosed;

/// Producer side of the director queue. Cheap to clone.
///
/// The director task exits once every handle has been dropped and the queue
/// has been fully executed.
#[derive(Clone)]
pub struct DirectorHandle {
    commands: mpsc::UnboundedSender<Command>,
    narration: Arc<watch::Sender<bool>>,
}

impl DirectorHandle {
    pub fn enqueue(&self, action: Action) -> Result<(), DirectorClosed> {
        self.commands
            .send(Command::Perform(action))
            .map_err(|_| DirectorClosed)
    }

    pub fn record_user(&self, text: impl Into<String>) -> Result<(), DirectorClosed> {
        self.commands
            .send(Command::UserSaid(text.into()))
            .map_err(|_| DirectorClosed)
    }

    /// Turns narration on or off for SPEAK actions executed from now on.
    pub fn set_narration(&self, enabled: bool) {
        self.narration.send_replace(enabled);
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

pub struct Director {
    config: DirectorConfig,
    narrator: Option<Arc<dyn Narrator>>,
    events: mpsc::UnboundedSender<StageEvent>,
    narration: watch::Receiver<bool>,
    stage: Stage,
}

impl Director {
    /// Starts the consumer task. It returns the final stage when it exits.
    pub fn spawn(
        config: DirectorConfig,
        narrator: Option<Arc<dyn Narrator>>,
        events: mpsc::UnboundedSender<StageEvent>,
    ) -> (DirectorHandle, JoinHandle<Stage>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (narration_tx, narration_rx) = watch::channel(config.narration_enabled);

        let director = Self {
            config,
            narrator,
            events,
            narration: narration_rx,
            stage: Stage::new(),
        };
        let task = tokio::spawn(director.run(commands_rx));

        let handle = DirectorHandle {
            commands: commands_tx,
            narration: Arc::new(narration_tx),
        };
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) -> Stage {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Perform(action) => {
                    self.perform(action).await;
                    sleep(self.config.action_yield).await;
                    if commands.is_empty() {
                        self.emit(StageEvent::Drained);
                    }
                }
                Command::UserSaid(text) => {
                    let index = self.stage.push_user(&text);
                    self.emit_transcript(index);
                }
            }
        }
        debug!("Director queue closed");
        self.stage
    }

    async fn perform(&mut self, action: Action) {
        debug!(action = action.kind(), "Executing action");
        match action {
            Action::Layout(mode) => {
                let had_highlight = self.stage.highlight.is_some();
                self.stage.set_layout(mode);
                self.emit(StageEvent::LayoutChanged(mode));
                if had_highlight {
                    self.emit(StageEvent::HighlightChanged(None));
                }
            }
            Action::Code(code) => {
                let had_highlight = self.stage.highlight.is_some();
                self.stage.set_code(&code);
                self.emit(StageEvent::CodeChanged(self.stage.code.clone()));
                if had_highlight {
                    self.emit(StageEvent::HighlightChanged(None));
                }
            }
            Action::Concept(concept) => {
                self.stage.set_concept(concept.clone());
                self.emit(StageEvent::ConceptChanged(concept));
            }
            Action::Highlight(query) => {
                self.stage.set_highlight(&query);
                self.emit(StageEvent::HighlightChanged(self.stage.highlight.clone()));
            }
            Action::Wait(duration) => sleep(duration).await,
            Action::Speak(text) => {
                let index = self.stage.push_assistant(&text);
                self.emit_transcript(index);
                self.narrate(&text).await;
            }
        }
    }

    async fn narrate(&self, text: &str) {
        let enabled = *self.narration.borrow();
        let narrator = match &self.narrator {
            Some(narrator) if enabled => narrator,
            _ => {
                let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
                sleep(self.config.silent_delay_per_char.saturating_mul(chars)).await;
                return;
            }
        };

        let speech = narrator.speak(text, self.config.voice.as_deref());
        let outcome = match self.config.speech_timeout {
            Some(limit) => match tokio::time::timeout(limit, speech).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "Narration timed out; moving on");
                    return;
                }
            },
            None => speech.await,
        };
        if let Err(e) = outcome {
            debug!(error = %e, "Narration failed; treating as finished");
        }
    }

    fn emit_transcript(&self, index: usize) {
        let entry = self.stage.transcript[index].clone();
        self.emit(StageEvent::Transcript { index, entry });
    }

    fn emit(&self, event: StageEvent) {
        // A dropped observer only means nobody is watching.
        let _ = self.events.send(event);
    }
}
