//! Manages the WebSocket connection lifecycle for a teaching session.
//!
//! Each connection owns one playback director. Teaching turns stream actions
//! into it, and every stage change is forwarded to the browser in order.

use super::{
    narrator::RelayNarrator,
    protocol::{ClientMessage, ServerMessage},
};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use outlrn_core::{
    playback::{
        Director, DirectorConfig, DirectorHandle, NarrationError, Narrator, Stage, pump_stream,
    },
    tutor_client::TutorRequest,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "ws_session", skip_all, fields(connection_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    tracing::Span::current().record("connection_id", connection_id.to_string());
    info!("New WebSocket connection.");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // A single writer owns the sink so messages reach the client in the order they were produced.
    let writer = tokio::spawn(
        async move {
            while let Some(msg) = outgoing_rx.recv().await {
                if let Err(e) = send_msg(&mut socket_tx, msg).await {
                    warn!(error = ?e, "Failed to write to client; closing writer.");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let mut session = Session::start(state, outgoing_tx);

    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(msg) => session.handle(msg).await,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed client message.");
                    session.send(ServerMessage::Error {
                        message: format!("Malformed message: {}", e),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        }
    }

    session.shutdown();
    writer.abort();
    info!("WebSocket connection closed and teaching session terminated.");
}

/// Per-connection state: the director, its narrator, and the running turn.
pub struct Session {
    state: Arc<AppState>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
    narrator: Arc<RelayNarrator>,
    director: DirectorHandle,
    director_task: JoinHandle<Stage>,
    forwarder: JoinHandle<()>,
    turn: Option<JoinHandle<()>>,
}

impl Session {
    /// Spawns the director and the task forwarding its stage events to the client.
    ///
    /// Narration starts disabled until the client enables voice.
    pub fn start(state: Arc<AppState>, outgoing: mpsc::UnboundedSender<ServerMessage>) -> Self {
        let narrator = Arc::new(RelayNarrator::new(outgoing.clone()));
        let config = DirectorConfig {
            narration_enabled: false,
            voice: state.config.narration_voice.clone(),
            speech_timeout: state.config.speech_timeout,
            ..Default::default()
        };

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (director, director_task) = Director::spawn(
            config,
            Some(narrator.clone() as Arc<dyn Narrator>),
            events_tx,
        );

        let forwarder = tokio::spawn({
            let outgoing = outgoing.clone();
            async move {
                while let Some(event) = events_rx.recv().await {
                    if outgoing.send(event.into()).is_err() {
                        break;
                    }
                }
            }
            .in_current_span()
        });

        Self {
            state,
            outgoing,
            narrator,
            director,
            director_task,
            forwarder,
            turn: None,
        }
    }

    pub async fn handle(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::Ask {
                message,
                student_id,
                company_id,
                skill,
            } => self.start_turn(TutorRequest {
                message,
                student_id,
                company_id,
                skill,
            }),
            ClientMessage::SetVoiceEnabled { enabled } => {
                self.director.set_narration(enabled);
                info!(enabled, "Voice narration toggled by client.");
            }
            ClientMessage::SpeechEnded { id } => self.narrator.finish(id, Ok(())),
            ClientMessage::SpeechFailed { id, reason } => {
                let reason = reason.unwrap_or_else(|| "unknown".to_string());
                self.narrator.finish(id, Err(NarrationError::Engine(reason)));
            }
        }
    }

    pub fn send(&self, msg: ServerMessage) {
        let _ = self.outgoing.send(msg);
    }

    fn start_turn(&mut self, request: TutorRequest) {
        if self.turn.as_ref().is_some_and(|turn| !turn.is_finished()) {
            warn!("Rejecting ask while a teaching turn is still streaming.");
            self.send(ServerMessage::Error {
                message: "A teaching turn is already in progress.".to_string(),
            });
            return;
        }
        if self.director.record_user(request.message.clone()).is_err() {
            error!("Director is no longer running.");
            self.send(ServerMessage::Error {
                message: "The teaching session has stopped.".to_string(),
            });
            return;
        }

        let client = self.state.tutor_client.clone();
        let director = self.director.clone();
        let outgoing = self.outgoing.clone();
        let span = tracing::info_span!("teaching_turn", student_id = %request.student_id, company_id = %request.company_id);

        self.turn = Some(tokio::spawn(
            async move {
                let stream = match client.open_stream(&request).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!(error = ?e, "Failed to open teaching stream.");
                        let _ = outgoing.send(ServerMessage::Error {
                            message: format!("Tutor unavailable: {}", e),
                        });
                        return;
                    }
                };

                let summary = pump_stream(stream, &director).await;
                if summary.failed {
                    let _ = outgoing.send(ServerMessage::Error {
                        message: "The teaching stream was interrupted.".to_string(),
                    });
                }
                let _ = outgoing.send(ServerMessage::TurnFinished {
                    enqueued: summary.enqueued,
                    dropped: summary.dropped,
                });
            }
            .instrument(span),
        ));
    }

    /// Stops every task belonging to this session.
    pub fn shutdown(self) {
        if let Some(turn) = self.turn {
            turn.abort();
        }
        self.director_task.abort();
        self.forwarder.abort();
    }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;
    use outlrn_core::{
        playback::{LayoutMode, Speaker},
        tutor_client::{TeachingStream, TutorClient},
    };
    use std::time::Duration;

    enum ScriptedTutor {
        Lines(Vec<&'static str>),
        Stalled,
        Offline,
    }

    #[async_trait]
    impl TutorClient for ScriptedTutor {
        async fn open_stream(&self, _request: &TutorRequest) -> anyhow::Result<TeachingStream> {
            match self {
                ScriptedTutor::Lines(lines) => Ok(stream::iter(
                    lines
                        .iter()
                        .map(|l| Ok(Bytes::from_static(l.as_bytes())))
                        .collect::<Vec<_>>(),
                )
                .boxed()),
                ScriptedTutor::Stalled => Ok(stream::pending().boxed()),
                ScriptedTutor::Offline => Err(anyhow!("tutor offline")),
            }
        }
    }

    fn ask(message: &str) -> ClientMessage {
        ClientMessage::Ask {
            message: message.to_string(),
            student_id: "s1".into(),
            company_id: "c1".into(),
            skill: Some("react".into()),
        }
    }

    /// Collects messages until `done` matches one or the channel goes quiet.
    async fn collect_until(
        rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
        done: impl Fn(&ServerMessage) -> bool,
    ) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_secs(30), rx.recv()).await {
            let finished = done(&msg);
            out.push(msg);
            if finished {
                break;
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_streams_actions_to_client() {
        let tutor = ScriptedTutor::Lines(vec![
            "{\"type\":\"speak\",\"text\":\"JSX is\"}\n",
            "{\"type\":\"speak\",\"text\":\"markup in JS.\"}\n{\"type\":\"layout\",\"mode\":\"SPLIT_MODE\"}\n",
            "garbage\n{\"type\":\"code\",\"content\":\"\\tconst el = <p/>;\"}\n",
        ]);
        let state = AppState::for_tests(Arc::new(tutor));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::start(state, tx);

        session.handle(ask("What is JSX?")).await;
        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::Code { .. })).await;

        assert!(messages.contains(&ServerMessage::Transcript {
            index: 0,
            role: Speaker::User,
            text: "What is JSX?".into(),
        }));
        assert!(messages.contains(&ServerMessage::Transcript {
            index: 1,
            role: Speaker::Assistant,
            text: "JSX is markup in JS.".into(),
        }));
        assert!(messages.contains(&ServerMessage::TurnFinished {
            enqueued: 5,
            dropped: 1
        }));

        let layout_pos = messages
            .iter()
            .position(|m| *m == ServerMessage::Layout { mode: LayoutMode::Split })
            .expect("layout sent");
        let code_pos = messages
            .iter()
            .position(|m| *m == ServerMessage::Code { code: "  const el = <p/>;".into() })
            .expect("code sent");
        assert!(layout_pos < code_pos);

        session.shutdown();
    }

    #[tokio::test]
    async fn test_second_ask_is_rejected_while_streaming() {
        let state = AppState::for_tests(Arc::new(ScriptedTutor::Stalled));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::start(state, tx);

        session.handle(ask("first")).await;
        tokio::task::yield_now().await;
        session.handle(ask("second")).await;

        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::Error { .. })).await;
        assert!(messages.contains(&ServerMessage::Error {
            message: "A teaching turn is already in progress.".into()
        }));
        session.shutdown();
    }

    #[tokio::test]
    async fn test_offline_tutor_reports_error() {
        let state = AppState::for_tests(Arc::new(ScriptedTutor::Offline));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::start(state, tx);

        session.handle(ask("hello?")).await;
        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::Error { .. })).await;
        let Some(ServerMessage::Error { message }) = messages.last() else {
            panic!("expected an error message");
        };
        assert!(message.contains("tutor offline"));
        session.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_enabled_relays_speech() {
        let tutor = ScriptedTutor::Lines(vec!["{\"type\":\"speak\",\"text\":\"Listen.\"}\n"]);
        let state = AppState::for_tests(Arc::new(tutor));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::start(state, tx);

        session.handle(ClientMessage::SetVoiceEnabled { enabled: true }).await;
        session.handle(ask("Talk to me")).await;

        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::Speak { .. })).await;
        let Some(ServerMessage::Speak { id, text, .. }) = messages.last().cloned() else {
            panic!("expected a speak message");
        };
        assert_eq!(text, "Listen.");

        session.handle(ClientMessage::SpeechEnded { id }).await;
        let rest = collect_until(&mut rx, |m| *m == ServerMessage::Drained).await;
        assert_eq!(rest.last(), Some(&ServerMessage::Drained));
        session.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_speech_times_out_and_is_forgotten() {
        let tutor = ScriptedTutor::Lines(vec!["{\"type\":\"speak\",\"text\":\"Hello?\"}\n"]);
        let state = AppState::for_tests(Arc::new(tutor));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::start(state, tx);

        session.handle(ClientMessage::SetVoiceEnabled { enabled: true }).await;
        session.handle(ask("Say something")).await;

        let messages = collect_until(&mut rx, |m| *m == ServerMessage::Drained).await;
        assert!(messages.iter().any(|m| matches!(m, ServerMessage::Speak { .. })));
        assert_eq!(messages.last(), Some(&ServerMessage::Drained));
        assert!(session.narrator.waiters().is_empty());
        session.shutdown();
    }
}
