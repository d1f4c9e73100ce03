//! Narration relayed to the browser's speech synthesis.
//!
//! The server has no audio device: each utterance is sent to the client as a
//! `speak` message and the narrator waits until the client reports back that
//! playback ended or failed.

use super::protocol::ServerMessage;
use async_trait::async_trait;
use outlrn_core::playback::{NarrationError, Narrator};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type Waiters = HashMap<u64, oneshot::Sender<Result<(), NarrationError>>>;

pub struct RelayNarrator {
    outgoing: mpsc::UnboundedSender<ServerMessage>,
    next_id: AtomicU64,
    pending: Mutex<Waiters>,
}

impl RelayNarrator {
    pub fn new(outgoing: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            outgoing,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the utterance `id` with the client's report.
    pub fn finish(&self, id: u64, outcome: Result<(), NarrationError>) {
        match self.waiters().remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(outcome);
            }
            None => debug!(id, "Ignoring speech report for unknown utterance"),
        }
    }

    pub(super) fn waiters(&self) -> MutexGuard<'_, Waiters> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forgets an utterance's waiter when its `speak` future ends or is dropped.
struct PendingUtterance<'a> {
    narrator: &'a RelayNarrator,
    id: u64,
}

impl Drop for PendingUtterance<'_> {
    fn drop(&mut self) {
        self.narrator.waiters().remove(&self.id);
    }
}

#[async_trait]
impl Narrator for RelayNarrator {
    async fn speak(&self, text: &str, voice: Option<&str>) -> Result<(), NarrationError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.waiters().insert(id, tx);
        let _pending = PendingUtterance { narrator: self, id };

        let msg = ServerMessage::Speak {
            id,
            text: text.to_string(),
            voice: voice.map(str::to_string),
        };
        if self.outgoing.send(msg).is_err() {
            return Err(NarrationError::Unavailable);
        }

        rx.await.map_err(|_| NarrationError::Unavailable)?
    }
}
