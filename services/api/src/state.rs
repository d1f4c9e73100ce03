//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the progress store and the tutor client.

use crate::config::Config;
use outlrn_core::{progress::ProgressStore, tutor_client::TutorClient};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub progress: ProgressStore,
    pub tutor_client: Arc<dyn TutorClient>,
    pub config: Arc<Config>,
}

#[cfg(test)]
impl AppState {
    /// In-memory state for handler and session tests.
    pub fn for_tests(tutor_client: Arc<dyn TutorClient>) -> Arc<Self> {
        use outlrn_core::storage::MemoryStorage;
        use std::{path::PathBuf, time::Duration};

        let config = Config {
            bind_address: ([127, 0, 0, 1], 0).into(),
            progress_dir: PathBuf::from("./data/progress"),
            tutor_stream_url: "http://localhost:8000/teach".to_string(),
            tutor_api_key: None,
            narration_voice: None,
            speech_timeout: Some(Duration::from_secs(5)),
            log_level: tracing::Level::INFO,
        };
        Arc::new(Self {
            progress: ProgressStore::new(Arc::new(MemoryStorage::default())),
            tutor_client,
            config: Arc::new(config),
        })
    }
}
