use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("speech engine failed: {0}")]
    Engine(String),
    #[error("speech engine is not available")]
    Unavailable,
}

/// A speech engine the director awaits while narrating.
///
/// `speak` resolves once playback has finished. The director treats an error
/// exactly like a finished playback.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn speak(&self, text: &str, voice: Option<&str>) -> Result<(), NarrationError>;
}
