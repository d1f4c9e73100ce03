use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use tracing::debug;

/// The raw body of a teaching response, as it arrives.
pub type TeachingStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// One user turn sent to the tutor backend.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TutorRequest {
    pub message: String,
    pub student_id: String,
    pub company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
}

/// A backend that answers a user turn with a stream of teaching events.
#[async_trait]
pub trait TutorClient: Send + Sync {
    async fn open_stream(&self, request: &TutorRequest) -> Result<TeachingStream>;
}

/// Talks to a tutor backend over HTTP.
pub struct HttpTutorClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTutorClient {
    /// Creates a client for the given endpoint.
    ///
    /// # Arguments
    ///
    /// * `url` - The endpoint accepting a JSON `TutorRequest` and replying with NDJSON.
    /// * `api_key` - Optional bearer token.
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl TutorClient for HttpTutorClient {
    async fn open_stream(&self, request: &TutorRequest) -> Result<TeachingStream> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to reach tutor backend")?
            .error_for_status()
            .context("Tutor backend rejected the request")?;
        debug!(status = %response.status(), "Teaching stream opened");

        Ok(response.bytes_stream().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_missing_skill() {
        let request = TutorRequest {
            message: "Explain props".into(),
            student_id: "s1".into(),
            company_id: "c1".into(),
            skill: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"], "Explain props");
        assert!(json.get("skill").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let client = HttpTutorClient::new("http://127.0.0.1:9/teach", None);
        let request = TutorRequest {
            message: "hi".into(),
            student_id: "s1".into(),
            company_id: "c1".into(),
            skill: Some("react".into()),
        };
        assert!(client.open_stream(&request).await.is_err());
    }
}
