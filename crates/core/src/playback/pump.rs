use super::action::Action;
use super::director::DirectorHandle;
use super::parser::{ParseError, StreamParser};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::{info, warn};

/// What happened while feeding one stream into the director.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpSummary {
    pub enqueued: usize,
    pub dropped: usize,
    /// The stream ended with a transport error, or the director stopped first.
    pub failed: bool,
}

/// Parses a teaching stream chunk by chunk and enqueues every valid action.
///
/// Bad lines are logged and dropped. A transport error ends the pump without
/// retrying; whatever was already enqueued still plays.
pub async fn pump_stream<S, E>(mut stream: S, director: &DirectorHandle) -> PumpSummary
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut parser = StreamParser::new();
    let mut summary = PumpSummary::default();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "Teaching stream failed; aborting");
                summary.failed = true;
                break;
            }
        };
        if !forward(parser.push(&chunk), director, &mut summary) {
            return summary;
        }
    }
    if !summary.failed {
        forward(parser.finish(), director, &mut summary);
    }

    info!(
        enqueued = summary.enqueued,
        dropped = summary.dropped,
        failed = summary.failed,
        "Teaching stream finished"
    );
    summary
}

fn forward(
    results: Vec<Result<Action, ParseError>>,
    director: &DirectorHandle,
    summary: &mut PumpSummary,
) -> bool {
    for result in results {
        match result {
            Ok(action) => {
                if director.enqueue(action).is_err() {
                    warn!("Director stopped while the stream was still open");
                    summary.failed = true;
                    return false;
                }
                summary.enqueued += 1;
            }
            Err(e) => {
                warn!(error = %e, "Dropping unparsable teaching line");
                summary.dropped += 1;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{Director, DirectorConfig, Speaker};
    use futures::stream;
    use tokio::sync::mpsc;

    fn silent() -> DirectorConfig {
        DirectorConfig {
            narration_enabled: false,
            ..Default::default()
        }
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, String>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_feeds_director_and_drops_bad_lines() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handle, task) = Director::spawn(silent(), None, tx);

        let body = chunks(&[
            "data: {\"type\":\"speak\",\"text\":\"Let's\"}\n{\"type\":\"spe",
            "ak\",\"text\":\"begin\"}\nnot json\n",
            "{\"type\":\"layout\",\"mode\":\"SPLIT_MODE\"}\n",
            "{\"type\":\"code\",\"content\":\"fn main() {}\"}",
        ]);
        let summary = pump_stream(body, &handle).await;
        drop(handle);

        assert_eq!(
            summary,
            PumpSummary {
                enqueued: 5,
                dropped: 1,
                failed: false
            }
        );

        let stage = task.await.unwrap();
        assert_eq!(stage.transcript.len(), 1);
        assert_eq!(stage.transcript[0].role, Speaker::Assistant);
        assert_eq!(stage.transcript[0].text, "Let's begin");
        assert_eq!(stage.code, "fn main() {}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_stops_on_transport_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handle, task) = Director::spawn(silent(), None, tx);

        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"type\":\"speak\",\"text\":\"partial\"}\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"{\"type\":\"speak\",\"text\":\"never\"}\n")),
        ]);
        let summary = pump_stream(body, &handle).await;
        drop(handle);

        assert!(summary.failed);
        assert_eq!(summary.enqueued, 1);
        let stage = task.await.unwrap();
        assert_eq!(stage.transcript[0].text, "partial");
    }

    #[tokio::test]
    async fn test_pump_reports_stopped_director() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handle, task) = Director::spawn(silent(), None, tx);
        task.abort();
        let _ = task.await;

        let summary = pump_stream(chunks(&["{\"type\":\"speak\",\"text\":\"x\"}\n"]), &handle).await;
        assert!(summary.failed);
        assert_eq!(summary.enqueued, 0);
    }
}
