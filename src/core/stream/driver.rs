use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::controller::{ControllerError, ConversationView, RenderUpdate};
use crate::core::message::Message;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    Error(String),
    End,
}

/// How [`drive_stream`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Finished,
    Cancelled,
    Failed(String),
}

/// What a transport needs to produce a response.
#[derive(Debug, Clone, Default)]
pub struct TransportRequest {
    pub prior_messages: Vec<Message>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

/// Delivers a response as ordered [`StreamEvent`]s.
///
/// Implementations send zero or more chunks followed by `End`, or an `Error`.
/// They should return promptly once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: TransportRequest,
        tx: mpsc::UnboundedSender<StreamEvent>,
        cancel: CancellationToken,
    );
}

/// Replays a fixed response in chunks of `chunk_chars` characters.
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    text: String,
    chunk_chars: usize,
    delay: Duration,
}

impl ReplayTransport {
    pub fn new(text: impl Into<String>, chunk_chars: usize) -> Self {
        Self {
            text: text.into(),
            chunk_chars: chunk_chars.max(1),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn chunks(&self) -> Vec<String> {
        let chars: Vec<char> = self.text.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send(
        &self,
        _request: TransportRequest,
        tx: mpsc::UnboundedSender<StreamEvent>,
        cancel: CancellationToken,
    ) {
        for chunk in self.chunks() {
            if cancel.is_cancelled() {
                return;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if tx.send(StreamEvent::Chunk(chunk)).is_err() {
                return;
            }
        }
        let _ = tx.send(StreamEvent::End);
    }
}

/// Apply stream events to `message_id` until the stream ends or is cancelled.
///
/// Events are applied one at a time; `on_update` sees every committed render.
/// A closed channel without `End` counts as a normal finish.
pub async fn drive_stream<F>(
    view: &mut ConversationView,
    message_id: &str,
    rx: &mut mpsc::UnboundedReceiver<StreamEvent>,
    cancel: &CancellationToken,
    mut on_update: F,
) -> Result<StreamOutcome, ControllerError>
where
    F: FnMut(&RenderUpdate),
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Some(update) = view.stop() {
                    on_update(&update);
                }
                return Ok(StreamOutcome::Cancelled);
            }
            event = rx.recv() => match event {
                Some(StreamEvent::Chunk(text)) => {
                    let update = view.append_chunk(message_id, &text)?;
                    on_update(&update);
                }
                Some(StreamEvent::Error(message)) => {
                    let update = view.fail(message_id, &message)?;
                    on_update(&update);
                    return Ok(StreamOutcome::Failed(message));
                }
                Some(StreamEvent::End) | None => {
                    debug!(message_id, "stream closed");
                    let update = view.finish(message_id)?;
                    on_update(&update);
                    return Ok(StreamOutcome::Finished);
                }
            }
        }
    }
}

/// Start an exchange, run `transport` and drive its events into `view`.
pub async fn run_exchange<T, F>(
    view: &mut ConversationView,
    transport: &T,
    user_text: &str,
    model: Option<String>,
    cancel: CancellationToken,
    on_update: F,
) -> Result<StreamOutcome, ControllerError>
where
    T: Transport + ?Sized,
    F: FnMut(&RenderUpdate),
{
    let request = TransportRequest {
        prior_messages: view.messages().cloned().collect(),
        model: model.clone(),
        provider: None,
    };
    let message_id = view.begin_exchange(user_text, model)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let send = transport.send(request, tx, cancel.clone());
    let drive = drive_stream(view, &message_id, &mut rx, &cancel, on_update);
    let ((), outcome) = tokio::join!(send, drive);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse::RenderNode;
    use crate::core::stream::controller::{Completion, StreamState};
    use crate::ui::theme::{Theme, ThemeName};

    fn view() -> ConversationView {
        ConversationView::new(Theme::from_name(ThemeName::Dark))
    }

    #[test]
    fn replay_splits_on_characters() {
        let transport = ReplayTransport::new("héllo", 2);
        assert_eq!(transport.chunks(), vec!["hé", "ll", "o"]);
    }

    #[tokio::test]
    async fn drives_chunks_until_end() {
        let mut view = view();
        let id = view.begin_exchange("q", None).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for part in ["Let me think.\n<thin", "king>analyzing...</thinking>\n", "done"] {
            tx.send(StreamEvent::Chunk(part.to_string())).unwrap();
        }
        tx.send(StreamEvent::End).unwrap();

        let mut updates = 0;
        let outcome = drive_stream(&mut view, &id, &mut rx, &CancellationToken::new(), |_| {
            updates += 1
        })
        .await
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Finished);
        assert_eq!(updates, 4);
        let kinds: Vec<_> = view.nodes(&id).unwrap().iter().map(RenderNode::kind).collect();
        assert_eq!(kinds, vec!["markdown", "thinking", "markdown"]);
    }

    #[tokio::test]
    async fn error_event_fails_the_message() {
        let mut view = view();
        let id = view.begin_exchange("q", None).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Chunk("part".into())).unwrap();
        tx.send(StreamEvent::Error("HTTP 502".into())).unwrap();

        let outcome = drive_stream(&mut view, &id, &mut rx, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Failed("HTTP 502".into()));
        assert_eq!(view.completion(&id), Some(&Completion::Failed("HTTP 502".into())));
        assert_eq!(view.message(&id).unwrap().content, "part");
    }

    #[tokio::test]
    async fn cancellation_stops_between_chunks() {
        let mut view = view();
        let id = view.begin_exchange("q", None).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tx.send(StreamEvent::Chunk("<thinking>half".into())).unwrap();

        let trigger = cancel.clone();
        let outcome = drive_stream(&mut view, &id, &mut rx, &cancel, |_| trigger.cancel())
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(view.state(&id), Some(StreamState::Completed));
        assert_eq!(view.message(&id).unwrap().content, "<thinking>half");
        let nodes = view.nodes(&id).unwrap();
        assert!(matches!(
            &nodes[0],
            RenderNode::Thinking { content, closed: false } if content == "half"
        ));
        drop(tx);
    }

    #[tokio::test]
    async fn run_exchange_replays_a_transport() {
        let mut view = view();
        let transport = ReplayTransport::new("<tool_action name=\"search\"><q>x</q></tool_action>", 7);
        let mut running_seen = false;
        let outcome = run_exchange(
            &mut view,
            &transport,
            "find x",
            Some("m".into()),
            CancellationToken::new(),
            |update| {
                if let Some(RenderNode::ToolGroup(group)) = update.nodes.last() {
                    running_seen |= group.state.is_running();
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Finished);
        assert!(running_seen);
        let id = view.messages().last().unwrap().id.clone();
        let nodes = view.nodes(&id).unwrap();
        let RenderNode::ToolGroup(group) = &nodes[0] else {
            panic!("expected tool group");
        };
        assert!(!group.state.is_running());
        assert_eq!(group.name, "search");
    }
}
