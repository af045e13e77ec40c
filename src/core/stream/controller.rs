use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::message::Message;
use crate::core::parse::{NodeCache, RenderNode};
use crate::core::scroll::{ScrollAction, ScrollTracker};
use crate::ui::markdown::{Block, MarkdownRenderer};
use crate::ui::theme::Theme;

/// Messages kept in a conversation before the oldest is dropped.
pub const MAX_MESSAGES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Pending,
    Streaming,
    Completed,
}

/// How a stream reached [`StreamState::Completed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Interrupted,
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("a response is already streaming")]
    AlreadyStreaming,
    #[error("unknown message {0}")]
    UnknownMessage(String),
    #[error("message {0} is not streaming")]
    NotStreaming(String),
}

/// Result of re-deriving one message after a change.
#[derive(Debug, Clone)]
pub struct RenderUpdate {
    pub message_id: String,
    pub nodes: Arc<[RenderNode]>,
    /// Leading nodes identical to the previous render.
    pub unchanged_prefix: usize,
    pub scroll: ScrollAction,
}

impl RenderUpdate {
    /// Nodes that differ from the previous render.
    pub fn changed(&self) -> &[RenderNode] {
        &self.nodes[self.unchanged_prefix..]
    }
}

/// Render caches with the lifetime of one conversation view.
#[derive(Debug)]
pub struct RenderCaches {
    pub nodes: NodeCache,
    pub markdown: MarkdownRenderer,
}

impl RenderCaches {
    pub fn new(theme: Theme) -> Self {
        Self {
            nodes: NodeCache::default(),
            markdown: MarkdownRenderer::new(theme),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.markdown.clear();
    }
}

#[derive(Debug)]
struct Entry {
    message: Message,
    state: StreamState,
    nodes: Arc<[RenderNode]>,
    completion: Option<Completion>,
}

/// Owns the messages of one conversation and re-derives their render nodes.
///
/// Only one message streams at a time. Every mutation goes through `&mut self`,
/// so a stop request can only land between two chunks.
#[derive(Debug)]
pub struct ConversationView {
    entries: VecDeque<Entry>,
    active: Option<String>,
    caches: RenderCaches,
    scroll: ScrollTracker,
    search: String,
    notice: Option<String>,
}

impl ConversationView {
    pub fn new(theme: Theme) -> Self {
        Self {
            entries: VecDeque::new(),
            active: None,
            caches: RenderCaches::new(theme),
            scroll: ScrollTracker::default(),
            search: String::new(),
            notice: None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.entry(id).map(|e| &e.message)
    }

    pub fn state(&self, id: &str) -> Option<StreamState> {
        self.entry(id).map(|e| e.state)
    }

    pub fn completion(&self, id: &str) -> Option<&Completion> {
        self.entry(id).and_then(|e| e.completion.as_ref())
    }

    /// Last committed render for a message.
    pub fn nodes(&self, id: &str) -> Option<Arc<[RenderNode]>> {
        self.entry(id).map(|e| Arc::clone(&e.nodes))
    }

    pub fn caches(&self) -> &RenderCaches {
        &self.caches
    }

    /// Render a markdown node through the conversation's markdown cache.
    pub fn markdown(&mut self, source: &str) -> Arc<[Block]> {
        self.caches.markdown.render_cached(source)
    }

    pub fn markdown_renderer(&mut self) -> &mut MarkdownRenderer {
        &mut self.caches.markdown
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.caches.markdown.set_theme(theme);
    }

    /// Take the pending transient notification, if any.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Append a finished message, such as one loaded from history.
    pub fn push_message(&mut self, message: Message) -> RenderUpdate {
        let id = message.id.clone();
        self.push_entry(message, StreamState::Completed);
        // The streaming message is no longer last, so its trailing group settles.
        if let Some(active) = self.active.clone() {
            self.rerender(&active, true);
        }
        self.rerender(&id, false)
    }

    /// Add the user's message and an empty assistant placeholder to stream into.
    ///
    /// Returns the placeholder's id.
    pub fn begin_exchange(
        &mut self,
        user_text: &str,
        model_id: Option<String>,
    ) -> Result<String, ControllerError> {
        if self.is_streaming() {
            return Err(ControllerError::AlreadyStreaming);
        }

        let user = Message::user(user_text);
        let user_id = user.id.clone();
        self.push_entry(user, StreamState::Completed);
        self.rerender(&user_id, false);

        let placeholder = Message::assistant_placeholder(model_id);
        let id = placeholder.id.clone();
        self.push_entry(placeholder, StreamState::Pending);
        self.active = Some(id.clone());
        self.scroll.jump_to_bottom();
        debug!(message_id = %id, "stream pending");
        Ok(id)
    }

    /// Append a chunk to the streaming message and re-derive its nodes.
    pub fn append_chunk(&mut self, id: &str, chunk: &str) -> Result<RenderUpdate, ControllerError> {
        self.ensure_active(id)?;
        let entry = self
            .entry_mut(id)
            .ok_or_else(|| ControllerError::UnknownMessage(id.to_string()))?;
        if entry.state == StreamState::Pending {
            entry.state = StreamState::Streaming;
            debug!(message_id = %id, "stream started");
        }
        entry.message.content.push_str(chunk);
        Ok(self.rerender(id, true))
    }

    /// Stop the active stream, keeping whatever content has arrived.
    ///
    /// Returns `None` when nothing is streaming.
    pub fn stop(&mut self) -> Option<RenderUpdate> {
        let id = self.active.clone()?;
        debug!(message_id = %id, "stream interrupted by user");
        Some(self.complete(&id, Completion::Interrupted))
    }

    pub fn finish(&mut self, id: &str) -> Result<RenderUpdate, ControllerError> {
        self.ensure_active(id)?;
        debug!(message_id = %id, "stream finished");
        Ok(self.complete(id, Completion::Finished))
    }

    /// End the stream with a transport error. Content received so far stays.
    pub fn fail(&mut self, id: &str, error: &str) -> Result<RenderUpdate, ControllerError> {
        self.ensure_active(id)?;
        warn!(message_id = %id, error, "stream failed");
        self.notice = Some(error.to_string());
        Ok(self.complete(id, Completion::Failed(error.to_string())))
    }

    pub fn delete_message(&mut self, id: &str) -> Result<(), ControllerError> {
        if self.active.as_deref() == Some(id) {
            return Err(ControllerError::AlreadyStreaming);
        }
        let position = self
            .entries
            .iter()
            .position(|e| e.message.id == id)
            .ok_or_else(|| ControllerError::UnknownMessage(id.to_string()))?;
        self.entries.remove(position);
        Ok(())
    }

    /// Filter visible messages. A non-empty query suspends auto-scroll.
    pub fn set_search(&mut self, query: &str) {
        self.search = query.trim().to_string();
        self.scroll.set_searching(!self.search.is_empty());
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn visible_messages(&self) -> Vec<&Message> {
        self.messages()
            .filter(|m| m.matches_query(&self.search))
            .collect()
    }

    pub fn on_viewport(&mut self, scroll_top: u32, scroll_height: u32, client_height: u32) {
        self.scroll
            .on_viewport(scroll_top, scroll_height, client_height);
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll.jump_to_bottom();
    }

    /// Drop all messages and caches when the view is torn down.
    pub fn clear(&mut self) {
        if let Some(id) = self.active.take() {
            debug!(message_id = %id, "stream dropped with view");
        }
        self.entries.clear();
        self.caches.clear();
        self.search.clear();
        self.scroll = ScrollTracker::default();
        self.notice = None;
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.message.id == id)
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.message.id == id)
    }

    fn ensure_active(&self, id: &str) -> Result<(), ControllerError> {
        if self.active.as_deref() == Some(id) {
            return Ok(());
        }
        if self.entry(id).is_none() {
            return Err(ControllerError::UnknownMessage(id.to_string()));
        }
        Err(ControllerError::NotStreaming(id.to_string()))
    }

    fn push_entry(&mut self, message: Message, state: StreamState) {
        self.entries.push_back(Entry {
            message,
            state,
            nodes: Arc::from(Vec::new()),
            completion: None,
        });
        while self.entries.len() > MAX_MESSAGES {
            if let Some(old) = self.entries.pop_front() {
                debug!(message_id = %old.message.id, "dropped oldest message");
            }
        }
    }

    fn complete(&mut self, id: &str, completion: Completion) -> RenderUpdate {
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.state = StreamState::Completed;
            entry.completion = Some(completion);
        }
        self.rerender(id, false)
    }

    /// `streaming` only marks running tool groups while `id` is the last message.
    fn rerender(&mut self, id: &str, streaming: bool) -> RenderUpdate {
        let scroll = self.scroll.after_update();
        let streaming = streaming && self.entries.back().is_some_and(|e| e.message.id == id);
        let Some(entry) = self.entries.iter_mut().find(|e| e.message.id == id) else {
            return RenderUpdate {
                message_id: id.to_string(),
                nodes: Arc::from(Vec::new()),
                unchanged_prefix: 0,
                scroll,
            };
        };

        let nodes = self.caches.nodes.nodes(&entry.message.content, streaming);
        let unchanged_prefix = entry
            .nodes
            .iter()
            .zip(nodes.iter())
            .take_while(|(old, new)| old == new)
            .count();
        entry.nodes = Arc::clone(&nodes);

        RenderUpdate {
            message_id: id.to_string(),
            nodes,
            unchanged_prefix,
            scroll,
        }
    }
}
