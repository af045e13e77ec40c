//! Turns a message buffer into the typed node list handed to the view layer.

use std::sync::Arc;

use tracing::trace;

use super::grouper::{group_segments, ToolCallGroup, Unit};
use super::scanner::{scan, SegmentKind};
use crate::utils::cache::FifoCache;

/// Entries kept by [`NodeCache`] before the oldest is dropped.
pub const NODE_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    Markdown { source: String },
    Thinking { content: String, closed: bool },
    ToolGroup(ToolCallGroup),
    /// A whole message that is a complete HTML document.
    HtmlDocument { source: String },
}

impl RenderNode {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderNode::Markdown { .. } => "markdown",
            RenderNode::Thinking { .. } => "thinking",
            RenderNode::ToolGroup(_) => "toolGroup",
            RenderNode::HtmlDocument { .. } => "htmlDocument",
        }
    }
}

/// True when the trimmed content opens with `<!DOCTYPE html` or `<html`.
pub fn is_html_document(content: &str) -> bool {
    let head = content.trim_start();
    starts_with_ignore_case(head, "<!doctype html") || starts_with_ignore_case(head, "<html")
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Derive the node list for `content`.
///
/// Pure in `(content, streaming)`: equal inputs always produce equal output.
pub fn build_nodes(content: &str, streaming: bool) -> Vec<RenderNode> {
    if is_html_document(content) {
        return vec![RenderNode::HtmlDocument {
            source: content.trim().to_string(),
        }];
    }

    let segments = scan(content);
    group_segments(&segments, streaming)
        .into_iter()
        .filter_map(|unit| match unit {
            Unit::Group(group) => Some(RenderNode::ToolGroup(group)),
            Unit::Segment(segment) => match segment.kind {
                SegmentKind::Text => {
                    let source = segment.raw.trim_matches(['\r', '\n']);
                    (!source.trim().is_empty()).then(|| RenderNode::Markdown {
                        source: source.to_string(),
                    })
                }
                SegmentKind::Thinking => Some(RenderNode::Thinking {
                    content: segment.inner().trim().to_string(),
                    closed: segment.closed,
                }),
                // Tool spans always arrive inside a group.
                SegmentKind::ToolAction => None,
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ContentKey {
    digest: u32,
    len: usize,
    streaming: bool,
}

impl ContentKey {
    fn of(content: &str, streaming: bool) -> Self {
        Self {
            digest: crc32fast::hash(content.as_bytes()),
            len: content.len(),
            streaming,
        }
    }
}

/// Memoizes [`build_nodes`] by content hash.
#[derive(Debug)]
pub struct NodeCache {
    entries: FifoCache<ContentKey, Arc<[RenderNode]>>,
    hits: u64,
    misses: u64,
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new(NODE_CACHE_CAPACITY)
    }
}

impl NodeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FifoCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn nodes(&mut self, content: &str, streaming: bool) -> Arc<[RenderNode]> {
        let key = ContentKey::of(content, streaming);
        if let Some(nodes) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(nodes);
        }
        self.misses += 1;
        let nodes: Arc<[RenderNode]> = build_nodes(content, streaming).into();
        let evicted = self.entries.put(key, Arc::clone(&nodes));
        if !evicted.is_empty() {
            trace!(count = evicted.len(), "evicted node cache entries");
        }
        nodes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
