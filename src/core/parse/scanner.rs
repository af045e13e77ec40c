//! Splits a message buffer into literal text and recognised tag spans.
//!
//! Two tag families are recognised: `<thinking>…</thinking>` and
//! `<tool_action …>…</tool_action>`. A tag whose closing marker has not arrived
//! yet extends to the end of the buffer and is reported as open, so partial
//! content stays visible while a response is still streaming.

use memchr::memchr;
use regex::Regex;
use std::sync::OnceLock;

const THINKING_OPEN: &str = "<thinking>";
const THINKING_CLOSE: &str = "</thinking>";
const TOOL_ACTION_CLOSE: &str = "</tool_action>";

/// Name used when a tool call's opening tag carries no `name` attribute.
pub const UNKNOWN_TOOL_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text,
    Thinking,
    ToolAction,
}

/// One contiguous span of a message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub raw: &'a str,
    /// Byte offset of `raw` inside the scanned buffer.
    pub start: usize,
    /// Tag spans: the closing marker was seen. Text spans: more buffer follows.
    pub closed: bool,
}

impl<'a> Segment<'a> {
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }

    pub fn is_blank(&self) -> bool {
        self.kind == SegmentKind::Text && self.raw.trim().is_empty()
    }

    /// Content between the tag wrappers; the whole span for text.
    pub fn inner(&self) -> &'a str {
        match self.kind {
            SegmentKind::Text => self.raw,
            SegmentKind::Thinking => {
                let body = &self.raw[THINKING_OPEN.len().min(self.raw.len())..];
                if self.closed {
                    &body[..body.len() - THINKING_CLOSE.len()]
                } else {
                    body
                }
            }
            SegmentKind::ToolAction => {
                let body = match self.raw.find('>') {
                    Some(pos) => &self.raw[pos + 1..],
                    None => "",
                };
                if self.closed && body.len() >= TOOL_ACTION_CLOSE.len() {
                    &body[..body.len() - TOOL_ACTION_CLOSE.len()]
                } else {
                    body
                }
            }
        }
    }

    /// Whether the opening tag of a tag span has been fully received.
    pub fn opening_complete(&self) -> bool {
        self.kind == SegmentKind::Text || self.raw.contains('>')
    }

    /// Tool name from the opening tag's `name` attribute.
    pub fn tool_name(&self) -> Option<&'a str> {
        if self.kind != SegmentKind::ToolAction {
            return None;
        }
        let opening = match self.raw.find('>') {
            Some(pos) => &self.raw[..pos],
            None => self.raw,
        };
        name_attr_pattern()
            .captures(opening)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Tag names fold ASCII case only, so matches keep the byte lengths `inner` assumes.
        Regex::new(concat!(
            r"(?s)(?P<thinking>(?i-u:<thinking>).*?(?:(?P<thinking_close>(?i-u:</thinking>))|\z))",
            r"|(?P<tool>(?i-u:<tool_action)\b.*?(?:(?P<tool_close>(?i-u:</tool_action>))|\z))",
        ))
        .expect("tag pattern is valid")
    })
}

fn name_attr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"name=['"]([^'"]+)['"]"#).expect("name pattern is valid"))
}

/// Split `content` into ordered segments.
///
/// The split is lossless: concatenating every `raw` in order reproduces
/// `content` byte for byte. Whitespace-only text spans are kept here and
/// dropped by the grouping stage.
pub fn scan(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    if content.is_empty() {
        return segments;
    }

    // No '<' anywhere means no tag can start.
    if memchr(b'<', content.as_bytes()).is_none() {
        segments.push(Segment {
            kind: SegmentKind::Text,
            raw: content,
            start: 0,
            closed: false,
        });
        return segments;
    }

    let mut cursor = 0;
    for caps in tag_pattern().captures_iter(content) {
        let (whole, kind, closed) = if let Some(m) = caps.name("thinking") {
            (m, SegmentKind::Thinking, caps.name("thinking_close").is_some())
        } else if let Some(m) = caps.name("tool") {
            (m, SegmentKind::ToolAction, caps.name("tool_close").is_some())
        } else {
            continue;
        };

        if whole.start() > cursor {
            segments.push(Segment {
                kind: SegmentKind::Text,
                raw: &content[cursor..whole.start()],
                start: cursor,
                closed: true,
            });
        }
        segments.push(Segment {
            kind,
            raw: whole.as_str(),
            start: whole.start(),
            closed,
        });
        cursor = whole.end();
    }

    if cursor < content.len() {
        segments.push(Segment {
            kind: SegmentKind::Text,
            raw: &content[cursor..],
            start: cursor,
            closed: false,
        });
    }

    segments
}
