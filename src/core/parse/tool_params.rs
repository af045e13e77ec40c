//! Detail parsing for a single `<tool_action>` call.
//!
//! Calls are parsed lazily, when a tool group is expanded. The body is treated
//! as XML; a call truncated mid-stream gets a synthetic closing tag first.

use roxmltree::Document;
use thiserror::Error;
use tracing::debug;

use super::grouper::ToolCall;

const TOOL_ACTION_CLOSE: &str = "</tool_action>";

/// One child element of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParam {
    /// Element name.
    pub key: String,
    pub attributes: Vec<(String, String)>,
    /// Text content of the element and its descendants, trimmed.
    pub value: String,
}

impl ToolParam {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Recovered failure for one call; siblings are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tool call #{index} could not be parsed: {reason}")]
pub struct ToolParseError {
    pub index: usize,
    pub reason: String,
    /// The call's raw span, kept for debugging.
    pub raw: String,
}

/// Parse one call's raw span into its ordered parameters.
///
/// Keys are unique: a repeated element replaces the earlier value but keeps
/// the position where the key first appeared.
pub fn parse_tool_params(index: usize, raw: &str) -> Result<Vec<ToolParam>, ToolParseError> {
    let source = close_if_truncated(raw);
    let doc = Document::parse(&source).map_err(|err| {
        debug!(index, error = %err, "tool call body is not well-formed");
        ToolParseError {
            index,
            reason: err.to_string(),
            raw: raw.to_string(),
        }
    })?;

    let mut params: Vec<ToolParam> = Vec::new();
    for child in doc.root_element().children().filter(|n| n.is_element()) {
        let value: String = child
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        let param = ToolParam {
            key: child.tag_name().name().to_string(),
            attributes: child
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            value: value.trim().to_string(),
        };
        match params.iter_mut().find(|p| p.key == param.key) {
            Some(existing) => *existing = param,
            None => params.push(param),
        }
    }
    Ok(params)
}

/// Convenience wrapper over [`parse_tool_params`] for a grouped call.
pub fn parse_call(call: &ToolCall) -> Result<Vec<ToolParam>, ToolParseError> {
    parse_tool_params(call.index, &call.raw)
}

fn close_if_truncated(raw: &str) -> String {
    let trimmed = raw.trim_end();
    let has_close = trimmed.len() >= TOOL_ACTION_CLOSE.len()
        && trimmed
            .get(trimmed.len() - TOOL_ACTION_CLOSE.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(TOOL_ACTION_CLOSE));
    if has_close {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() + TOOL_ACTION_CLOSE.len() + 1);
    out.push_str(raw);
    // An opening tag cut off before its '>' cannot take a closing tag yet.
    if !raw.contains('>') {
        out.push('>');
    }
    out.push_str(TOOL_ACTION_CLOSE);
    out
}
