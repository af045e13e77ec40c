//! Message content parsing: tag scanning, tool-call grouping and node building.
//!
//! The pipeline is pure: [`build_nodes`] maps a content buffer and a streaming
//! flag to a node list, and is re-run on every streamed chunk.

pub mod grouper;
pub mod nodes;
pub mod scanner;
pub mod tool_params;

pub use grouper::{group_segments, ToolCall, ToolCallGroup, ToolGroupState, Unit};
pub use nodes::{build_nodes, is_html_document, NodeCache, RenderNode};
pub use scanner::{scan, Segment, SegmentKind, UNKNOWN_TOOL_NAME};
pub use tool_params::{parse_call, parse_tool_params, ToolParam, ToolParseError};
