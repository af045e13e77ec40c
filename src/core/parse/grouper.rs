//! Collapses runs of same-named tool calls into display groups.

use super::scanner::{Segment, SegmentKind, UNKNOWN_TOOL_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolGroupState {
    Running,
    Completed,
}

impl ToolGroupState {
    pub fn is_running(self) -> bool {
        self == ToolGroupState::Running
    }
}

/// A single `<tool_action>` span inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Position of the call within its group, starting at 0.
    pub index: usize,
    pub raw: String,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallGroup {
    pub name: String,
    pub calls: Vec<ToolCall>,
    pub state: ToolGroupState,
}

impl ToolCallGroup {
    fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Vec::new(),
            state: ToolGroupState::Completed,
        }
    }

    fn push(&mut self, segment: &Segment<'_>) {
        self.calls.push(ToolCall {
            index: self.calls.len(),
            raw: segment.raw.to_string(),
            closed: segment.closed,
        });
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Output of the grouping pass: a non-tool segment or a flushed tool group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit<'a> {
    Segment(Segment<'a>),
    Group(ToolCallGroup),
}

/// Group consecutive tool-action segments that share a tool name.
///
/// A change of name, or any non-blank segment in between, flushes the current
/// group. Whitespace-only text is dropped and does not break a run. A call
/// whose opening tag is still arriving joins the run in progress. When
/// `streaming` is set, a group that ends up as the last unit is marked
/// [`ToolGroupState::Running`].
pub fn group_segments<'a>(segments: &[Segment<'a>], streaming: bool) -> Vec<Unit<'a>> {
    let mut units = Vec::with_capacity(segments.len());
    let mut current: Option<ToolCallGroup> = None;

    for segment in segments {
        if segment.is_blank() {
            continue;
        }
        if segment.kind != SegmentKind::ToolAction {
            if let Some(group) = current.take() {
                units.push(Unit::Group(group));
            }
            units.push(Unit::Segment(*segment));
            continue;
        }

        // The name is not known until the opening tag is complete; hold the
        // call in the current run instead of flashing an "Unknown" group.
        if !segment.opening_complete() {
            if let Some(group) = current.as_mut() {
                group.push(segment);
                continue;
            }
        }

        let name = segment.tool_name().unwrap_or(UNKNOWN_TOOL_NAME);
        match current.as_mut() {
            Some(group) if group.name == name => group.push(segment),
            _ => {
                if let Some(group) = current.take() {
                    units.push(Unit::Group(group));
                }
                let mut group = ToolCallGroup::start(name);
                group.push(segment);
                current = Some(group);
            }
        }
    }

    if let Some(group) = current.take() {
        units.push(Unit::Group(group));
    }

    if streaming {
        if let Some(Unit::Group(group)) = units.last_mut() {
            group.state = ToolGroupState::Running;
        }
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse::scanner::scan;

    fn groups(units: &[Unit<'_>]) -> Vec<(String, usize, ToolGroupState)> {
        units
            .iter()
            .filter_map(|u| match u {
                Unit::Group(g) => Some((g.name.clone(), g.len(), g.state)),
                Unit::Segment(_) => None,
            })
            .collect()
    }

    fn call(name: &str, q: &str) -> String {
        format!("<tool_action name=\"{name}\"><q>{q}</q></tool_action>")
    }

    #[test]
    fn a_a_b_a_produces_three_groups_in_order() {
        let content = [
            call("A", "1"),
            call("A", "2"),
            call("B", "3"),
            call("A", "4"),
        ]
        .join("\n");
        let units = group_segments(&scan(&content), false);

        let summary = groups(&units);
        assert_eq!(
            summary,
            vec![
                ("A".to_string(), 2, ToolGroupState::Completed),
                ("B".to_string(), 1, ToolGroupState::Completed),
                ("A".to_string(), 1, ToolGroupState::Completed),
            ]
        );
        assert_eq!(units.len(), 3, "blank separators are dropped");
    }

    #[test]
    fn intervening_text_flushes_a_group() {
        let content = format!("{}Then:{}", call("A", "1"), call("A", "2"));
        let units = group_segments(&scan(&content), false);
        assert_eq!(units.len(), 3);
        assert_eq!(groups(&units).len(), 2);
    }

    #[test]
    fn calls_keep_their_order_and_index() {
        let content = format!("{}{}", call("A", "first"), call("A", "second"));
        let units = group_segments(&scan(&content), false);
        let Unit::Group(group) = &units[0] else {
            panic!("expected a group");
        };
        assert_eq!(group.calls[0].index, 0);
        assert!(group.calls[0].raw.contains("first"));
        assert_eq!(group.calls[1].index, 1);
        assert!(group.calls[1].raw.contains("second"));
    }

    #[test]
    fn missing_name_falls_back_to_unknown() {
        let units = group_segments(&scan("<tool_action><q>x</q></tool_action>"), false);
        assert_eq!(groups(&units)[0].0, UNKNOWN_TOOL_NAME);
    }

    #[test]
    fn only_a_trailing_group_of_a_streaming_message_is_running() {
        let content = format!("{}{}", call("A", "1"), call("B", "2"));
        let units = group_segments(&scan(&content), true);
        let states: Vec<_> = groups(&units).into_iter().map(|g| g.2).collect();
        assert_eq!(
            states,
            vec![ToolGroupState::Completed, ToolGroupState::Running]
        );

        let trailing_text = format!("{}done", call("A", "1"));
        let units = group_segments(&scan(&trailing_text), true);
        assert_eq!(groups(&units)[0].2, ToolGroupState::Completed);
    }

    #[test]
    fn call_with_partial_opening_tag_joins_the_current_run() {
        let content = format!("{}\n<tool_action name=\"B", call("A", "1"));
        let units = group_segments(&scan(&content), true);
        assert_eq!(
            groups(&units),
            vec![("A".to_string(), 2, ToolGroupState::Running)]
        );

        let lone = group_segments(&scan("<tool_action name=\"B"), true);
        assert_eq!(groups(&lone)[0].0, UNKNOWN_TOOL_NAME);
    }

    #[test]
    fn finished_messages_have_no_running_groups() {
        let units = group_segments(&scan("<tool_action name=\"search\">"), false);
        assert_eq!(groups(&units)[0].2, ToolGroupState::Completed);
    }
}
