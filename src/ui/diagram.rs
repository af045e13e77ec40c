//! Diagram rendering for ```` ```mermaid ```` fences.
//!
//! Rendering is a pluggable collaborator. Failures never reach the parser: the
//! markdown layer turns a [`DiagramError`] into an inline error block.

use crate::ui::theme::Theme;
use ratatui::text::{Line, Span};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("diagram source is empty")]
    Empty,
    #[error("unsupported diagram type `{0}`")]
    UnsupportedType(String),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

pub trait DiagramRenderer: Send + Sync {
    fn render(&self, source: &str, theme: &Theme) -> Result<Vec<Line<'static>>, DiagramError>;
}

const KNOWN_TYPES: &[&str] = &[
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "journey",
    "mindmap",
    "timeline",
];

const ARROWS: &[(&str, &str)] = &[
    ("-->>", " ⇢ "),
    ("->>", " → "),
    ("-->", " → "),
    ("==>", " ⇒ "),
    ("-.->", " ⇢ "),
    ("---", " ─ "),
];

/// Text outline of a mermaid diagram: a header naming the diagram type, then
/// one line per statement with arrows drawn as glyphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlineDiagramRenderer;

impl DiagramRenderer for OutlineDiagramRenderer {
    fn render(&self, source: &str, theme: &Theme) -> Result<Vec<Line<'static>>, DiagramError> {
        let mut statements = source
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with("%%"));

        let (_, header) = statements.next().ok_or(DiagramError::Empty)?;
        let kind = header.split_whitespace().next().unwrap_or_default();
        if !KNOWN_TYPES.contains(&kind) {
            return Err(DiagramError::UnsupportedType(kind.to_string()));
        }

        let mut lines = vec![Line::from(Span::styled(
            format!("◆ {header}"),
            theme.heading_style,
        ))];
        for (line_no, statement) in statements {
            if unbalanced(statement) {
                return Err(DiagramError::Syntax {
                    line: line_no,
                    message: format!("unbalanced brackets in `{statement}`"),
                });
            }
            let mut drawn = statement.to_string();
            for (arrow, glyph) in ARROWS {
                drawn = drawn.replace(arrow, glyph);
            }
            lines.push(Line::from(vec![
                Span::styled("  ", theme.text_style),
                Span::styled(drawn, theme.text_style),
            ]));
        }
        Ok(lines)
    }
}

fn unbalanced(statement: &str) -> bool {
    let mut depth: i32 = 0;
    for c in statement.chars() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return true;
        }
    }
    depth != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeName;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn outlines_a_flowchart() {
        let theme = Theme::from_name(ThemeName::Dark);
        let lines = OutlineDiagramRenderer
            .render("graph TD\n  A[Start] --> B{Ok?}\n  %% note\n  B --> C", &theme)
            .unwrap();
        let text = text(&lines);
        assert_eq!(text[0], "◆ graph TD");
        assert_eq!(text[1], "  A[Start]  →  B{Ok?}");
        assert_eq!(text.len(), 3);
    }

    #[test]
    fn reports_errors_instead_of_panicking() {
        let theme = Theme::from_name(ThemeName::Dark);
        assert_eq!(
            OutlineDiagramRenderer.render("  \n", &theme),
            Err(DiagramError::Empty)
        );
        assert!(matches!(
            OutlineDiagramRenderer.render("notADiagram\nA-->B", &theme),
            Err(DiagramError::UnsupportedType(t)) if t == "notADiagram"
        ));
        assert!(matches!(
            OutlineDiagramRenderer.render("graph LR\nA[oops --> B", &theme),
            Err(DiagramError::Syntax { line: 2, .. })
        ));
    }
}
