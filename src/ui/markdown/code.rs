use std::sync::Arc;

use pulldown_cmark::CodeBlockKind;
use ratatui::text::{Line, Span};
use tracing::{trace, warn};

use crate::ui::diagram::DiagramRenderer;
use crate::ui::media::SANDBOX_POLICY;
use crate::ui::theme::Theme;
use crate::utils::cache::FifoCache;

/// Blocks kept before the earliest-inserted one is dropped.
pub const CODE_CACHE_CAPACITY: usize = 100;
/// Characters of source that, with the language, form a cache key.
pub const CODE_KEY_PREFIX_CHARS: usize = 200;

/// A rendered fenced code block.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeBlock {
    Highlighted {
        language: String,
        lines: Vec<Line<'static>>,
        /// Exact source, offered by the copy affordance.
        copy_text: String,
    },
    Diagram {
        source: String,
        lines: Vec<Line<'static>>,
    },
    /// Inline marker shown when the diagram renderer rejects the source.
    DiagramError { source: String, message: String },
    /// Source view plus a sandboxed preview; the view layer picks the mode.
    HtmlPreview {
        lines: Vec<Line<'static>>,
        source: String,
        /// Markup for the preview frame, unchanged; `sandbox` isolates it.
        preview: String,
        sandbox: &'static str,
    },
}

impl CodeBlock {
    pub fn copy_text(&self) -> &str {
        match self {
            CodeBlock::Highlighted { copy_text, .. } => copy_text,
            CodeBlock::Diagram { source, .. }
            | CodeBlock::DiagramError { source, .. }
            | CodeBlock::HtmlPreview { source, .. } => source,
        }
    }
}

pub(super) fn language_hint_from_codeblock_kind(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Indented => String::new(),
        CodeBlockKind::Fenced(info) => info
            .split_ascii_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CodeKey {
    language: String,
    prefix: String,
}

impl CodeKey {
    fn new(language: &str, code: &str) -> Self {
        Self {
            language: language.to_string(),
            prefix: code.chars().take(CODE_KEY_PREFIX_CHARS).collect(),
        }
    }
}

#[derive(Debug)]
struct CodeSlot {
    digest: u32,
    block: Arc<CodeBlock>,
}

/// Memoizes rendered code blocks by `(language, source prefix)`.
///
/// Each slot remembers a digest of the full source, so a block that keeps its
/// prefix but grows (a fence still streaming in) is re-rendered in place.
#[derive(Debug)]
pub struct CodeBlockCache {
    slots: FifoCache<CodeKey, CodeSlot>,
    hits: u64,
    renders: u64,
}

impl Default for CodeBlockCache {
    fn default() -> Self {
        Self::new(CODE_CACHE_CAPACITY)
    }
}

impl CodeBlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: FifoCache::new(capacity),
            hits: 0,
            renders: 0,
        }
    }

    pub(super) fn get_or_render(
        &mut self,
        language: &str,
        code: &str,
        render: impl FnOnce() -> CodeBlock,
    ) -> Arc<CodeBlock> {
        let key = CodeKey::new(language, code);
        let digest = crc32fast::hash(code.as_bytes());
        if let Some(slot) = self.slots.get(&key) {
            if slot.digest == digest {
                self.hits += 1;
                return Arc::clone(&slot.block);
            }
        }

        self.renders += 1;
        let block = Arc::new(render());
        let evicted = self.slots.put(
            key,
            CodeSlot {
                digest,
                block: Arc::clone(&block),
            },
        );
        for old in evicted {
            trace!(language = %old.language, "evicted code block from cache");
        }
        block
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn evictions(&self) -> u64 {
        self.slots.evictions()
    }

    /// Whether a block with this language and source is cached.
    pub fn contains(&self, language: &str, code: &str) -> bool {
        self.slots.contains_key(&CodeKey::new(language, code))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Render one fenced block, dispatching on its language tag.
pub(super) fn render_code_block(
    language: &str,
    code: &str,
    theme: &Theme,
    diagrams: &dyn DiagramRenderer,
) -> CodeBlock {
    match language {
        "mermaid" => match diagrams.render(code, theme) {
            Ok(lines) => CodeBlock::Diagram {
                source: code.to_string(),
                lines,
            },
            Err(err) => {
                warn!(error = %err, "diagram render failed");
                CodeBlock::DiagramError {
                    source: code.to_string(),
                    message: err.to_string(),
                }
            }
        },
        "html" => CodeBlock::HtmlPreview {
            lines: highlighted_lines("html", code, theme),
            source: code.to_string(),
            preview: code.to_string(),
            sandbox: SANDBOX_POLICY,
        },
        _ => CodeBlock::Highlighted {
            language: language.to_string(),
            lines: highlighted_lines(language, code, theme),
            copy_text: code.to_string(),
        },
    }
}

fn highlighted_lines(language: &str, code: &str, theme: &Theme) -> Vec<Line<'static>> {
    crate::utils::syntax::highlight_code_block(language, code, theme)
        .unwrap_or_else(|| plain_codeblock_lines(code, theme))
}

fn plain_codeblock_lines(code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let mut style = theme.text_style;
    if let Some(bg) = theme.codeblock_bg_color() {
        style = style.bg(bg);
    }
    code.lines()
        .map(|line| Line::from(vec![Span::styled(line.replace('\t', "    "), style)]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::diagram::OutlineDiagramRenderer;
    use crate::ui::theme::ThemeName;

    fn theme() -> Theme {
        Theme::from_name(ThemeName::Dark)
    }

    #[test]
    fn dispatches_on_language() {
        let theme = theme();
        let diagrams = OutlineDiagramRenderer;
        assert!(matches!(
            render_code_block("rust", "let x = 1;", &theme, &diagrams),
            CodeBlock::Highlighted { ref language, .. } if language == "rust"
        ));
        assert!(matches!(
            render_code_block("mermaid", "graph TD\nA-->B", &theme, &diagrams),
            CodeBlock::Diagram { .. }
        ));
        assert!(matches!(
            render_code_block("html", "<p>x</p><script>x()</script>", &theme, &diagrams),
            CodeBlock::HtmlPreview { ref preview, sandbox, .. }
                if preview == "<p>x</p><script>x()</script>" && sandbox == SANDBOX_POLICY
        ));
    }

    #[test]
    fn diagram_failure_becomes_an_error_block() {
        let block = render_code_block("mermaid", "bogus", &theme(), &OutlineDiagramRenderer);
        let CodeBlock::DiagramError { source, message } = block else {
            panic!("expected an error block");
        };
        assert_eq!(source, "bogus");
        assert!(message.contains("bogus"));
    }

    #[test]
    fn cache_holds_at_most_capacity_and_drops_earliest() {
        let theme = theme();
        let mut cache = CodeBlockCache::default();
        for i in 0..150 {
            let code = format!("println!(\"{i}\");");
            cache.get_or_render("rust", &code, || {
                render_code_block("rust", &code, &theme, &OutlineDiagramRenderer)
            });
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.evictions(), 50);
        for i in 0..50 {
            assert!(!cache.contains("rust", &format!("println!(\"{i}\");")));
        }
        for i in 50..150 {
            assert!(cache.contains("rust", &format!("println!(\"{i}\");")));
        }
    }

    #[test]
    fn identical_blocks_are_rendered_once() {
        let mut cache = CodeBlockCache::new(4);
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_render("py", "print(1)", || {
                calls += 1;
                CodeBlock::DiagramError {
                    source: String::new(),
                    message: String::new(),
                }
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn growing_block_with_same_prefix_is_rerendered_in_place() {
        let mut cache = CodeBlockCache::new(4);
        let long = "x".repeat(CODE_KEY_PREFIX_CHARS);
        let first = cache.get_or_render("txt", &long, || CodeBlock::DiagramError {
            source: "first".into(),
            message: String::new(),
        });
        let grown = format!("{long}tail");
        let second = cache.get_or_render("txt", &grown, || CodeBlock::DiagramError {
            source: "second".into(),
            message: String::new(),
        });
        assert_ne!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.renders(), 2);
    }
}
