//! Markdown to structural blocks.
//!
//! [`MarkdownRenderer`] owns the per-conversation caches: rendered code blocks
//! keyed by `(language, source prefix)` and whole markdown segments keyed by a
//! content hash. Both are bounded and dropped with the renderer.

mod blocks;
mod code;
mod latex;
mod sanitize;

use std::sync::Arc;

use pulldown_cmark::{Options, Parser, TextMergeStream};

use crate::ui::diagram::{DiagramRenderer, OutlineDiagramRenderer};
use crate::ui::theme::Theme;
use crate::utils::cache::FifoCache;

pub use blocks::{plain_text, Block, Inline, ListItem, MediaEmbed};
pub use code::{CodeBlock, CodeBlockCache, CODE_CACHE_CAPACITY, CODE_KEY_PREFIX_CHARS};
pub use sanitize::sanitize_html;

/// Markdown segments remembered before the oldest is dropped.
pub const SEGMENT_CACHE_CAPACITY: usize = 128;

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_MATH);
    options
}

pub struct MarkdownRenderer {
    theme: Theme,
    diagrams: Arc<dyn DiagramRenderer>,
    code_cache: CodeBlockCache,
    segments: FifoCache<(u32, usize), Arc<[Block]>>,
}

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("theme", &self.theme.name)
            .field("code_cache", &self.code_cache)
            .field("segments", &self.segments.len())
            .finish()
    }
}

impl MarkdownRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            diagrams: Arc::new(OutlineDiagramRenderer),
            code_cache: CodeBlockCache::default(),
            segments: FifoCache::new(SEGMENT_CACHE_CAPACITY),
        }
    }

    pub fn with_diagram_renderer(mut self, diagrams: Arc<dyn DiagramRenderer>) -> Self {
        self.diagrams = diagrams;
        self
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Switch theme. Cached renders carry the old colors, so both caches reset.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.clear();
    }

    pub fn code_cache(&self) -> &CodeBlockCache {
        &self.code_cache
    }

    pub fn clear(&mut self) {
        self.code_cache.clear();
        self.segments.clear();
    }

    /// Render a markdown source into blocks, bypassing the segment cache.
    pub fn render(&mut self, source: &str) -> Vec<Block> {
        let normalized = latex::normalize_math_delimiters(source);
        let mut builder =
            blocks::BlockBuilder::new(&self.theme, self.diagrams.as_ref(), &mut self.code_cache);
        // Merged text runs keep bare URLs in one piece for link detection.
        for event in TextMergeStream::new(Parser::new_ext(&normalized, parser_options())) {
            builder.push_event(event);
        }
        builder.finish()
    }

    /// Preview block for a message that is a whole HTML document.
    ///
    /// The source is taken as-is; it never passes through the markdown parser.
    pub fn render_html_document(&mut self, source: &str) -> Arc<CodeBlock> {
        let theme = &self.theme;
        let diagrams = self.diagrams.as_ref();
        self.code_cache.get_or_render("html", source, || {
            code::render_code_block("html", source, theme, diagrams)
        })
    }

    /// Render through the segment cache; equal sources share one result.
    pub fn render_cached(&mut self, source: &str) -> Arc<[Block]> {
        let key = (crc32fast::hash(source.as_bytes()), source.len());
        if let Some(blocks) = self.segments.get(&key) {
            return Arc::clone(blocks);
        }
        let blocks: Arc<[Block]> = self.render(source).into();
        self.segments.put(key, Arc::clone(&blocks));
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::diagram::DiagramError;
    use crate::ui::media::{MediaKind, SANDBOX_POLICY};
    use crate::ui::theme::ThemeName;
    use pulldown_cmark::Alignment;
    use ratatui::text::Line;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::new(Theme::from_name(ThemeName::Dark))
    }

    #[test]
    fn paragraphs_headings_and_emphasis() {
        let blocks = renderer().render("# Title\n\nSome *soft* and **loud** ~~gone~~ `code`.");
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                content: vec![Inline::Text("Title".into())]
            }
        );
        let Block::Paragraph(inlines) = &blocks[1] else {
            panic!("expected paragraph, got {:?}", blocks[1]);
        };
        assert!(inlines.contains(&Inline::Emphasis(vec![Inline::Text("soft".into())])));
        assert!(inlines.contains(&Inline::Strong(vec![Inline::Text("loud".into())])));
        assert!(inlines.contains(&Inline::Strikethrough(vec![Inline::Text("gone".into())])));
        assert!(inlines.contains(&Inline::Code("code".into())));
    }

    #[test]
    fn tight_and_task_lists() {
        let blocks = renderer().render("- [x] done\n- [ ] todo\n\n3. three\n4. four");
        let Block::List { start: None, items } = &blocks[0] else {
            panic!("expected bullet list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].task, Some(true));
        assert_eq!(items[1].task, Some(false));
        assert_eq!(plain_text(match &items[1].blocks[0] {
            Block::Paragraph(i) => i,
            other => panic!("expected paragraph, got {other:?}"),
        }).trim(), "todo");

        let Block::List { start: Some(3), items } = &blocks[1] else {
            panic!("expected ordered list");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn nested_list_inside_item() {
        let blocks = renderer().render("- outer\n  - inner");
        let Block::List { items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert!(matches!(items[0].blocks[0], Block::Paragraph(_)));
        assert!(matches!(items[0].blocks[1], Block::List { .. }));
    }

    #[test]
    fn tables_keep_alignment_and_cells() {
        let blocks = renderer().render("| a | b |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |");
        let Block::Table {
            alignments,
            header,
            rows,
        } = &blocks[0]
        else {
            panic!("expected table");
        };
        assert_eq!(alignments, &vec![Alignment::Left, Alignment::Right]);
        assert_eq!(plain_text(&header[1]), "b");
        assert_eq!(rows.len(), 2);
        assert_eq!(plain_text(&rows[1][0]), "3");
    }

    #[test]
    fn latex_delimiters_render_as_math() {
        let blocks = renderer().render(r"Inline \(a^2\) here.

\[E = mc^2\]");
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(inlines.contains(&Inline::Math {
            tex: "a^2".into(),
            display: false
        }));
        assert_eq!(blocks[1], Block::Math("E = mc^2".into()));
    }

    #[test]
    fn code_fences_dispatch_by_language() {
        let mut r = renderer();
        let blocks = r.render("```js\nconsole.log(1)\n```\n\n```mermaid\ngraph TD\nA-->B\n```\n\n```html\n<b>x</b>\n```");
        let kinds: Vec<_> = blocks
            .iter()
            .map(|b| match b {
                Block::Code(code) => match code.as_ref() {
                    CodeBlock::Highlighted { .. } => "highlighted",
                    CodeBlock::Diagram { .. } => "diagram",
                    CodeBlock::DiagramError { .. } => "diagram-error",
                    CodeBlock::HtmlPreview { .. } => "html",
                },
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["highlighted", "diagram", "html"]);
        let Block::Code(code) = &blocks[0] else {
            unreachable!()
        };
        assert_eq!(code.copy_text(), "console.log(1)");
        assert_eq!(r.code_cache().len(), 3);
    }

    struct FailingDiagrams;

    impl DiagramRenderer for FailingDiagrams {
        fn render(&self, _: &str, _: &Theme) -> Result<Vec<Line<'static>>, DiagramError> {
            Err(DiagramError::Syntax {
                line: 1,
                message: "boom".into(),
            })
        }
    }

    #[test]
    fn diagram_errors_do_not_stop_the_rest() {
        let mut r = renderer().with_diagram_renderer(Arc::new(FailingDiagrams));
        let blocks = r.render("before\n\n```mermaid\ngraph\n```\n\nafter");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(
            blocks[1],
            Block::Code(ref c) if matches!(c.as_ref(), CodeBlock::DiagramError { message, .. } if message.contains("boom"))
        ));
        assert_eq!(blocks[2], Block::Paragraph(vec![Inline::Text("after".into())]));
    }

    #[test]
    fn media_links_and_images_are_promoted() {
        let blocks = renderer().render(
            "https://cdn.example.com/clip.mp4?t=3\n\n![cat](https://x.com/cat.webp)\n\nSee https://x.com/page, thanks.",
        );
        let Block::Media(video) = &blocks[0] else {
            panic!("expected media block, got {:?}", blocks[0]);
        };
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(video.url, "https://cdn.example.com/clip.mp4?t=3");

        let Block::Media(image) = &blocks[1] else {
            panic!("expected image block");
        };
        assert_eq!(image.kind, MediaKind::Image);
        assert!(image.lightbox);
        assert_eq!(image.title.as_deref(), Some("cat"));

        let Block::Paragraph(inlines) = &blocks[2] else {
            panic!("expected paragraph");
        };
        assert_eq!(inlines[0], Inline::Text("See ".into()));
        assert!(matches!(
            &inlines[1],
            Inline::Link { url, kind: MediaKind::Link, .. } if url == "https://x.com/page"
        ));
        assert_eq!(inlines[2], Inline::Text(", thanks.".into()));
    }

    #[test]
    fn html_links_get_a_sandboxed_frame() {
        let blocks = renderer().render("[demo](https://x.com/demo.html)");
        let Block::Media(embed) = &blocks[0] else {
            panic!("expected media block");
        };
        assert_eq!(embed.kind, MediaKind::Html);
        assert_eq!(embed.sandbox, Some(SANDBOX_POLICY));
        assert_eq!(embed.title.as_deref(), Some("demo"));
    }

    #[test]
    fn blocked_html_is_stripped() {
        let blocks = renderer().render(
            "<style>body{display:none}</style>\n\nText <script>steal()</script> stays.\n\n<div>kept</div>",
        );
        let text: Vec<String> = blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(i) => plain_text(i),
                Block::Html(h) => h.clone(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(text, vec!["Text  stays.".to_string(), "<div>kept</div>".to_string()]);
    }

    #[test]
    fn segment_cache_shares_results() {
        let mut r = renderer();
        let a = r.render_cached("```rs\nfn a() {}\n```");
        let b = r.render_cached("```rs\nfn a() {}\n```");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(r.code_cache().renders(), 1);

        r.set_theme(Theme::from_name(ThemeName::Light));
        assert!(r.code_cache().is_empty());
    }

    #[test]
    fn streaming_code_fence_rerenders_in_place() {
        let mut r = renderer();
        let head = format!("# {}\n", "x".repeat(CODE_KEY_PREFIX_CHARS));
        r.render(&format!("```py\n{head}print(1)"));
        r.render(&format!("```py\n{head}print(1)\nprint(2)"));
        r.render(&format!("```py\n{head}print(1)\nprint(2)\n```"));
        assert_eq!(r.code_cache().len(), 1);
        assert_eq!(r.code_cache().renders(), 2);
        assert_eq!(r.code_cache().hits(), 1);
    }
}
