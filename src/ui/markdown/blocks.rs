use std::sync::{Arc, OnceLock};

use pulldown_cmark::{Alignment, Event, Tag, TagEnd};
use regex::Regex;

use super::code::{language_hint_from_codeblock_kind, render_code_block, CodeBlock, CodeBlockCache};
use super::sanitize::{classify_inline_tag, sanitize_html, TagAction};
use crate::ui::diagram::DiagramRenderer;
use crate::ui::media::{media_kind, MediaKind, SANDBOX_POLICY};
use crate::ui::theme::Theme;

/// Structural markdown block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    BlockQuote(Vec<Block>),
    List {
        /// First number of an ordered list; `None` for bullets.
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Table {
        alignments: Vec<Alignment>,
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Code(Arc<CodeBlock>),
    /// Display math on its own line.
    Math(String),
    /// A paragraph that held nothing but one media link or image.
    Media(MediaEmbed),
    /// Sanitized raw HTML block.
    Html(String),
    Footnote {
        label: String,
        blocks: Vec<Block>,
    },
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// `Some(checked)` for task-list items.
    pub task: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        url: String,
        kind: MediaKind,
        content: Vec<Inline>,
    },
    Media(MediaEmbed),
    Math {
        tex: String,
        display: bool,
    },
    Html(String),
    FootnoteRef(String),
    SoftBreak,
    HardBreak,
}

impl Inline {
    fn is_blank(&self) -> bool {
        match self {
            Inline::Text(t) => t.trim().is_empty(),
            Inline::SoftBreak | Inline::HardBreak => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEmbed {
    pub url: String,
    pub kind: MediaKind,
    pub title: Option<String>,
    /// Images open full-size on activation.
    pub lightbox: bool,
    /// Capability set for framed HTML previews.
    pub sandbox: Option<&'static str>,
}

/// Concatenated text of a run of inlines, without markup.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_text(inlines, &mut out);
    out
}

fn collect_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Emphasis(c) | Inline::Strong(c) | Inline::Strikethrough(c) => {
                collect_text(c, out)
            }
            Inline::Link { content, .. } => collect_text(content, out),
            Inline::Media(embed) => out.push_str(embed.title.as_deref().unwrap_or(&embed.url)),
            Inline::Math { tex, .. } => out.push_str(tex),
            Inline::FootnoteRef(label) => {
                out.push('[');
                out.push_str(label);
                out.push(']');
            }
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Html(_) => {}
        }
    }
}

fn bare_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("url pattern is valid"))
}

fn link_inline(url: String, content: Vec<Inline>) -> Inline {
    let kind = media_kind(&url);
    if kind.is_framed() || kind == MediaKind::Image {
        let title = Some(plain_text(&content))
            .filter(|t| !t.trim().is_empty() && *t != url);
        Inline::Media(MediaEmbed {
            lightbox: kind == MediaKind::Image,
            sandbox: (kind == MediaKind::Html).then_some(SANDBOX_POLICY),
            url,
            kind,
            title,
        })
    } else {
        Inline::Link { url, kind, content }
    }
}

fn image_inline(url: String, alt: String) -> Inline {
    let kind = match media_kind(&url) {
        // An explicit image tag is an image whatever the extension says.
        MediaKind::Link | MediaKind::Model => MediaKind::Image,
        other => other,
    };
    Inline::Media(MediaEmbed {
        lightbox: kind == MediaKind::Image,
        sandbox: (kind == MediaKind::Html).then_some(SANDBOX_POLICY),
        url,
        kind,
        title: Some(alt).filter(|a| !a.trim().is_empty()),
    })
}

fn paragraph_block(children: Vec<Inline>) -> Option<Block> {
    let mut meaningful = children.iter().filter(|i| !i.is_blank());
    let first = meaningful.next()?;
    if meaningful.next().is_none() {
        match first {
            Inline::Media(embed) => return Some(Block::Media(embed.clone())),
            Inline::Math { tex, display: true } => return Some(Block::Math(tex.clone())),
            _ => {}
        }
    }
    Some(Block::Paragraph(children))
}

enum ContainerKind {
    Root,
    Quote,
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item {
        task: Option<bool>,
    },
    Footnote {
        label: String,
    },
}

struct Container {
    kind: ContainerKind,
    blocks: Vec<Block>,
}

impl Container {
    fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
        }
    }
}

enum FrameKind {
    Paragraph { implicit: bool },
    Heading(u8),
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
    Image(String),
    Cell,
}

struct InlineFrame {
    kind: FrameKind,
    children: Vec<Inline>,
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    row: Vec<Vec<Inline>>,
}

/// Folds pulldown-cmark events into [`Block`]s.
pub(super) struct BlockBuilder<'r> {
    theme: &'r Theme,
    diagrams: &'r dyn DiagramRenderer,
    code_cache: &'r mut CodeBlockCache,
    containers: Vec<Container>,
    inlines: Vec<InlineFrame>,
    code: Option<(String, String)>,
    html_block: Option<String>,
    table: Option<TableState>,
    /// Depth of blocked inline elements currently open.
    suppress: usize,
}

impl<'r> BlockBuilder<'r> {
    pub(super) fn new(
        theme: &'r Theme,
        diagrams: &'r dyn DiagramRenderer,
        code_cache: &'r mut CodeBlockCache,
    ) -> Self {
        Self {
            theme,
            diagrams,
            code_cache,
            containers: vec![Container::new(ContainerKind::Root)],
            inlines: Vec::new(),
            code: None,
            html_block: None,
            table: None,
            suppress: 0,
        }
    }

    pub(super) fn finish(mut self) -> Vec<Block> {
        self.close_implicit_paragraph();
        while self.containers.len() > 1 {
            self.close_container();
        }
        self.containers
            .pop()
            .map(|root| root.blocks)
            .unwrap_or_default()
    }

    pub(super) fn push_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push_str(&text);
                } else if let Some(html) = self.html_block.as_mut() {
                    html.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineMath(tex) => self.push_inline(Inline::Math {
                tex: tex.into_string(),
                display: false,
            }),
            Event::DisplayMath(tex) => self.push_inline(Inline::Math {
                tex: tex.into_string(),
                display: true,
            }),
            Event::Html(html) | Event::InlineHtml(html) => {
                if let Some(block) = self.html_block.as_mut() {
                    block.push_str(&html);
                } else {
                    self.push_inline_html(&html);
                }
            }
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::FootnoteRef(label.into_string()))
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => {
                self.close_implicit_paragraph();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(checked) => {
                if let Some(ContainerKind::Item { task }) =
                    self.containers.last_mut().map(|c| &mut c.kind)
                {
                    *task = Some(checked);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.close_implicit_paragraph();
                self.open_frame(FrameKind::Paragraph { implicit: false });
            }
            Tag::Heading { level, .. } => {
                self.close_implicit_paragraph();
                self.open_frame(FrameKind::Heading(level as u8));
            }
            Tag::BlockQuote(_) => {
                self.close_implicit_paragraph();
                self.containers.push(Container::new(ContainerKind::Quote));
            }
            Tag::List(start) => {
                self.close_implicit_paragraph();
                self.containers.push(Container::new(ContainerKind::List {
                    start,
                    items: Vec::new(),
                }));
            }
            Tag::Item => {
                self.close_implicit_paragraph();
                self.containers
                    .push(Container::new(ContainerKind::Item { task: None }));
            }
            Tag::FootnoteDefinition(label) => {
                self.close_implicit_paragraph();
                self.containers.push(Container::new(ContainerKind::Footnote {
                    label: label.into_string(),
                }));
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit_paragraph();
                self.code = Some((language_hint_from_codeblock_kind(&kind), String::new()));
            }
            Tag::HtmlBlock => {
                self.close_implicit_paragraph();
                self.html_block = Some(String::new());
            }
            Tag::Table(alignments) => {
                self.close_implicit_paragraph();
                self.table = Some(TableState {
                    alignments,
                    ..TableState::default()
                });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.open_frame(FrameKind::Cell),
            Tag::Emphasis => self.open_frame(FrameKind::Emphasis),
            Tag::Strong => self.open_frame(FrameKind::Strong),
            Tag::Strikethrough => self.open_frame(FrameKind::Strikethrough),
            Tag::Link { dest_url, .. } => self.open_frame(FrameKind::Link(dest_url.into_string())),
            Tag::Image { dest_url, .. } => {
                self.open_frame(FrameKind::Image(dest_url.into_string()))
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if let Some(frame) = self.close_frame() {
                    if let Some(block) = paragraph_block(frame.children) {
                        self.push_block(block);
                    }
                }
            }
            TagEnd::Heading(_) => {
                if let Some(InlineFrame {
                    kind: FrameKind::Heading(level),
                    children,
                }) = self.close_frame()
                {
                    self.push_block(Block::Heading {
                        level,
                        content: children,
                    });
                }
            }
            TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::FootnoteDefinition => {
                self.close_implicit_paragraph();
                self.close_container();
            }
            TagEnd::CodeBlock => {
                if let Some((language, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    let (theme, diagrams) = (self.theme, self.diagrams);
                    let block = self.code_cache.get_or_render(&language, &code, || {
                        render_code_block(&language, &code, theme, diagrams)
                    });
                    self.push_block(Block::Code(block));
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html_block.take() {
                    let clean = sanitize_html(&html);
                    if !clean.trim().is_empty() {
                        self.push_block(Block::Html(clean.trim_end().to_string()));
                    }
                }
            }
            TagEnd::TableCell => {
                if let Some(frame) = self.close_frame() {
                    if let Some(table) = self.table.as_mut() {
                        table.row.push(frame.children);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(Block::Table {
                        alignments: table.alignments,
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                if let Some(frame) = self.close_frame() {
                    let inline = match frame.kind {
                        FrameKind::Emphasis => Inline::Emphasis(frame.children),
                        FrameKind::Strong => Inline::Strong(frame.children),
                        _ => Inline::Strikethrough(frame.children),
                    };
                    self.push_inline(inline);
                }
            }
            TagEnd::Link => {
                if let Some(InlineFrame {
                    kind: FrameKind::Link(url),
                    children,
                }) = self.close_frame()
                {
                    self.push_inline(link_inline(url, children));
                }
            }
            TagEnd::Image => {
                if let Some(InlineFrame {
                    kind: FrameKind::Image(url),
                    children,
                }) = self.close_frame()
                {
                    self.push_inline(image_inline(url, plain_text(&children)));
                }
            }
            _ => {}
        }
    }

    fn open_frame(&mut self, kind: FrameKind) {
        self.inlines.push(InlineFrame {
            kind,
            children: Vec::new(),
        });
    }

    fn close_frame(&mut self) -> Option<InlineFrame> {
        let frame = self.inlines.pop();
        if self.inlines.is_empty() {
            // Blocked inline elements never leak past their block.
            self.suppress = 0;
        }
        frame
    }

    fn close_implicit_paragraph(&mut self) {
        let implicit = matches!(
            self.inlines.last(),
            Some(InlineFrame {
                kind: FrameKind::Paragraph { implicit: true },
                ..
            })
        );
        if implicit {
            if let Some(frame) = self.close_frame() {
                if let Some(block) = paragraph_block(frame.children) {
                    self.push_block(block);
                }
            }
        }
    }

    fn close_container(&mut self) {
        if self.containers.len() <= 1 {
            return;
        }
        let Some(container) = self.containers.pop() else {
            return;
        };
        match container.kind {
            ContainerKind::Root => {}
            ContainerKind::Quote => self.push_block(Block::BlockQuote(container.blocks)),
            ContainerKind::List { start, items } => self.push_block(Block::List { start, items }),
            ContainerKind::Item { task } => {
                let item = ListItem {
                    task,
                    blocks: container.blocks,
                };
                match self.containers.last_mut().map(|c| &mut c.kind) {
                    Some(ContainerKind::List { items, .. }) => items.push(item),
                    _ => self.push_block(Block::List {
                        start: None,
                        items: vec![item],
                    }),
                }
            }
            ContainerKind::Footnote { label } => self.push_block(Block::Footnote {
                label,
                blocks: container.blocks,
            }),
        }
    }

    fn push_block(&mut self, block: Block) {
        if let Some(container) = self.containers.last_mut() {
            container.blocks.push(block);
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.suppress > 0 {
            return;
        }
        if self.inlines.is_empty() {
            self.open_frame(FrameKind::Paragraph { implicit: true });
        }
        if let Some(frame) = self.inlines.last_mut() {
            frame.children.push(inline);
        }
    }

    fn push_inline_html(&mut self, html: &str) {
        match classify_inline_tag(html) {
            TagAction::OpenBlocked => self.suppress += 1,
            TagAction::CloseBlocked => self.suppress = self.suppress.saturating_sub(1),
            TagAction::Drop => {}
            TagAction::Keep => self.push_inline(Inline::Html(html.to_string())),
        }
    }

    fn in_link(&self) -> bool {
        self.inlines
            .iter()
            .any(|f| matches!(f.kind, FrameKind::Link(_) | FrameKind::Image(_)))
    }

    fn push_text(&mut self, text: &str) {
        if self.in_link() {
            self.push_inline(Inline::Text(text.to_string()));
            return;
        }
        let mut cursor = 0;
        for m in bare_url_pattern().find_iter(text) {
            let url = m
                .as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"']);
            if url.len() <= "https://".len() {
                continue;
            }
            if m.start() > cursor {
                self.push_inline(Inline::Text(text[cursor..m.start()].to_string()));
            }
            self.push_inline(link_inline(
                url.to_string(),
                vec![Inline::Text(url.to_string())],
            ));
            cursor = m.start() + url.len();
        }
        if cursor < text.len() {
            self.push_inline(Inline::Text(text[cursor..].to_string()));
        }
    }
}
