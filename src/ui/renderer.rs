//! Terminal materialization of render nodes.
//!
//! Everything here produces owned `Line<'static>` values that a ratatui
//! `Paragraph` can wrap and scroll. Structural decisions (what a node is) were
//! made upstream; this layer only chooses glyphs, labels and styles.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::core::message::Role;
use crate::core::parse::{parse_call, RenderNode, ToolCallGroup};
use crate::core::stream::{Completion, ConversationView, StreamState};
use crate::ui::i18n::Labels;
use crate::ui::markdown::{plain_text, Block, CodeBlock, Inline, MediaEmbed, MarkdownRenderer};
use crate::ui::theme::Theme;
use pulldown_cmark::Alignment;

const QUOTE_BAR: &str = "▌ ";
const THINKING_BAR: &str = "│ ";
const RULE_WIDTH: usize = 40;

/// Which face of an HTML block is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HtmlView {
    #[default]
    Preview,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewOptions {
    /// Show each tool call's parsed parameters under its group badge.
    pub expand_tools: bool,
    pub html_view: HtmlView,
    /// Show the "copied" acknowledgement on copy hints instead of "copy".
    pub copied: bool,
}

/// Render every visible message of `view`, honouring the active search.
pub fn render_conversation(
    view: &mut ConversationView,
    labels: &Labels,
    options: ViewOptions,
) -> Vec<Line<'static>> {
    let visible: Vec<(String, Role, String)> = view
        .visible_messages()
        .into_iter()
        .map(|m| (m.id.clone(), m.role, m.content.clone()))
        .collect();

    let mut lines = Vec::new();
    if visible.is_empty() && !view.search().is_empty() {
        let theme = view.markdown_renderer().theme().clone();
        lines.push(Line::from(Span::styled(
            labels.no_messages_found,
            theme.muted_style,
        )));
        return lines;
    }

    for (id, role, content) in visible {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        let theme = view.markdown_renderer().theme().clone();
        match role {
            Role::User => {
                for (i, text) in content.lines().enumerate() {
                    let prefix = if i == 0 { "You: " } else { "     " };
                    lines.push(Line::from(vec![
                        Span::styled(prefix, theme.user_prefix_style),
                        Span::styled(text.to_string(), theme.user_text_style),
                    ]));
                }
            }
            Role::System => {
                for text in content.lines() {
                    lines.push(Line::from(Span::styled(
                        text.to_string(),
                        theme.system_text_style,
                    )));
                }
            }
            Role::Assistant => {
                if let Some(nodes) = view.nodes(&id) {
                    lines.extend(render_nodes(
                        &nodes,
                        view.markdown_renderer(),
                        labels,
                        options,
                    ));
                }
                match view.state(&id) {
                    Some(StreamState::Pending) | Some(StreamState::Streaming) => {
                        lines.push(Line::from(Span::styled(
                            labels.generating,
                            theme.muted_style.add_modifier(Modifier::ITALIC),
                        )));
                    }
                    _ => {}
                }
                match view.completion(&id) {
                    Some(Completion::Interrupted) => lines.push(Line::from(Span::styled(
                        labels.interrupted,
                        theme.warning_style,
                    ))),
                    Some(Completion::Failed(reason)) => lines.push(Line::from(Span::styled(
                        format!("{}: {reason}", labels.error),
                        theme.error_style,
                    ))),
                    _ => {}
                }
            }
        }
    }
    lines
}

/// Render a node list through `markdown`, which supplies the theme and caches.
pub fn render_nodes(
    nodes: &[RenderNode],
    markdown: &mut MarkdownRenderer,
    labels: &Labels,
    options: ViewOptions,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for node in nodes {
        match node {
            RenderNode::Markdown { source } => {
                let blocks = markdown.render_cached(source);
                let ctx = Context::new(markdown.theme(), labels, options);
                ctx.blocks(&blocks, &mut lines);
            }
            RenderNode::Thinking { content, closed } => {
                let ctx = Context::new(markdown.theme(), labels, options);
                ctx.thinking(content, *closed, &mut lines);
            }
            RenderNode::ToolGroup(group) => {
                let ctx = Context::new(markdown.theme(), labels, options);
                ctx.tool_group(group, &mut lines);
            }
            RenderNode::HtmlDocument { source } => {
                let block = Block::Code(markdown.render_html_document(source));
                let ctx = Context::new(markdown.theme(), labels, options);
                ctx.blocks(std::slice::from_ref(&block), &mut lines);
            }
        }
    }
    lines
}

/// Flatten rendered lines to text, one line per row.
pub fn lines_to_string(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct Context<'a> {
    theme: &'a Theme,
    labels: &'a Labels,
    options: ViewOptions,
}

impl<'a> Context<'a> {
    fn new(theme: &'a Theme, labels: &'a Labels, options: ViewOptions) -> Self {
        Self {
            theme,
            labels,
            options,
        }
    }

    fn thinking(&self, content: &str, closed: bool, out: &mut Vec<Line<'static>>) {
        let mut header = vec![Span::styled(
            format!("✦ {}", self.labels.thinking_process),
            self.theme.thinking_style.add_modifier(Modifier::BOLD),
        )];
        if !closed {
            header.push(Span::styled(" ⋯", self.theme.running_style));
        }
        out.push(Line::from(header));
        for text in content.trim().lines() {
            out.push(Line::from(vec![
                Span::styled(THINKING_BAR, self.theme.thinking_style),
                Span::styled(text.to_string(), self.theme.thinking_style),
            ]));
        }
    }

    fn tool_group(&self, group: &ToolCallGroup, out: &mut Vec<Line<'static>>) {
        let (badge, badge_style) = if group.state.is_running() {
            (self.labels.running, self.theme.running_style)
        } else {
            (self.labels.completed, self.theme.completed_style)
        };
        out.push(Line::from(vec![
            Span::styled(format!("⚙ {} ", self.labels.tools), self.theme.accent_style),
            Span::styled(group.name.clone(), self.theme.text_style.add_modifier(Modifier::BOLD)),
            Span::styled(format!(" ×{} ", group.len()), self.theme.muted_style),
            Span::styled(format!("[{badge}]"), badge_style),
        ]));
        if !self.options.expand_tools {
            return;
        }
        for call in &group.calls {
            match parse_call(call) {
                Ok(params) => {
                    out.push(Line::from(Span::styled(
                        format!("  #{}", call.index + 1),
                        self.theme.muted_style,
                    )));
                    for param in params {
                        out.push(Line::from(vec![
                            Span::styled(format!("    {}: ", param.key), self.theme.accent_style),
                            Span::styled(param.value, self.theme.text_style),
                        ]));
                    }
                }
                Err(err) => {
                    out.push(Line::from(Span::styled(
                        format!("  {} #{}: {}", self.labels.parse_error, err.index + 1, err.reason),
                        self.theme.error_style,
                    )));
                    for raw in err.raw.lines() {
                        out.push(Line::from(Span::styled(
                            format!("    {raw}"),
                            self.theme.muted_style,
                        )));
                    }
                }
            }
        }
    }

    fn blocks(&self, blocks: &[Block], out: &mut Vec<Line<'static>>) {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 && !matches!(block, Block::List { .. }) {
                out.push(Line::default());
            }
            self.block(block, out);
        }
    }

    fn block(&self, block: &Block, out: &mut Vec<Line<'static>>) {
        let theme = self.theme;
        match block {
            Block::Paragraph(inlines) => out.extend(self.inline_lines(inlines, theme.text_style)),
            Block::Heading { level, content } => {
                let mut lines = self.inline_lines(content, theme.heading_style);
                if let Some(first) = lines.first_mut() {
                    let marker = "#".repeat(usize::from(*level));
                    first
                        .spans
                        .insert(0, Span::styled(format!("{marker} "), theme.heading_style));
                }
                out.extend(lines);
            }
            Block::BlockQuote(children) => {
                let mut inner = Vec::new();
                self.blocks(children, &mut inner);
                out.extend(prefixed(
                    inner,
                    Span::styled(QUOTE_BAR, theme.quote_style),
                    Span::styled(QUOTE_BAR, theme.quote_style),
                ));
            }
            Block::List { start, items } => {
                for (n, item) in items.iter().enumerate() {
                    let mut marker = match start {
                        Some(first) => format!("{}. ", first + n as u64),
                        None => "• ".to_string(),
                    };
                    if let Some(checked) = item.task {
                        marker.push_str(if checked { "[x] " } else { "[ ] " });
                    }
                    let indent = " ".repeat(marker.width());
                    let mut inner = Vec::new();
                    self.blocks(&item.blocks, &mut inner);
                    out.extend(prefixed(
                        inner,
                        Span::styled(marker, theme.list_marker_style),
                        Span::raw(indent),
                    ));
                }
            }
            Block::Table {
                alignments,
                header,
                rows,
            } => self.table(alignments, header, rows, out),
            Block::Code(code) => self.code(code, out),
            Block::Math(tex) => {
                for text in tex.lines() {
                    out.push(Line::from(Span::styled(format!("  {text}"), theme.math_style)));
                }
            }
            Block::Media(embed) => self.media(embed, out),
            Block::Html(html) => {
                for text in html.lines() {
                    out.push(Line::from(Span::styled(text.to_string(), theme.muted_style)));
                }
            }
            Block::Footnote { label, blocks } => {
                let mut inner = Vec::new();
                self.blocks(blocks, &mut inner);
                let marker = format!("[^{label}]: ");
                let indent = " ".repeat(marker.width());
                out.extend(prefixed(
                    inner,
                    Span::styled(marker, theme.accent_style),
                    Span::raw(indent),
                ));
            }
            Block::Rule => out.push(Line::from(Span::styled(
                "─".repeat(RULE_WIDTH),
                theme.muted_style,
            ))),
        }
    }

    fn copy_hint(&self) -> Span<'static> {
        let label = if self.options.copied {
            self.labels.copied
        } else {
            self.labels.copy
        };
        Span::styled(format!(" [{label}]"), self.theme.muted_style)
    }

    fn code(&self, code: &CodeBlock, out: &mut Vec<Line<'static>>) {
        let theme = self.theme;
        match code {
            CodeBlock::Highlighted {
                language, lines, ..
            } => {
                let title = if language.is_empty() { "text" } else { language.as_str() };
                out.push(Line::from(vec![
                    Span::styled(format!("┌ {title}"), theme.muted_style),
                    self.copy_hint(),
                ]));
                out.extend(lines.iter().cloned());
                out.push(Line::from(Span::styled("└", theme.muted_style)));
            }
            CodeBlock::Diagram { lines, .. } => {
                out.push(Line::from(vec![
                    Span::styled("┌ mermaid", theme.muted_style),
                    self.copy_hint(),
                ]));
                out.extend(lines.iter().cloned());
                out.push(Line::from(Span::styled("└", theme.muted_style)));
            }
            CodeBlock::DiagramError { source, message } => {
                out.push(Line::from(Span::styled(
                    format!("{}: {message}", self.labels.error),
                    theme.error_style,
                )));
                for text in source.lines() {
                    out.push(Line::from(Span::styled(
                        format!("  {text}"),
                        theme.muted_style,
                    )));
                }
            }
            CodeBlock::HtmlPreview {
                lines,
                preview,
                sandbox,
                ..
            } => {
                let (active, inactive) = match self.options.html_view {
                    HtmlView::Preview => (self.labels.preview, self.labels.code),
                    HtmlView::Code => (self.labels.code, self.labels.preview),
                };
                out.push(Line::from(vec![
                    Span::styled("┌ html ", theme.muted_style),
                    Span::styled(format!("[{active}]"), theme.accent_style),
                    Span::styled(format!(" {inactive}"), theme.muted_style),
                    self.copy_hint(),
                ]));
                match self.options.html_view {
                    HtmlView::Code => out.extend(lines.iter().cloned()),
                    HtmlView::Preview => {
                        out.push(Line::from(Span::styled(
                            format!("│ sandbox: {sandbox}"),
                            theme.muted_style,
                        )));
                        for text in preview.lines() {
                            out.push(Line::from(vec![
                                Span::styled(THINKING_BAR, theme.muted_style),
                                Span::styled(text.to_string(), theme.text_style),
                            ]));
                        }
                    }
                }
                out.push(Line::from(Span::styled("└", theme.muted_style)));
            }
        }
    }

    fn media(&self, embed: &MediaEmbed, out: &mut Vec<Line<'static>>) {
        let theme = self.theme;
        let title = embed.title.clone().unwrap_or_else(|| embed.url.clone());
        out.push(Line::from(vec![
            Span::styled(format!("┌ {} ", embed.kind.label()), theme.muted_style),
            Span::styled(title, theme.text_style.add_modifier(Modifier::BOLD)),
        ]));
        out.push(Line::from(vec![
            Span::styled("│ ", theme.muted_style),
            Span::styled(embed.url.clone(), theme.link_style),
        ]));
        if let Some(sandbox) = embed.sandbox {
            out.push(Line::from(Span::styled(
                format!("│ sandbox: {sandbox}"),
                theme.muted_style,
            )));
        }
        out.push(Line::from(Span::styled("└", theme.muted_style)));
    }

    fn table(
        &self,
        alignments: &[Alignment],
        header: &[Vec<Inline>],
        rows: &[Vec<Vec<Inline>>],
        out: &mut Vec<Line<'static>>,
    ) {
        let header: Vec<String> = header.iter().map(|c| plain_text(c)).collect();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|c| plain_text(c)).collect())
            .collect();
        let columns = std::iter::once(&header)
            .chain(rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in std::iter::once(&header).chain(rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let border = self.theme.table_border_style;
        let render_row = |cells: &[String], style: Style| -> Line<'static> {
            let mut spans = Vec::with_capacity(columns * 2);
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(" │ ", border));
                }
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let align = alignments.get(i).copied().unwrap_or(Alignment::None);
                spans.push(Span::styled(pad(cell, *width, align), style));
            }
            Line::from(spans)
        };

        out.push(render_row(
            &header,
            self.theme.text_style.add_modifier(Modifier::BOLD),
        ));
        let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        out.push(Line::from(Span::styled(separator.join("─┼─"), border)));
        for row in &rows {
            out.push(render_row(row, self.theme.text_style));
        }
    }

    fn inline_lines(&self, inlines: &[Inline], base: Style) -> Vec<Line<'static>> {
        let mut builder = LineBuilder::default();
        self.inlines(inlines, base, &mut builder);
        builder.finish()
    }

    fn inlines(&self, inlines: &[Inline], style: Style, out: &mut LineBuilder) {
        let theme = self.theme;
        for inline in inlines {
            match inline {
                Inline::Text(text) => out.push(Span::styled(text.clone(), style)),
                Inline::Code(code) => out.push(Span::styled(code.clone(), theme.inline_code_style)),
                Inline::Emphasis(children) => {
                    self.inlines(children, style.add_modifier(Modifier::ITALIC), out)
                }
                Inline::Strong(children) => {
                    self.inlines(children, style.add_modifier(Modifier::BOLD), out)
                }
                Inline::Strikethrough(children) => {
                    self.inlines(children, style.add_modifier(Modifier::CROSSED_OUT), out)
                }
                Inline::Link { url, content, .. } => {
                    self.inlines(content, theme.link_style, out);
                    if plain_text(content) != *url {
                        out.push(Span::styled(format!(" ({url})"), theme.muted_style));
                    }
                }
                Inline::Media(embed) => {
                    let title = embed.title.as_deref().unwrap_or(&embed.url);
                    out.push(Span::styled(
                        format!("[{}: {title}]", embed.kind.label()),
                        theme.link_style,
                    ));
                }
                Inline::Math { tex, .. } => out.push(Span::styled(tex.clone(), theme.math_style)),
                Inline::Html(html) => out.push(Span::styled(html.clone(), theme.muted_style)),
                Inline::FootnoteRef(label) => {
                    out.push(Span::styled(format!("[^{label}]"), theme.accent_style))
                }
                Inline::SoftBreak => out.push(Span::styled(" ", style)),
                Inline::HardBreak => out.break_line(),
            }
        }
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineBuilder {
    fn push(&mut self, span: Span<'static>) {
        self.current.push(span);
    }

    fn break_line(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.current.is_empty() || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

fn prefixed(
    lines: Vec<Line<'static>>,
    first: Span<'static>,
    rest: Span<'static>,
) -> impl Iterator<Item = Line<'static>> {
    lines.into_iter().enumerate().map(move |(i, mut line)| {
        let prefix = if i == 0 { first.clone() } else { rest.clone() };
        line.spans.insert(0, prefix);
        line
    })
}

fn pad(text: &str, width: usize, align: Alignment) -> String {
    let gap = width.saturating_sub(text.width());
    match align {
        Alignment::Right => format!("{}{text}", " ".repeat(gap)),
        Alignment::Center => {
            let left = gap / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(gap - left))
        }
        Alignment::Left | Alignment::None => format!("{text}{}", " ".repeat(gap)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use crate::core::parse::build_nodes;
    use crate::ui::i18n::Language;
    use crate::ui::theme::ThemeName;

    fn markdown() -> MarkdownRenderer {
        MarkdownRenderer::new(Theme::from_name(ThemeName::Dark))
    }

    fn render(content: &str, streaming: bool, options: ViewOptions) -> String {
        let nodes = build_nodes(content, streaming);
        let lines = render_nodes(&nodes, &mut markdown(), Language::En.labels(), options);
        lines_to_string(&lines)
    }

    #[test]
    fn open_thinking_shows_progress_marker() {
        let open = render("<thinking>weighing options", true, ViewOptions::default());
        assert!(open.starts_with("✦ Thinking Process ⋯"));
        assert!(open.contains("│ weighing options"));

        let closed = render("<thinking>done</thinking>", false, ViewOptions::default());
        assert!(closed.starts_with("✦ Thinking Process\n"));
    }

    #[test]
    fn tool_groups_show_badge_and_count() {
        let content = "<tool_action name=\"search\"><q>a</q></tool_action>\
                       <tool_action name=\"search\"><q>b</q>";
        let text = render(content, true, ViewOptions::default());
        assert_eq!(text, "⚙ TOOLS search ×2 [RUNNING]");

        let zh = render_nodes(
            &build_nodes(content, false),
            &mut markdown(),
            Language::Zh.labels(),
            ViewOptions::default(),
        );
        assert!(!lines_to_string(&zh).contains("RUNNING"));
    }

    #[test]
    fn expanded_tools_list_params_and_parse_errors() {
        let content = "<tool_action name=\"fetch\"><url>https://x.dev</url></tool_action>\
                       <tool_action name=\"fetch\"><url>broken</wrong></tool_action>";
        let options = ViewOptions {
            expand_tools: true,
            ..ViewOptions::default()
        };
        let text = render(content, false, options);
        assert!(text.contains("[DONE]"));
        assert!(text.contains("  #1\n    url: https://x.dev"));
        assert!(text.contains("  PARSING ERROR #2: "));
        assert!(text.contains("    <tool_action name=\"fetch\"><url>broken</wrong></tool_action>"));
    }

    #[test]
    fn code_blocks_carry_a_copy_hint() {
        let text = render("```rust\nfn main() {}\n```", false, ViewOptions::default());
        assert!(text.starts_with("┌ rust [Copy]\n"));
        assert!(text.contains("fn main() {}"));

        let copied = render(
            "```\nplain\n```",
            false,
            ViewOptions {
                copied: true,
                ..ViewOptions::default()
            },
        );
        assert!(copied.starts_with("┌ text [Copied!]"));
    }

    #[test]
    fn html_documents_toggle_between_preview_and_code() {
        let doc = "<!DOCTYPE html><html><head><style>p{color:red}</style></head>\
                   <body><p>hi</p><script>go()</script></body></html>";
        let preview = render(doc, false, ViewOptions::default());
        assert!(preview.starts_with("┌ html [PREVIEW] CODE"));
        assert!(preview.contains("sandbox: "));
        assert!(preview.contains(&format!("│ {doc}")));

        let code = render(
            doc,
            false,
            ViewOptions {
                html_view: HtmlView::Code,
                ..ViewOptions::default()
            },
        );
        assert!(code.starts_with("┌ html [CODE] PREVIEW"));
        assert!(code.contains("<script>"));
    }

    #[test]
    fn fence_markers_inside_an_html_document_stay_in_the_document() {
        let doc = "<!DOCTYPE html>\n<html><body><pre>\n```\n</pre>\n\
                   <script>run()</script>\n<p>tail</p></body></html>";
        let nodes = build_nodes(doc, false);
        assert_eq!(nodes.len(), 1);

        let mut markdown = markdown();
        let lines = render_nodes(&nodes, &mut markdown, Language::En.labels(), ViewOptions::default());
        let text = lines_to_string(&lines);
        assert_eq!(text.matches("┌ ").count(), 1);
        assert!(text.contains("│ ```\n│ </pre>\n│ <script>run()</script>"));
        assert!(text.ends_with("│ <p>tail</p></body></html>\n└"));
        assert!(markdown.code_cache().contains("html", doc));
    }

    #[test]
    fn lists_quotes_and_tables() {
        let text = render(
            "- [x] one\n- two\n\n> quoted\n\n| a | bb |\n|--:|:--|\n| 1 | 2 |",
            false,
            ViewOptions::default(),
        );
        assert!(text.contains("• [x] one\n• two"));
        assert!(text.contains("▌ quoted"));
        assert!(text.contains("a │ bb\n──┼───\n1 │ 2 "));
    }

    #[test]
    fn media_links_render_as_frames() {
        let text = render("https://cdn.x.com/clip.mp4", false, ViewOptions::default());
        assert_eq!(text, "┌ video https://cdn.x.com/clip.mp4\n│ https://cdn.x.com/clip.mp4\n└");
    }

    #[test]
    fn conversation_shows_roles_progress_and_search_misses() {
        let mut view = ConversationView::new(Theme::from_name(ThemeName::Dark));
        view.push_message(Message::system("be brief"));
        let id = view.begin_exchange("hello", None).unwrap();
        let labels = Language::En.labels();

        let text = lines_to_string(&render_conversation(&mut view, labels, ViewOptions::default()));
        assert!(text.contains("be brief"));
        assert!(text.contains("You: hello"));
        assert!(text.ends_with("GENERATING..."));

        view.append_chunk(&id, "partial").unwrap();
        view.fail(&id, "connection reset").unwrap();
        let text = lines_to_string(&render_conversation(&mut view, labels, ViewOptions::default()));
        assert!(text.ends_with("partial\nERROR: connection reset"));

        view.set_search("zzz");
        let text = lines_to_string(&render_conversation(&mut view, labels, ViewOptions::default()));
        assert_eq!(text, "No messages found.");
    }
}
