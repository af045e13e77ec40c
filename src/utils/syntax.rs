use crate::ui::theme::Theme;
use ratatui::style::{Color as TuiColor, Style};
use ratatui::text::{Line, Span};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

pub fn normalize_lang_hint(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" | "python" => "python".into(),
        "bash" | "sh" | "zsh" | "shell" => "bash".into(),
        "js" | "javascript" | "jsx" | "mjs" => "javascript".into(),
        "ts" | "tsx" | "typescript" => "typescript".into(),
        "yaml" | "yml" => "yaml".into(),
        "rust" | "rs" => "rust".into(),
        "c" | "h" => "c".into(),
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "c++" => "cpp".into(),
        "kotlin" | "kt" => "kotlin".into(),
        "htm" | "html" => "html".into(),
        "md" | "markdown" => "markdown".into(),
        other => other.into(),
    }
}

pub(crate) fn pick_syntect_theme_name_for_theme(theme: &Theme) -> &'static str {
    if theme.is_dark {
        "base16-ocean.dark"
    } else {
        "InspiredGitHub"
    }
}

/// Highlight `code` as `lang_hint`, one ratatui line per source line.
///
/// Unknown languages fall back to plain text. Returns `None` only when syntect
/// itself fails on the input.
pub fn highlight_code_block(
    lang_hint: &str,
    code: &str,
    theme: &Theme,
) -> Option<Vec<Line<'static>>> {
    let ps = syntax_set();
    let ts = theme_set();
    let lang_norm = normalize_lang_hint(lang_hint);

    let theme_name = pick_syntect_theme_name_for_theme(theme);
    let syn_theme = ts
        .themes
        .get(theme_name)
        .or_else(|| ts.themes.get("base16-ocean.dark"))?;

    let syntax = ps
        .find_syntax_by_token(&lang_norm)
        .unwrap_or_else(|| ps.find_syntax_plain_text());

    let mut h = HighlightLines::new(syntax, syn_theme);
    let bg = theme.codeblock_bg_color();

    let mut out: Vec<Line<'static>> = Vec::new();
    for line in LinesWithEndings::from(code) {
        let ranges = h.highlight_line(line, ps).ok()?;
        let spans: Vec<Span<'static>> = ranges
            .into_iter()
            .map(|(style, text)| {
                let frag = text.strip_suffix('\n').unwrap_or(text);
                let frag = frag.strip_suffix('\r').unwrap_or(frag);
                let fg = style.foreground;
                let mut st = Style::default().fg(TuiColor::Rgb(fg.r, fg.g, fg.b));
                if let Some(bgcol) = bg {
                    st = st.bg(bgcol);
                }
                Span::styled(frag.replace('\t', "    "), st)
            })
            .filter(|span| !span.content.is_empty())
            .collect();
        out.push(Line::from(spans));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeName;

    #[test]
    fn normalize_lang_hint_maps_common_aliases() {
        assert_eq!(normalize_lang_hint("py"), "python");
        assert_eq!(normalize_lang_hint("JS"), "javascript");
        assert_eq!(normalize_lang_hint("TsX"), "typescript");
        assert_eq!(normalize_lang_hint("yml"), "yaml");
        assert_eq!(normalize_lang_hint("hpp"), "cpp");
        assert_eq!(normalize_lang_hint("rs"), "rust");
    }

    #[test]
    fn theme_selection_follows_brightness() {
        let dark = Theme::from_name(ThemeName::Cyber);
        let light = Theme::from_name(ThemeName::ShadcnLight);
        assert_eq!(pick_syntect_theme_name_for_theme(&dark), "base16-ocean.dark");
        assert_eq!(pick_syntect_theme_name_for_theme(&light), "InspiredGitHub");
    }

    #[test]
    fn highlights_one_line_per_source_line() {
        let theme = Theme::from_name(ThemeName::Dark);
        let lines = highlight_code_block("rs", "fn main() {\n    println!(\"hi\");\n}", &theme)
            .expect("highlighting succeeds");
        assert_eq!(lines.len(), 3);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(first, "fn main() {");
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let theme = Theme::from_name(ThemeName::Light);
        let lines = highlight_code_block("no-such-lang", "a\nb", &theme).unwrap();
        assert_eq!(lines.len(), 2);
    }
}
