use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

fn delimiter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)(?P<code>`+[^`]*?`+)|\\\[(?P<block>.+?)\\\]|\\\((?P<inline>.+?)\\\)")
            .expect("latex delimiter pattern is valid")
    })
}

/// Rewrite `\[...\]` as `$$...$$` and `\(...\)` as `$...$`.
///
/// Fenced code blocks and inline code spans are left untouched.
pub(super) fn normalize_math_delimiters(source: &str) -> Cow<'_, str> {
    if !source.contains("\\[") && !source.contains("\\(") {
        return Cow::Borrowed(source);
    }

    let mut out = String::with_capacity(source.len());
    let mut prose = String::new();
    let mut fence: Option<&str> = None;

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match fence {
            Some(marker) => {
                out.push_str(line);
                if trimmed.starts_with(marker) {
                    fence = None;
                }
            }
            None => {
                let marker = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m));
                if let Some(marker) = marker {
                    out.push_str(&rewrite(&prose));
                    prose.clear();
                    out.push_str(line);
                    fence = Some(marker);
                } else {
                    prose.push_str(line);
                }
            }
        }
    }
    out.push_str(&rewrite(&prose));
    Cow::Owned(out)
}

fn rewrite(prose: &str) -> Cow<'_, str> {
    delimiter_pattern().replace_all(prose, |caps: &Captures<'_>| {
        if let Some(code) = caps.name("code") {
            code.as_str().to_string()
        } else if let Some(block) = caps.name("block") {
            format!("$${}$$", block.as_str())
        } else if let Some(inline) = caps.name("inline") {
            format!("${}$", inline.as_str())
        } else {
            caps[0].to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_both_delimiter_styles() {
        assert_eq!(
            normalize_math_delimiters(r"Euler: \(e^{i\pi}+1=0\) and \[\int_0^1 x\,dx\]"),
            r"Euler: $e^{i\pi}+1=0$ and $$\int_0^1 x\,dx$$"
        );
    }

    #[test]
    fn block_math_may_span_lines() {
        assert_eq!(
            normalize_math_delimiters("\\[\na+b\n\\]"),
            "$$\na+b\n$$"
        );
    }

    #[test]
    fn code_is_left_alone() {
        let src = "Use `\\(x\\)` inline.\n```tex\n\\[x\\]\n```\nthen \\(y\\)";
        assert_eq!(
            normalize_math_delimiters(src),
            "Use `\\(x\\)` inline.\n```tex\n\\[x\\]\n```\nthen $y$"
        );
    }

    #[test]
    fn text_without_delimiters_is_borrowed() {
        assert!(matches!(
            normalize_math_delimiters("plain $x$ text"),
            Cow::Borrowed(_)
        ));
    }
}
