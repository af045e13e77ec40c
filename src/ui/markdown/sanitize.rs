//! Strips elements that could leak style or script out of model output.

use regex::Regex;
use std::sync::OnceLock;

/// Elements dropped together with everything inside them.
const PAIRED: &[&str] = &["script", "style", "head", "iframe", "object", "form"];
/// Elements dropped as bare tags.
const VOID: &[&str] = &["link", "meta", "embed"];

fn paired_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternatives: Vec<String> = PAIRED
            .iter()
            .map(|tag| format!(r"<{tag}\b[^>]*>.*?(?:</{tag}\s*>|\z)"))
            .collect();
        Regex::new(&format!("(?is){}", alternatives.join("|")))
            .expect("paired element pattern is valid")
    })
}

fn stray_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let names: Vec<&str> = PAIRED.iter().chain(VOID).copied().collect();
        Regex::new(&format!(r"(?is)</?(?:{})\b[^>]*>", names.join("|")))
            .expect("stray tag pattern is valid")
    })
}

/// Remove blocked elements from an HTML fragment.
pub fn sanitize_html(html: &str) -> String {
    let without_paired = paired_pattern().replace_all(html, "");
    stray_tag_pattern()
        .replace_all(&without_paired, "")
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TagAction {
    Keep,
    Drop,
    /// Opens a blocked element; content up to the matching close is dropped.
    OpenBlocked,
    CloseBlocked,
}

/// Classify one inline HTML tag as emitted by the markdown parser.
pub(super) fn classify_inline_tag(tag: &str) -> TagAction {
    let body = tag.trim();
    let Some(rest) = body.strip_prefix('<') else {
        return TagAction::Keep;
    };
    let (closing, rest) = match rest.strip_prefix('/') {
        Some(r) => (true, r),
        None => (false, rest),
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if VOID.contains(&name.as_str()) {
        return TagAction::Drop;
    }
    if PAIRED.contains(&name.as_str()) {
        let self_closing = body.ends_with("/>");
        return match (closing, self_closing) {
            (true, _) => TagAction::CloseBlocked,
            (false, true) => TagAction::Drop,
            (false, false) => TagAction::OpenBlocked,
        };
    }
    TagAction::Keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_blocked_elements_with_content() {
        let html = "<div>ok</div><script>alert(1)</script><STYLE type=\"text/css\">body{}</STYLE><p>fine</p>";
        assert_eq!(sanitize_html(html), "<div>ok</div><p>fine</p>");
    }

    #[test]
    fn strips_void_tags_and_unclosed_elements() {
        let html = "<meta charset=utf-8><link rel=stylesheet href=x.css><embed src=a.swf><b>x</b><iframe src=\"https://evil\">";
        assert_eq!(sanitize_html(html), "<b>x</b>");
    }

    #[test]
    fn keeps_harmless_markup() {
        let html = "<details><summary>More</summary><p>Body</p></details>";
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn does_not_match_longer_tag_names() {
        assert_eq!(sanitize_html("<formula>x</formula>"), "<formula>x</formula>");
    }

    #[test]
    fn classifies_inline_tags() {
        assert_eq!(classify_inline_tag("<script>"), TagAction::OpenBlocked);
        assert_eq!(classify_inline_tag("</Script>"), TagAction::CloseBlocked);
        assert_eq!(classify_inline_tag("<meta name=x>"), TagAction::Drop);
        assert_eq!(classify_inline_tag("<iframe src=x />"), TagAction::Drop);
        assert_eq!(classify_inline_tag("<kbd>"), TagAction::Keep);
        assert_eq!(classify_inline_tag("<!-- note -->"), TagAction::Keep);
    }
}
