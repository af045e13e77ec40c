use std::fmt;
use std::str::FromStr;

use crate::ui::builtin_themes::{find_builtin_theme, ThemeSpec};
use ratatui::style::{Color, Modifier, Style};

/// The six selectable themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    ShadcnDark,
    ShadcnLight,
    Cyber,
    Sunset,
}

impl ThemeName {
    pub const ALL: [ThemeName; 6] = [
        ThemeName::Dark,
        ThemeName::Light,
        ThemeName::ShadcnDark,
        ThemeName::ShadcnLight,
        ThemeName::Cyber,
        ThemeName::Sunset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
            ThemeName::ShadcnDark => "shadcn_dark",
            ThemeName::ShadcnLight => "shadcn_light",
            ThemeName::Cyber => "cyber",
            ThemeName::Sunset => "sunset",
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemeName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown theme: {s}"))
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub is_dark: bool,
    pub background_color: Color,
    pub surface_color: Option<Color>,

    pub text_style: Style,
    pub muted_style: Style,
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub system_text_style: Style,

    pub heading_style: Style,
    pub link_style: Style,
    pub inline_code_style: Style,
    pub quote_style: Style,
    pub list_marker_style: Style,
    pub table_border_style: Style,
    pub math_style: Style,

    pub thinking_style: Style,
    pub running_style: Style,
    pub completed_style: Style,
    pub warning_style: Style,
    pub error_style: Style,
    pub accent_style: Style,
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match find_builtin_theme(name.as_str()) {
            Some(spec) => Self::from_spec(name, &spec),
            None => Self::fallback(name),
        }
    }

    fn fallback(name: ThemeName) -> Self {
        let dark = !matches!(name, ThemeName::Light | ThemeName::ShadcnLight);
        let text = if dark { Color::White } else { Color::Black };
        Theme {
            name,
            is_dark: dark,
            background_color: if dark { Color::Black } else { Color::White },
            surface_color: None,
            text_style: Style::default().fg(text),
            muted_style: Style::default().fg(Color::DarkGray),
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            system_text_style: Style::default().fg(Color::DarkGray),
            heading_style: Style::default().fg(text).add_modifier(Modifier::BOLD),
            link_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            inline_code_style: Style::default().fg(Color::Yellow),
            quote_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            list_marker_style: Style::default().fg(Color::Cyan),
            table_border_style: Style::default().fg(Color::DarkGray),
            math_style: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
            thinking_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            running_style: Style::default().fg(Color::Yellow),
            completed_style: Style::default().fg(Color::Green),
            warning_style: Style::default().fg(Color::Yellow),
            error_style: Style::default().fg(Color::Red),
            accent_style: Style::default().fg(Color::Cyan),
        }
    }

    pub fn from_spec(name: ThemeName, spec: &ThemeSpec) -> Self {
        let text = parse_style(&spec.text);
        let muted = parse_style(&spec.muted);
        let primary = parse_style(&spec.primary);
        let accent = parse_style(&spec.accent);
        let success = parse_style(&spec.success);
        let warning = parse_style(&spec.warning);
        let error = parse_style(&spec.error);
        let border = parse_style(&spec.border);
        let surface_color = spec.surface.as_deref().and_then(parse_color);

        let mut inline_code = accent;
        if let Some(bg) = surface_color {
            inline_code = inline_code.bg(bg);
        }

        Theme {
            name,
            is_dark: spec.dark,
            background_color: spec
                .background
                .as_deref()
                .and_then(parse_color)
                .unwrap_or(Color::Black),
            surface_color,
            text_style: text,
            muted_style: muted,
            user_prefix_style: primary.add_modifier(Modifier::BOLD),
            user_text_style: text,
            system_text_style: muted,
            heading_style: primary.add_modifier(Modifier::BOLD),
            link_style: accent.add_modifier(Modifier::UNDERLINED),
            inline_code_style: inline_code,
            quote_style: muted.add_modifier(Modifier::ITALIC),
            list_marker_style: accent,
            table_border_style: border,
            math_style: accent.add_modifier(Modifier::ITALIC),
            thinking_style: muted.add_modifier(Modifier::ITALIC),
            running_style: warning,
            completed_style: success,
            warning_style: warning,
            error_style: error,
            accent_style: accent,
        }
    }

    pub fn codeblock_bg_color(&self) -> Option<Color> {
        self.surface_color
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_name(ThemeName::default())
    }
}

fn parse_color(s: &str) -> Option<Color> {
    let lower = s.trim().to_ascii_lowercase();
    if let Some(c) = parse_hex_color(&lower) {
        return Some(c);
    }
    if let Some(c) = parse_rgb_func(&lower) {
        return Some(c);
    }
    match lower.as_str() {
        "black" => Some(Color::Black),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "darkgray" => Some(Color::DarkGray),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "blue" => Some(Color::Blue),
        "cyan" => Some(Color::Cyan),
        "magenta" => Some(Color::Magenta),
        "yellow" => Some(Color::Yellow),
        "reset" => Some(Color::Reset),
        _ => None,
    }
}

fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

fn parse_rgb_func(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<_> = content
        .split([',', ' '])
        .filter(|t| !t.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u16>().ok()?;
    let g = parts[1].parse::<u16>().ok()?;
    let b = parts[2].parse::<u16>().ok()?;
    Some(Color::Rgb(
        r.min(255) as u8,
        g.min(255) as u8,
        b.min(255) as u8,
    ))
}

fn parse_style(s: &Option<String>) -> Style {
    let mut style = Style::default();
    if let Some(ref spec) = s {
        for tok in spec.split(',').map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if let Some(color) = parse_color(tok) {
                style = style.fg(color);
                continue;
            }
            match tok.to_ascii_lowercase().as_str() {
                "bold" => style = style.add_modifier(Modifier::BOLD),
                "italic" => style = style.add_modifier(Modifier::ITALIC),
                "dim" => style = style.add_modifier(Modifier::DIM),
                "reversed" => style = style.add_modifier(Modifier::REVERSED),
                "underlined" => style = style.add_modifier(Modifier::UNDERLINED),
                _ => {}
            }
        }
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_names_round_trip_through_strings() {
        for name in ThemeName::ALL {
            assert_eq!(name.as_str().parse::<ThemeName>().unwrap(), name);
        }
        assert!("dracula".parse::<ThemeName>().is_err());
        assert_eq!(ThemeName::default(), ThemeName::Dark);
    }

    #[test]
    fn dark_theme_uses_its_palette() {
        let theme = Theme::from_name(ThemeName::Dark);
        assert_eq!(theme.background_color, Color::Rgb(0x0F, 0x0E, 0x17));
        assert_eq!(theme.text_style.fg, Some(Color::Rgb(0xFF, 0xEC, 0xD1)));
        assert_eq!(theme.link_style.fg, Some(Color::Rgb(0x00, 0xD4, 0xFF)));
        assert!(theme.is_dark);
    }

    #[test]
    fn light_themes_are_flagged_light() {
        assert!(!Theme::from_name(ThemeName::Light).is_dark);
        assert!(!Theme::from_name(ThemeName::ShadcnLight).is_dark);
    }

    #[test]
    fn parse_style_reads_colors_and_modifiers() {
        let style = parse_style(&Some("#abc, bold, dim".into()));
        assert_eq!(style.fg, Some(Color::Rgb(0xAA, 0xBB, 0xCC)));
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert!(style.add_modifier.contains(Modifier::DIM));
        assert_eq!(parse_color("rgb(300, 0, 12)"), Some(Color::Rgb(255, 0, 12)));
        assert_eq!(parse_color("#12"), None);
    }
}
