use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeSpec {
    pub id: String,
    pub display_name: String,
    /// Picks the syntax-highlighting palette.
    #[serde(default = "default_true")]
    pub dark: bool,
    pub background: Option<String>,
    pub surface: Option<String>,
    pub input_background: Option<String>,
    pub text: Option<String>,
    pub muted: Option<String>,
    pub primary: Option<String>,
    pub accent: Option<String>,
    pub success: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub border: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BuiltinThemesConfig {
    themes: Vec<ThemeSpec>,
}

pub fn load_builtin_themes() -> Vec<ThemeSpec> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_themes.toml");
    let config: BuiltinThemesConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_themes.toml");
    config.themes
}

pub fn find_builtin_theme(id: &str) -> Option<ThemeSpec> {
    load_builtin_themes()
        .into_iter()
        .find(|t| t.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeName;

    #[test]
    fn every_theme_name_has_a_builtin_spec() {
        let themes = load_builtin_themes();
        assert_eq!(themes.len(), ThemeName::ALL.len());
        for name in ThemeName::ALL {
            assert!(
                themes.iter().any(|t| t.id == name.as_str()),
                "missing spec for {name:?}"
            );
        }
    }

    #[test]
    fn find_builtin_theme_is_case_insensitive() {
        let t = find_builtin_theme("Shadcn_Dark").expect("should find shadcn_dark");
        assert_eq!(t.id, "shadcn_dark");
        assert!(t.dark);
        assert!(!find_builtin_theme("light").unwrap().dark);
    }
}
