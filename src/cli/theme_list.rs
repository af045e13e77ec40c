use std::error::Error;

use crate::cli::load_settings;
use crate::ui::i18n::Labels;
use crate::ui::theme::ThemeName;

fn theme_table(current: ThemeName, labels: &Labels) -> String {
    let mut table = format!("| {} | |\n|---|---|\n", labels.theme);
    for theme in ThemeName::ALL {
        let id = if theme == current {
            format!("{}*", theme.as_str())
        } else {
            theme.as_str().to_string()
        };
        table.push_str(&format!("| {id} | {} |\n", labels.theme_name(theme)));
    }
    table
}

pub fn list_themes() -> Result<(), Box<dyn Error>> {
    let settings = load_settings();
    let labels = settings.language.labels();
    let mut content = theme_table(settings.theme, labels);
    content.push_str("\n\\* = current theme");
    crate::cli::print_markdown(&content, &settings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::i18n::Language;

    #[test]
    fn marks_the_current_theme() {
        let table = theme_table(ThemeName::Cyber, Language::En.labels());
        assert!(table.contains("| cyber* | CYBER NEON |"));
        assert!(table.contains("| dark | NIGHT MODE |"));
        assert_eq!(table.lines().count(), 2 + ThemeName::ALL.len());
    }
}
