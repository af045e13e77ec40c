//! `settings get` / `settings set`.

use std::error::Error;

use crate::core::config::settings::{validate_setting, LANGUAGE_KEY, THEME_KEY};
use crate::core::config::{ConfigStore, Settings, SettingsStore};

const KEYS: [&str; 2] = [THEME_KEY, LANGUAGE_KEY];

/// Effective value for `key` after defaults are applied.
fn effective(settings: &Settings, key: &str) -> Option<&'static str> {
    match key {
        THEME_KEY => Some(settings.theme.as_str()),
        LANGUAGE_KEY => Some(settings.language.as_str()),
        _ => None,
    }
}

pub fn get(key: Option<&str>) -> Result<(), Box<dyn Error>> {
    let store = ConfigStore::open_default()?;
    let settings = Settings::load(&store);
    match key {
        Some(key) => {
            let value =
                effective(&settings, key).ok_or_else(|| format!("unknown setting: {key}"))?;
            println!("{value}");
        }
        None => {
            for key in KEYS {
                let marker = if store.get(key).is_some() { "" } else { " (default)" };
                println!("{key} = {}{marker}", effective(&settings, key).unwrap_or(""));
            }
        }
    }
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    validate_setting(key, value)?;
    let mut store = ConfigStore::open_default()?;
    store.set(key, value)?;
    println!("✅ Set {key} to: {value}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MemoryStore;

    #[test]
    fn effective_values_fall_back_to_defaults() {
        let mut store = MemoryStore::default();
        store.set(THEME_KEY, "sunset").unwrap();
        store.set(LANGUAGE_KEY, "klingon").unwrap();
        let settings = Settings::load(&store);
        assert_eq!(effective(&settings, THEME_KEY), Some("sunset"));
        assert_eq!(effective(&settings, LANGUAGE_KEY), Some("zh"));
        assert_eq!(effective(&settings, "font"), None);
    }

    #[test]
    fn set_rejects_invalid_values_before_touching_disk() {
        let err = set(THEME_KEY, "neon").unwrap_err();
        assert!(err.to_string().contains("neon"));
    }
}
