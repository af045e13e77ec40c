//! User-facing preferences behind a small key/value store.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use super::data::Config;
use super::io::ConfigError;
use crate::ui::i18n::Language;
use crate::ui::theme::ThemeName;

pub const THEME_KEY: &str = "theme";
pub const LANGUAGE_KEY: &str = "language";

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// Settings kept only for the life of the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted in the TOML config file; every `set` saves.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    pub fn open(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Config::load_from_path(&path)?;
        Ok(Self { path, config })
    }

    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(Config::config_path()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl SettingsStore for ConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            THEME_KEY => self.config.theme.clone(),
            LANGUAGE_KEY => self.config.language.clone(),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let slot = match key {
            THEME_KEY => &mut self.config.theme,
            LANGUAGE_KEY => &mut self.config.language,
            _ => {
                warn!(key, "ignoring unknown setting");
                return Ok(());
            }
        };
        *slot = Some(value.to_string());
        self.config.save_to_path(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub theme: ThemeName,
    pub language: Language,
}

impl Settings {
    /// Read settings, falling back to defaults for missing or invalid values.
    pub fn load(store: &dyn SettingsStore) -> Self {
        Self {
            theme: read_or_default(store, THEME_KEY),
            language: read_or_default(store, LANGUAGE_KEY),
        }
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), ConfigError> {
        store.set(THEME_KEY, self.theme.as_str())?;
        store.set(LANGUAGE_KEY, self.language.as_str())
    }
}

fn read_or_default<T>(store: &dyn SettingsStore, key: &str) -> T
where
    T: std::str::FromStr<Err = String> + Default,
{
    match store.get(key) {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|err: String| {
            warn!(key, error = %err, "invalid stored setting, using default");
            T::default()
        }),
    }
}

/// Check a value before it is written under `key`.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        THEME_KEY => value.parse::<ThemeName>().map(|_| ()),
        LANGUAGE_KEY => value.parse::<Language>().map(|_| ()),
        other => Err(format!("unknown setting: {other}")),
    }
}
