pub mod data;
pub mod io;
pub mod settings;

pub use data::{ApiSettings, Config};
pub use io::ConfigError;
pub use settings::{ConfigStore, MemoryStore, Settings, SettingsStore};
