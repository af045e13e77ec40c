use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:12345";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

pub const ENV_API_BASE_URL: &str = "PIXELVERSE_API_BASE_URL";
pub const ENV_API_KEY: &str = "PIXELVERSE_API_KEY";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Theme id, e.g. "dark" or "shadcn_light".
    pub theme: Option<String>,
    /// Interface language code: "en", "zh" or "ja".
    pub language: Option<String>,
    pub api_base_url: Option<String>,
    /// Sent as a bearer token on backend requests.
    pub api_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
}

/// Backend connection settings after defaults and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Config {
    pub fn api_settings(&self) -> ApiSettings {
        self.api_settings_with(|key| std::env::var(key).ok())
    }

    pub(crate) fn api_settings_with(&self, env: impl Fn(&str) -> Option<String>) -> ApiSettings {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let base_url = non_empty(env(ENV_API_BASE_URL))
            .or_else(|| non_empty(self.api_base_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_key = non_empty(env(ENV_API_KEY))
            .or_else(|| self.api_key.clone())
            .unwrap_or_default();

        ApiSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_millis(
                self.request_timeout_ms
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
        }
    }
}

/// Show a path relative to the home directory where possible.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            if let Ok(relative) = path.strip_prefix(PathBuf::from(home)) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
