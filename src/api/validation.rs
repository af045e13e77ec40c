//! Form checks run before provider and model mutations are sent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::models::{ModelDraft, ModelType, ProviderDraft};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_MODEL_ID_LEN: usize = 100;
pub const EMBEDDING_DIMENSIONS: [u32; 6] = [768, 1024, 1536, 2048, 3072, 4096];

/// Field name to message, for every field that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: BTreeMap<&'static str, String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        write!(f, "invalid input ({})", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn provider_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s\-_]+$").expect("name pattern is valid"))
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://.+").expect("url pattern is valid"))
}

pub fn validate_provider(draft: &ProviderDraft) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();

    let name = draft.name.trim();
    if name.is_empty() {
        errors.add("name", "Name is required");
    } else if draft.name.chars().count() > MAX_NAME_LEN {
        errors.add("name", "Name cannot exceed 50 characters");
    } else if !provider_name_pattern().is_match(&draft.name) {
        errors.add(
            "name",
            "Name can only contain letters, numbers, spaces, hyphens, and underscores",
        );
    }

    if draft.kind.trim().is_empty() {
        errors.add("type", "Provider type is required");
    }

    if draft.base_url.trim().is_empty() {
        errors.add("baseUrl", "Base URL is required");
    } else if !url_pattern().is_match(&draft.base_url) {
        errors.add(
            "baseUrl",
            "Please enter a valid URL (must start with http:// or https://)",
        );
    }

    errors.into_result()
}

pub fn validate_model(draft: &ModelDraft) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();

    if draft.provider_id.trim().is_empty() {
        errors.add("providerId", "Please select a provider");
    }
    if draft.kind.is_none() {
        errors.add("type", "Model type is required");
    }

    if draft.name.trim().is_empty() {
        errors.add("name", "Display name is required");
    } else if draft.name.chars().count() > MAX_NAME_LEN {
        errors.add("name", "Name cannot exceed 50 characters");
    }

    if draft.model_id.trim().is_empty() {
        errors.add("modelId", "Model ID is required");
    } else if draft.model_id.chars().count() > MAX_MODEL_ID_LEN {
        errors.add("modelId", "Model ID cannot exceed 100 characters");
    }

    if draft.kind.is_some_and(ModelType::is_generative) {
        if draft.context_length.is_some_and(|n| !(1..=128_000).contains(&n)) {
            errors.add("contextLength", "Context length must be between 1 and 128,000");
        }
        if draft.max_tokens.is_some_and(|n| !(1..=16_384).contains(&n)) {
            errors.add("maxTokens", "Max tokens must be between 1 and 16,384");
        }
        if draft.temperature.is_some_and(|t| !(0.0..=2.0).contains(&t)) {
            errors.add("temperature", "Temperature must be between 0 and 2");
        }
    }

    if draft.kind == Some(ModelType::Embedding)
        && draft
            .dimensions
            .is_some_and(|d| !EMBEDDING_DIMENSIONS.contains(&d))
    {
        let options: Vec<String> = EMBEDDING_DIMENSIONS.iter().map(u32::to_string).collect();
        errors.add(
            "dimensions",
            format!("Embedding dimensions should be one of: {}", options.join(", ")),
        );
    }

    errors.into_result()
}
