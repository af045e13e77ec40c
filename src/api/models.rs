//! Backend wire types and the client-side shapes they adapt into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::message::{Message, Role};

/// Backend ids arrive as numbers from some endpoints and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Number(n) => write!(f, "{n}"),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaseConfig {
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProvider {
    pub id: WireId,
    pub provider: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "baseConfig", default)]
    pub base_config: BaseConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireModel {
    pub id: WireId,
    pub provider_id: WireId,
    pub model_key: String,
    pub model_name: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub model_config: Option<ModelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub id: WireId,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    /// Adapter name, e.g. "openai".
    pub kind: String,
    pub base_url: String,
}

impl From<WireProvider> for Provider {
    fn from(wire: WireProvider) -> Self {
        Self {
            id: wire.id.to_string(),
            name: wire.name,
            kind: wire.provider,
            base_url: wire.base_config.base_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    #[default]
    Chat,
    Embedding,
    Rerank,
    Multimodal,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Chat => "chat",
            ModelType::Embedding => "embedding",
            ModelType::Rerank => "rerank",
            ModelType::Multimodal => "multimodal",
        }
    }

    /// Chat-style models accept generation parameters.
    pub fn is_generative(self) -> bool {
        matches!(self, ModelType::Chat | ModelType::Multimodal)
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(ModelType::Chat),
            "embedding" => Ok(ModelType::Embedding),
            "rerank" => Ok(ModelType::Rerank),
            "multimodal" => Ok(ModelType::Multimodal),
            other => Err(format!("unknown model type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub provider_id: String,
    /// Display name.
    pub name: String,
    /// Identifier sent to the provider, e.g. "gpt-4o".
    pub model_id: String,
    pub kind: ModelType,
    pub context_length: Option<u32>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub dimensions: Option<u32>,
    pub is_default: bool,
}

impl From<WireModel> for Model {
    fn from(wire: WireModel) -> Self {
        let config = wire.model_config.unwrap_or_default();
        Self {
            id: wire.id.to_string(),
            provider_id: wire.provider_id.to_string(),
            name: wire.model_name,
            model_id: wire.model_key,
            kind: wire.model_type.parse().unwrap_or_default(),
            context_length: config.context_length,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            dimensions: config.dimensions,
            is_default: wire.is_default.unwrap_or(false),
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let role = Role::try_from(wire.role.as_str())?;
        Ok(Message {
            id: wire.id.to_string(),
            role,
            content: wire.content,
            timestamp: wire.created_at,
            model_id: None,
            images: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAdapter {
    pub name: String,
    pub provider: String,
    #[serde(default, rename = "defaultBaseURL")]
    pub default_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTestResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub latency: Option<f64>,
}

/// Form input for creating or updating a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderDraft {
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Form input for creating or updating a model.
#[derive(Debug, Clone, Default)]
pub struct ModelDraft {
    pub provider_id: String,
    pub name: String,
    pub model_id: String,
    pub kind: Option<ModelType>,
    pub context_length: Option<u32>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub dimensions: Option<u32>,
    pub is_default: bool,
}

impl ModelDraft {
    pub(crate) fn config(&self) -> ModelConfig {
        ModelConfig {
            context_length: self.context_length,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            dimensions: self.dimensions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSession {
    pub session_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_activity_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistory {
    pub session_state: ApiSession,
    #[serde(default)]
    pub telemetry: Vec<serde_json::Value>,
    #[serde(default)]
    pub directives: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpPhase {
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerStatus {
    pub phase: McpPhase,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub uptime: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub id: String,
    pub status: McpServerStatus,
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub last_activity: Option<String>,
}

/// Registration payload for a stdio MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpRegistration {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl McpRegistration {
    pub fn stdio(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "stdio",
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerCounts {
    pub total: u32,
    pub running: u32,
    pub stopped: u32,
    pub error: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolCounts {
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpStats {
    pub servers: McpServerCounts,
    pub tools: McpToolCounts,
    pub uptime: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adapts_providers_with_numeric_ids() {
        let wire: WireProvider = serde_json::from_value(json!({
            "id": 7,
            "provider": "openai",
            "name": "Main",
            "baseConfig": { "baseURL": "https://api.openai.com/v1", "apiKey": "***" }
        }))
        .unwrap();
        let provider = Provider::from(wire);
        assert_eq!(provider.id, "7");
        assert_eq!(provider.kind, "openai");
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn adapts_models_and_defaults_unknown_types_to_chat() {
        let wire: WireModel = serde_json::from_value(json!({
            "id": 3,
            "providerId": 7,
            "modelKey": "gpt-4o",
            "modelName": "GPT-4o",
            "modelType": "nlp",
            "enabled": true,
            "modelConfig": { "contextLength": 128000, "temperature": 0.7 }
        }))
        .unwrap();
        let model = Model::from(wire);
        assert_eq!(model.provider_id, "7");
        assert_eq!(model.kind, ModelType::Chat);
        assert_eq!(model.context_length, Some(128000));
        assert_eq!(model.temperature, Some(0.7));
        assert!(!model.is_default);
    }

    #[test]
    fn adapts_history_messages() {
        let wire: WireMessage = serde_json::from_value(json!({
            "id": 11, "conversation_id": "c1", "role": "assistant",
            "content": "hi", "created_at": 1700000000000_i64, "metadata": null
        }))
        .unwrap();
        let message = Message::try_from(wire).unwrap();
        assert_eq!(message.id, "11");
        assert!(message.role.is_assistant());
    }

    #[test]
    fn registration_serializes_as_stdio() {
        let mut reg = McpRegistration::stdio("fs", "npx");
        reg.args.push("server-fs".into());
        let value = serde_json::to_value(&reg).unwrap();
        assert_eq!(
            value,
            json!({ "id": "fs", "type": "stdio", "command": "npx", "args": ["server-fs"] })
        );
    }
}
