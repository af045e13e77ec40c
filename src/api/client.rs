use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::cache::{cache_key, CacheStats, RequestCache, LISTING_TTL};
use super::models::{
    ApiSession, McpRegistration, McpServer, McpStats, Model, ModelDraft, Provider,
    ProviderAdapter, ProviderDraft, ProviderTestResponse, SessionHistory, WireMessage,
    WireModel, WireProvider,
};
use super::retry::{with_retry, RetryPolicy};
use super::validation::{validate_model, validate_provider};
use super::ApiError;
use crate::core::config::ApiSettings;
use crate::core::message::Message;
use crate::utils::url::{construct_api_url, path_segment};

const PROVIDERS_KEY: &str = "api:providers";
const ADAPTERS_KEY: &str = "api:adapters";
const ALL_MODELS_KEY: &str = "api:all-models";
const PROVIDER_MODELS_PREFIX: &str = "api:provider-models";
const MCP_SERVERS_KEY: &str = "api:mcp-servers";

/// Backend client with bearer auth, a request timeout and a read cache.
///
/// Reads are retried on server and network failures; mutations are sent once
/// and invalidate the cached listings they affect.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: Mutex<RequestCache>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            cache: Mutex::new(RequestCache::new(settings.cache_ttl)),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    fn cache(&self) -> MutexGuard<'_, RequestCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate(&self, prefixes: &[&str]) {
        let mut cache = self.cache();
        for prefix in prefixes {
            cache.clear_prefix(prefix);
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, construct_api_url(&self.base_url, path))
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
    }

    async fn execute(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let this = self;
        with_retry(self.retry, move || async move {
            let response = Self::execute(this.request(Method::GET, path)).await?;
            Ok(response.json::<Value>().await?)
        })
        .await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = Self::execute(builder).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn cached<T, F>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: std::future::Future<Output = Result<T, ApiError>>,
    {
        let hit = self.cache().get::<T>(key, Some(ttl));
        if let Some(hit) = hit {
            debug!(key, "request cache hit");
            return Ok(hit);
        }
        let value = fetch.await?;
        self.cache().put(key, &value);
        Ok(value)
    }

    // Providers

    pub async fn providers(&self) -> Result<Vec<Provider>, ApiError> {
        self.cached(PROVIDERS_KEY, LISTING_TTL, async {
            let body = self.get_json("/api/llm/providers").await?;
            let wire: Vec<WireProvider> = list_at(&body, &["/providers"])?;
            Ok(wire.into_iter().map(Provider::from).collect())
        })
        .await
    }

    pub async fn provider_adapters(&self) -> Result<Vec<ProviderAdapter>, ApiError> {
        let ttl = self.cache().default_ttl();
        self.cached(ADAPTERS_KEY, ttl, async {
            let body = self.get_json("/api/llm/providers/adapters").await?;
            list_at(&body, &["/adapters"])
        })
        .await
    }

    /// Test a saved provider. Transport failures are reported as a failed test.
    pub async fn test_provider(&self, id: &str) -> ProviderTestResponse {
        let path = format!("/api/llm/providers/{}/test", path_segment(id));
        let result = self.send_json::<Value>(Method::POST, &path, None).await;
        match result.and_then(decode) {
            Ok(response) => response,
            Err(err) => {
                warn!(provider = id, error = %err, "provider test failed");
                ProviderTestResponse {
                    success: false,
                    message: err.to_string(),
                    latency: None,
                }
            }
        }
    }

    pub async fn create_provider(&self, draft: &ProviderDraft) -> Result<Provider, ApiError> {
        validate_provider(draft)?;
        let payload = json!({
            "provider": draft.kind,
            "name": draft.name,
            "baseConfig": { "baseURL": draft.base_url, "apiKey": draft.api_key },
        });
        let body = self
            .send_json(Method::POST, "/api/llm/providers", Some(&payload))
            .await?;
        self.invalidate(&[PROVIDERS_KEY]);
        let wire: WireProvider = field_at(&body, &["/provider"])?;
        Ok(wire.into())
    }

    pub async fn update_provider(
        &self,
        id: &str,
        draft: &ProviderDraft,
    ) -> Result<Provider, ApiError> {
        validate_provider(draft)?;
        let mut base_config = json!({ "baseURL": draft.base_url });
        if let Some(key) = draft.api_key.as_deref().filter(|k| !k.is_empty()) {
            base_config["apiKey"] = json!(key);
        }
        let payload = json!({ "name": draft.name, "baseConfig": base_config });
        let path = format!("/api/llm/providers/{}", path_segment(id));
        let body = self.send_json(Method::PUT, &path, Some(&payload)).await?;
        self.invalidate(&[PROVIDERS_KEY]);
        let wire: WireProvider = field_at(&body, &["/provider"])?;
        Ok(wire.into())
    }

    /// Delete a provider together with its models.
    pub async fn delete_provider(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/api/llm/providers/{}", path_segment(id));
        self.send_json::<Value>(Method::DELETE, &path, None).await?;
        self.invalidate(&[PROVIDERS_KEY, ALL_MODELS_KEY, PROVIDER_MODELS_PREFIX]);
        Ok(())
    }

    // Models

    pub async fn models(&self, provider_id: &str) -> Result<Vec<Model>, ApiError> {
        let key = cache_key(PROVIDER_MODELS_PREFIX, &[json!(provider_id)]);
        self.cached(&key, LISTING_TTL, async {
            let path = format!("/api/llm/providers/{}/models", path_segment(provider_id));
            let body = self.get_json(&path).await?;
            let wire: Vec<WireModel> = list_at(&body, &["/models"])?;
            Ok(wire.into_iter().map(Model::from).collect())
        })
        .await
    }

    pub async fn all_models(&self) -> Result<Vec<Model>, ApiError> {
        self.cached(ALL_MODELS_KEY, LISTING_TTL, async {
            let body = self.get_json("/api/llm/models").await?;
            let wire: Vec<WireModel> = list_at(&body, &["/models"])?;
            Ok(wire.into_iter().map(Model::from).collect())
        })
        .await
    }

    pub async fn create_model(&self, draft: &ModelDraft) -> Result<Model, ApiError> {
        validate_model(draft)?;
        let payload = json!({
            "modelKey": draft.model_id,
            "modelName": draft.name,
            "modelType": draft.kind.unwrap_or_default().as_str(),
            "modelConfig": draft.config(),
            "enabled": true,
            "isDefault": draft.is_default,
        });
        let path = format!(
            "/api/llm/providers/{}/models",
            path_segment(&draft.provider_id)
        );
        let body = self.send_json(Method::POST, &path, Some(&payload)).await?;
        self.invalidate(&[ALL_MODELS_KEY, PROVIDER_MODELS_PREFIX]);
        let wire: WireModel = field_at(&body, &["/model"])?;
        Ok(wire.into())
    }

    pub async fn update_model(&self, id: &str, draft: &ModelDraft) -> Result<Model, ApiError> {
        validate_model(draft)?;
        let payload = json!({
            "modelName": draft.name,
            "enabled": true,
            "isDefault": draft.is_default,
            "modelConfig": draft.config(),
        });
        let path = format!(
            "/api/llm/providers/{}/models/{}",
            path_segment(&draft.provider_id),
            path_segment(id)
        );
        let body = self.send_json(Method::PUT, &path, Some(&payload)).await?;
        self.invalidate(&[ALL_MODELS_KEY, PROVIDER_MODELS_PREFIX]);
        let wire: WireModel = field_at(&body, &["/model"])?;
        Ok(wire.into())
    }

    pub async fn delete_model(&self, provider_id: &str, model_id: &str) -> Result<(), ApiError> {
        let path = format!(
            "/api/llm/providers/{}/models/{}",
            path_segment(provider_id),
            path_segment(model_id)
        );
        self.send_json::<Value>(Method::DELETE, &path, None).await?;
        self.invalidate(&[ALL_MODELS_KEY, PROVIDER_MODELS_PREFIX]);
        Ok(())
    }

    // Sessions

    pub async fn active_sessions(&self, cutoff: Option<i64>) -> Result<Vec<ApiSession>, ApiError> {
        let path = match cutoff {
            Some(cutoff) => format!("/v1/chat/sessions/active?cutoffTime={cutoff}"),
            None => "/v1/chat/sessions/active".to_string(),
        };
        let body = self.get_json(&path).await?;
        list_at(&body, &["/sessions", "/data/sessions"])
    }

    pub async fn delete_session(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/v1/chat/sessions/{}", path_segment(id));
        self.send_json::<Value>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// History for a session, or `None` when the backend has none.
    pub async fn session_history(&self, id: &str) -> Result<Option<SessionHistory>, ApiError> {
        let path = format!("/v1/chat/sessions/{}/history", path_segment(id));
        match self.get_json(&path).await {
            Ok(body) => match body.pointer("/data") {
                Some(data) if !data.is_null() => decode(data.clone()).map(Some),
                _ => Ok(None),
            },
            Err(ApiError::Status { status, .. }) if status < 500 => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn session_messages(
        &self,
        id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, ApiError> {
        let path = format!(
            "/v1/chat/sessions/{}/messages?limit={limit}&offset={offset}",
            path_segment(id)
        );
        let body = self.get_json(&path).await?;
        let wire: Vec<WireMessage> = list_at(&body, &["/data/messages", "/messages"])?;
        let mut messages = Vec::with_capacity(wire.len());
        for message in wire {
            match Message::try_from(message) {
                Ok(message) => messages.push(message),
                Err(err) => warn!(error = %err, "skipping history message"),
            }
        }
        Ok(messages)
    }

    /// Ask the backend to abandon an in-flight generation.
    pub async fn interrupt(&self, request_id: &str) -> Result<(), ApiError> {
        let payload = json!({ "requestId": request_id });
        self.send_json(Method::POST, "/v1/interrupt", Some(&payload))
            .await?;
        Ok(())
    }

    // MCP servers

    pub async fn mcp_servers(&self) -> Result<Vec<McpServer>, ApiError> {
        self.cached(MCP_SERVERS_KEY, LISTING_TTL, async {
            let body = self.get_json("/api/mcp/servers").await?;
            if !succeeded(&body) {
                return Ok(Vec::new());
            }
            list_at(&body, &["/data"])
        })
        .await
    }

    pub async fn register_mcp_server(&self, registration: &McpRegistration) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/api/mcp/servers", Some(registration))
            .await?;
        self.invalidate(&[MCP_SERVERS_KEY]);
        Ok(())
    }

    pub async fn delete_mcp_server(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/api/mcp/servers/{}", path_segment(id));
        self.send_json::<Value>(Method::DELETE, &path, None).await?;
        self.invalidate(&[MCP_SERVERS_KEY]);
        Ok(())
    }

    pub async fn restart_mcp_server(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/api/mcp/servers/{}/restart", path_segment(id));
        self.send_json::<Value>(Method::POST, &path, None).await?;
        self.invalidate(&[MCP_SERVERS_KEY]);
        Ok(())
    }

    pub async fn mcp_stats(&self) -> Result<Option<McpStats>, ApiError> {
        let body = self.get_json("/api/mcp/statistics").await?;
        if !succeeded(&body) {
            return Ok(None);
        }
        match body.pointer("/data") {
            Some(data) if !data.is_null() => decode(data.clone()).map(Some),
            _ => Ok(None),
        }
    }
}

fn succeeded(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(false)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Decode the first present JSON pointer.
fn field_at<T: DeserializeOwned>(body: &Value, pointers: &[&str]) -> Result<T, ApiError> {
    pointers
        .iter()
        .find_map(|p| body.pointer(p).filter(|v| !v.is_null()))
        .ok_or_else(|| ApiError::Decode(format!("missing {}", pointers.join(" or "))))
        .and_then(|value| decode(value.clone()))
}

/// Decode the first array found at `pointers`; an absent list is empty.
fn list_at<T: DeserializeOwned>(body: &Value, pointers: &[&str]) -> Result<Vec<T>, ApiError> {
    match pointers
        .iter()
        .find_map(|p| body.pointer(p).filter(|v| v.is_array()))
    {
        Some(list) => decode(list.clone()),
        None => Ok(Vec::new()),
    }
}
