/// LLM client: every call to an external text-completion provider goes through here.
///
/// Callers depend on the `TextCompletion` trait, never on a concrete provider.
/// `LlmClient` is the HTTP implementation for Anthropic, Google and OpenAI;
/// credentials come from the per-session settings in `session`, never from
/// the environment.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod session;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_API_URL: &str = "https://api.openai.com";

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Request contract
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// 0.0 – 1.0
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: temperature.clamp(0.0, 1.0),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::with_temperature(0.7)
    }
}

/// A single request/response exchange with a text-completion provider.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Providers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Anthropic, Provider::Google, Provider::OpenAi];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::OpenAi => "openai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Claude (Anthropic)",
            Provider::Google => "Gemini (Google)",
            Provider::OpenAi => "OpenAI (GPT)",
        }
    }
}

/// Provider selection for one session. Never persisted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

// ── OpenAI wire types ──

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// `{"error": {"message": ...}}`, shared by all three providers.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// HTTP client for the configured provider. One request per call; failures
/// are returned to the caller, never retried here.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, settings })
    }

    /// Models the key can use, sorted by display name.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let key = self.settings.api_key.as_str();
        let mut models = match self.settings.provider {
            Provider::Anthropic => {
                let body = send(anthropic_headers(
                    self.client.get(format!("{ANTHROPIC_API_URL}/v1/models")),
                    key,
                ))
                .await?;
                anthropic_models(&body)
            }
            Provider::OpenAi => {
                let body = send(
                    self.client
                        .get(format!("{OPENAI_API_URL}/v1/models"))
                        .bearer_auth(key),
                )
                .await?;
                openai_models(&body)
            }
            Provider::Google => {
                let body = send(
                    self.client
                        .get(format!("{GOOGLE_API_URL}/v1beta/models"))
                        .query(&[("key", key)]),
                )
                .await?;
                google_models(&body)
            }
        };
        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }

    async fn complete_anthropic(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        // The Messages API takes the system prompt out of band.
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());
        let request = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: options.max_tokens,
            system,
            messages: wire_messages(messages, false),
            temperature: options.temperature,
        };

        let body = send(anthropic_headers(
            self.client
                .post(format!("{ANTHROPIC_API_URL}/v1/messages"))
                .json(&request),
            &self.settings.api_key,
        ))
        .await?;

        let response: AnthropicResponse = serde_json::from_value(body)?;
        if let Some(usage) = &response.usage {
            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }
        response
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .ok_or(LlmError::EmptyContent)
    }

    async fn complete_openai(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let request = OpenAiRequest {
            model: &self.settings.model,
            messages: wire_messages(messages, true),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let body = send(
            self.client
                .post(format!("{OPENAI_API_URL}/v1/chat/completions"))
                .bearer_auth(&self.settings.api_key)
                .json(&request),
        )
        .await?;

        let response: OpenAiResponse = serde_json::from_value(body)?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)
    }

    async fn complete_google(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = send(
            self.client
                .post(format!(
                    "{GOOGLE_API_URL}/v1beta/models/{}:generateContent",
                    self.settings.model
                ))
                .query(&[("key", self.settings.api_key.as_str())])
                .json(&google_request(messages, options)),
        )
        .await?;

        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        debug!(
            "LLM request: provider={}, model={}, messages={}, temperature={}",
            self.settings.provider.id(),
            self.settings.model,
            messages.len(),
            options.temperature
        );
        match self.settings.provider {
            Provider::Anthropic => self.complete_anthropic(messages, options).await,
            Provider::OpenAi => self.complete_openai(messages, options).await,
            Provider::Google => self.complete_google(messages, options).await,
        }
    }
}

fn anthropic_headers(builder: RequestBuilder, api_key: &str) -> RequestBuilder {
    builder
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
}

/// Sends the request and returns the JSON body, mapping non-2xx responses to
/// `LlmError::Api` with the provider's own message when it has one.
async fn send(builder: RequestBuilder) -> Result<Value, LlmError> {
    let response = builder.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json().await?)
}

fn wire_messages(messages: &[ChatMessage], include_system: bool) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .filter(|m| include_system || m.role != Role::System)
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

fn google_request(messages: &[ChatMessage], options: CompletionOptions) -> Value {
    let contents: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({ "role": "user", "parts": [{ "text": m.content }] }))
        .collect();

    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "maxOutputTokens": options.max_tokens,
            "temperature": options.temperature,
        },
    });
    if let Some(system) = messages.iter().find(|m| m.role == Role::System) {
        body["systemInstruction"] = json!({ "parts": [{ "text": system.content }] });
    }
    body
}

fn anthropic_models(body: &Value) -> Vec<ModelInfo> {
    list_field(body, "data")
        .filter_map(|m| {
            let id = m.get("id")?.as_str()?;
            if !id.contains("claude") {
                return None;
            }
            let name = m.get("display_name").and_then(Value::as_str).unwrap_or(id);
            Some(ModelInfo {
                id: id.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

fn openai_models(body: &Value) -> Vec<ModelInfo> {
    const CHAT_FAMILIES: [&str; 4] = ["gpt", "o1", "o3", "o4"];
    list_field(body, "data")
        .filter_map(|m| m.get("id")?.as_str())
        .filter(|id| CHAT_FAMILIES.iter().any(|f| id.contains(f)))
        .map(|id| ModelInfo {
            id: id.to_string(),
            name: id.to_string(),
        })
        .collect()
}

fn google_models(body: &Value) -> Vec<ModelInfo> {
    list_field(body, "models")
        .filter(|m| {
            m.get("supportedGenerationMethods")
                .and_then(Value::as_array)
                .is_some_and(|ms| ms.iter().any(|x| x == "generateContent"))
        })
        .filter_map(|m| {
            let name = m.get("name")?.as_str()?;
            let id = name.trim_start_matches("models/");
            let display = m.get("displayName").and_then(Value::as_str).unwrap_or(id);
            Some(ModelInfo {
                id: id.to_string(),
                name: display.to_string(),
            })
        })
        .collect()
}

fn list_field<'a>(body: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    body.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

// ────────────────────────────────────────────────────────────────────────────
// Response payload helpers
// ────────────────────────────────────────────────────────────────────────────

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Strips fences and parses the remaining text as JSON.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_json_fences(text))
}

#[cfg(test)]
pub mod testing {
    //! Scripted `TextCompletion` double.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedCompletion {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
        stall_when_empty: bool,
    }

    impl ScriptedCompletion {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        /// Replays `responses`, then never answers again.
        pub fn stalling_after(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                stall_when_empty: true,
                ..Self::new(responses)
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub fn failure() -> LlmError {
            LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }
        }

        pub fn calls(&self) -> Vec<(Vec<ChatMessage>, CompletionOptions)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextCompletion for ScriptedCompletion {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: CompletionOptions,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push((messages.to_vec(), options));
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(response) => response,
                None if self.stall_when_empty => std::future::pending().await,
                None => Err(LlmError::EmptyContent),
            }
        }
    }
}
