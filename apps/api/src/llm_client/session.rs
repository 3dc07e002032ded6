//! Session-scoped provider settings.
//!
//! Credentials live in memory for the life of the process only. Every
//! AI-backed operation asks `SessionConfig::completion()` first, which fails
//! with `AppError::Configuration` before any network traffic when nothing is set.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmSettings, ModelInfo, Provider, TextCompletion};

const NOT_CONFIGURED: &str = "Please configure your AI provider first.";

struct ActiveSession {
    provider: Provider,
    model: String,
    completion: Arc<dyn TextCompletion>,
}

#[derive(Clone)]
pub struct SessionConfig {
    active: Arc<RwLock<Option<ActiveSession>>>,
    timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub configured: bool,
    pub provider: Option<Provider>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Providers a session can select.
pub fn providers() -> Vec<ProviderInfo> {
    Provider::ALL
        .iter()
        .map(|p| ProviderInfo {
            id: p.id(),
            name: p.display_name(),
        })
        .collect()
}

impl SessionConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
            timeout,
        }
    }

    /// Replaces the session settings. Blank key or model is rejected.
    pub async fn configure(&self, settings: LlmSettings) -> Result<SessionStatus, AppError> {
        validate(&settings)?;
        let client = LlmClient::new(settings.clone(), self.timeout)?;
        info!(
            "AI session configured: provider={}, model={}",
            settings.provider.id(),
            settings.model
        );
        self.install(settings.provider, settings.model, Arc::new(client))
            .await;
        Ok(self.status().await)
    }

    pub async fn clear(&self) {
        *self.active.write().await = None;
        info!("AI session cleared");
    }

    pub async fn status(&self) -> SessionStatus {
        match self.active.read().await.as_ref() {
            Some(s) => SessionStatus {
                configured: true,
                provider: Some(s.provider),
                model: Some(s.model.clone()),
            },
            None => SessionStatus {
                configured: false,
                provider: None,
                model: None,
            },
        }
    }

    /// The configured capability, or a configuration error.
    pub async fn completion(&self) -> Result<Arc<dyn TextCompletion>, AppError> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.completion))
            .ok_or_else(|| AppError::Configuration(NOT_CONFIGURED.to_string()))
    }

    /// Lists the models available to an API key without touching the session.
    pub async fn list_models(
        &self,
        provider: Provider,
        api_key: String,
    ) -> Result<Vec<ModelInfo>, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Validation("apiKey must not be empty".to_string()));
        }
        let client = LlmClient::new(
            LlmSettings {
                provider,
                api_key,
                model: String::new(),
            },
            self.timeout,
        )?;
        Ok(client.list_models().await?)
    }

    async fn install(&self, provider: Provider, model: String, completion: Arc<dyn TextCompletion>) {
        *self.active.write().await = Some(ActiveSession {
            provider,
            model,
            completion,
        });
    }

    /// A session already bound to `completion`.
    #[cfg(test)]
    pub async fn with_completion(completion: Arc<dyn TextCompletion>) -> Self {
        let session = Self::new(Duration::from_secs(1));
        session
            .install(Provider::Anthropic, "test-model".to_string(), completion)
            .await;
        session
    }
}

fn validate(settings: &LlmSettings) -> Result<(), AppError> {
    if settings.api_key.trim().is_empty() {
        return Err(AppError::Validation("apiKey must not be empty".to_string()));
    }
    if settings.model.trim().is_empty() {
        return Err(AppError::Validation("model must not be empty".to_string()));
    }
    Ok(())
}
