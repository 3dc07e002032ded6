//! Session-scoped AI provider settings.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::llm_client::session::{providers, ProviderInfo, SessionStatus};
use crate::llm_client::{LlmSettings, ModelInfo, Provider};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsRequest {
    pub provider: Provider,
    pub api_key: String,
}

/// GET /api/v1/ai/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session.status().await)
}

/// PUT /api/v1/ai/session
pub async fn handle_configure_session(
    State(state): State<AppState>,
    Json(settings): Json<LlmSettings>,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(state.session.configure(settings).await?))
}

/// DELETE /api/v1/ai/session
pub async fn handle_clear_session(State(state): State<AppState>) -> Json<SessionStatus> {
    state.session.clear().await;
    Json(state.session.status().await)
}

/// GET /api/v1/ai/providers
pub async fn handle_list_providers() -> Json<Vec<ProviderInfo>> {
    Json(providers())
}

/// POST /api/v1/ai/models
///
/// Lists models for a key without changing the session.
pub async fn handle_list_models(
    State(state): State<AppState>,
    Json(req): Json<ModelsRequest>,
) -> Result<Json<Vec<ModelInfo>>, AppError> {
    Ok(Json(
        state.session.list_models(req.provider, req.api_key).await?,
    ))
}
