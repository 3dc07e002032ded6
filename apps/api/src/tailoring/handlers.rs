use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::tailoring::{apply_contact_fallback, tailor_resume, TailoredResume};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    pub job_description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorResponse {
    pub resume: TailoredResume,
    /// True when the master contact block replaced a nameless one.
    pub contact_restored: bool,
}

/// POST /api/v1/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(req): Json<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    let master = state.workspace.lock().await.record().clone();
    let mut resume = tailor_resume(&state.session, &master, &req.job_description).await?;
    let contact_restored = apply_contact_fallback(&mut resume, &master);
    Ok(Json(TailorResponse {
        resume,
        contact_restored,
    }))
}
