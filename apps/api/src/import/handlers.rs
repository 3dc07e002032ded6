use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::import::extract::{
    enhance_bullet, enhance_experience_bullets, generate_summary, parse_text_to_resume,
    suggest_skills, BatchOutcome,
};
use crate::import::files::extract_text;
use crate::import::linkedin::parse_profile_text;
use crate::import::merge::MergeReport;
use crate::models::resume::{ExperienceEntry, ResumePatch, ResumeRecord};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TextImportRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub report: MergeReport,
    pub resume: ResumeRecord,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Deserialize, Serialize)]
pub struct BulletText {
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub text: String,
    pub variant_count: usize,
}

#[derive(Serialize)]
pub struct BatchEnhanceResponse {
    pub outcome: BatchOutcome,
    pub entry: ExperienceEntry,
}

/// POST /api/v1/import/linkedin
pub async fn handle_import_linkedin_text(
    State(state): State<AppState>,
    Json(req): Json<TextImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let patch = parse_profile_text(&req.text);
    merge_patch(&state, patch).await
}

/// POST /api/v1/import/linkedin/file
pub async fn handle_import_linkedin_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let (file_name, bytes) = read_upload(multipart).await?;
    let text = extract_text(&file_name, bytes).await?;
    info!("LinkedIn import from {file_name}");
    merge_patch(&state, parse_profile_text(&text)).await
}

/// POST /api/v1/import/text
pub async fn handle_import_text(
    State(state): State<AppState>,
    Json(req): Json<TextImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let patch = parse_text_to_resume(&state.session, &req.text).await?;
    merge_patch(&state, patch).await
}

/// POST /api/v1/import/file
pub async fn handle_import_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    // Fail on missing configuration before decoding the upload.
    state.session.completion().await?;
    let (file_name, bytes) = read_upload(multipart).await?;
    let text = extract_text(&file_name, bytes).await?;
    let patch = parse_text_to_resume(&state.session, &text).await?;
    merge_patch(&state, patch).await
}

/// POST /api/v1/ai/skills/suggest
pub async fn handle_suggest_skills(
    State(state): State<AppState>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let skills = state.workspace.lock().await.record().skills.clone();
    let suggestions = suggest_skills(&state.session, &skills).await?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

/// POST /api/v1/ai/bullets/enhance
pub async fn handle_enhance_bullet(
    State(state): State<AppState>,
    Json(req): Json<BulletText>,
) -> Result<Json<BulletText>, AppError> {
    let text = enhance_bullet(&state.session, &req.text).await?;
    Ok(Json(BulletText { text }))
}

/// POST /api/v1/ai/summary
///
/// The draft is appended to the summary variants.
pub async fn handle_generate_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let (experience, skills) = {
        let ws = state.workspace.lock().await;
        (ws.record().experience.clone(), ws.record().skills.clone())
    };
    let text = generate_summary(&state.session, &experience, &skills).await?;
    let variant_count = state
        .workspace
        .lock()
        .await
        .add_summary_variant(text.clone())
        .await?;
    Ok(Json(SummaryResponse {
        text,
        variant_count,
    }))
}

/// POST /api/v1/resume/experience/:id/enhance
///
/// Each enhanced bullet is saved as soon as its response arrives.
pub async fn handle_enhance_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BatchEnhanceResponse>, AppError> {
    let (outcome, entry) =
        enhance_experience_bullets(&state.session, &state.workspace, &id).await?;
    Ok(Json(BatchEnhanceResponse { outcome, entry }))
}

async fn merge_patch(
    state: &AppState,
    patch: ResumePatch,
) -> Result<Json<ImportResponse>, AppError> {
    let mut ws = state.workspace.lock().await;
    let report = ws.merge(patch).await?;
    Ok(Json(ImportResponse {
        report,
        resume: ws.record().clone(),
    }))
}

/// First multipart field named `file`: its file name and contents.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        return Ok((file_name, bytes));
    }
    Err(AppError::Validation("Missing multipart field 'file'".to_string()))
}
