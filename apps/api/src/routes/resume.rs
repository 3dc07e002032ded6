//! Master record CRUD, export and wholesale import.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::resume::{
    drop_nulls, AwardEntry, BulletPoint, CertificationEntry, Contact, EducationEntry,
    ExperienceEntry, ProjectEntry, PublicationEntry, ResumeRecord, Section, SectionEntry,
    SkillEntry, SkillGroup, Summary,
};
use crate::state::AppState;
use crate::store::workspace::{ContactUpdate, ResumeWorkspace};

const EXPORT_FILE_NAME: &str = "master-resume.json";

#[derive(Deserialize)]
pub struct TextBody {
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantAdded {
    pub variant_count: usize,
}

/// Runs `$body` with `$T` bound to the entry type stored in `$section`.
macro_rules! with_entry_type {
    ($section:expr, $T:ident => $body:expr) => {
        match $section {
            Section::Experience => {
                type $T = ExperienceEntry;
                $body
            }
            Section::Education => {
                type $T = EducationEntry;
                $body
            }
            Section::Certifications => {
                type $T = CertificationEntry;
                $body
            }
            Section::Projects => {
                type $T = ProjectEntry;
                $body
            }
            Section::Awards => {
                type $T = AwardEntry;
                $body
            }
            Section::Publications => {
                type $T = PublicationEntry;
                $body
            }
        }
    };
}

/// GET /api/v1/resume
pub async fn handle_get_resume(State(state): State<AppState>) -> Json<ResumeRecord> {
    Json(state.workspace.lock().await.record().clone())
}

/// DELETE /api/v1/resume
pub async fn handle_reset_resume(
    State(state): State<AppState>,
) -> Result<Json<ResumeRecord>, AppError> {
    let mut ws = state.workspace.lock().await;
    Ok(Json(ws.reset().await?.clone()))
}

/// GET /api/v1/resume/export
pub async fn handle_export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let document = state.workspace.lock().await.export_json()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        document,
    ))
}

/// POST /api/v1/resume/import
///
/// Takes the raw body so malformed JSON surfaces as an import-format error.
pub async fn handle_import(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ResumeRecord>, AppError> {
    let mut ws = state.workspace.lock().await;
    Ok(Json(ws.import_json(&body).await?.clone()))
}

/// PATCH /api/v1/resume/contact
pub async fn handle_update_contact(
    State(state): State<AppState>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<Contact>, AppError> {
    let mut ws = state.workspace.lock().await;
    ws.update_contact(update).await?;
    Ok(Json(ws.record().contact.clone()))
}

/// PUT /api/v1/resume/summary
pub async fn handle_update_summary(
    State(state): State<AppState>,
    Json(req): Json<TextBody>,
) -> Result<Json<Summary>, AppError> {
    let mut ws = state.workspace.lock().await;
    ws.update_summary(req.text).await?;
    Ok(Json(ws.record().summary.clone()))
}

/// POST /api/v1/resume/summary/variants
pub async fn handle_add_summary_variant(
    State(state): State<AppState>,
    Json(req): Json<TextBody>,
) -> Result<(StatusCode, Json<VariantAdded>), AppError> {
    let variant_count = state
        .workspace
        .lock()
        .await
        .add_summary_variant(req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(VariantAdded { variant_count })))
}

/// POST /api/v1/resume/skills/:group
///
/// Accepts a skill object or a bare name.
pub async fn handle_add_skill(
    State(state): State<AppState>,
    Path(group): Path<SkillGroup>,
    Json(skill): Json<SkillEntry>,
) -> Result<(StatusCode, Json<SkillEntry>), AppError> {
    let skill = state.workspace.lock().await.add_skill(group, skill).await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

/// PUT /api/v1/resume/skills/:group
pub async fn handle_replace_skills(
    State(state): State<AppState>,
    Path(group): Path<SkillGroup>,
    Json(skills): Json<Vec<SkillEntry>>,
) -> Result<Json<Vec<SkillEntry>>, AppError> {
    let skills = state
        .workspace
        .lock()
        .await
        .replace_skills(group, skills)
        .await?;
    Ok(Json(skills))
}

/// DELETE /api/v1/resume/skills/:group/:id
pub async fn handle_remove_skill(
    State(state): State<AppState>,
    Path((group, id)): Path<(SkillGroup, String)>,
) -> Result<StatusCode, AppError> {
    state.workspace.lock().await.remove_skill(group, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resume/sections/:section
///
/// Omitted fields take the factory defaults, including a fresh id.
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path(section): Path<Section>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut ws = state.workspace.lock().await;
    let entry = with_entry_type!(section, T => add_entry_as::<T>(&mut ws, body).await)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v1/resume/sections/:section/:id
pub async fn handle_get_entry(
    State(state): State<AppState>,
    Path((section, id)): Path<(Section, String)>,
) -> Result<Json<Value>, AppError> {
    let ws = state.workspace.lock().await;
    let entry = with_entry_type!(section, T => to_value(ws.entry::<T>(&id)?))?;
    Ok(Json(entry))
}

/// PATCH /api/v1/resume/sections/:section/:id
pub async fn handle_update_entry(
    State(state): State<AppState>,
    Path((section, id)): Path<(Section, String)>,
    Json(changes): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let mut ws = state.workspace.lock().await;
    let entry = with_entry_type!(section, T => {
        let updated: T = ws.update_entry(&id, changes).await?;
        to_value(&updated)
    })?;
    Ok(Json(entry))
}

/// DELETE /api/v1/resume/sections/:section/:id
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((section, id)): Path<(Section, String)>,
) -> Result<StatusCode, AppError> {
    let mut ws = state.workspace.lock().await;
    with_entry_type!(section, T => ws.remove_entry::<T>(&id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resume/experience/:id/bullets
pub async fn handle_add_bullet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TextBody>,
) -> Result<(StatusCode, Json<BulletPoint>), AppError> {
    let bullet = state.workspace.lock().await.add_bullet(&id, req.text).await?;
    Ok((StatusCode::CREATED, Json(bullet)))
}

async fn add_entry_as<T: SectionEntry>(
    ws: &mut ResumeWorkspace,
    mut body: Value,
) -> Result<Value, AppError> {
    drop_nulls(&mut body);
    let entry: T = serde_json::from_value(body).map_err(|e| {
        AppError::Validation(format!("Invalid {} entry: {e}", T::SECTION.as_str()))
    })?;
    let entry = ws.add_entry(entry).await?;
    to_value(&entry)
}

fn to_value<T: Serialize>(entry: &T) -> Result<Value, AppError> {
    serde_json::to_value(entry).map_err(|e| AppError::Internal(e.into()))
}
