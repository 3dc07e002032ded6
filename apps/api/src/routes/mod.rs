pub mod health;
pub mod resume;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::import::handlers as import;
use crate::state::AppState;
use crate::tailoring::handlers as tailoring;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        // Master record
        .route(
            "/api/v1/resume",
            get(resume::handle_get_resume).delete(resume::handle_reset_resume),
        )
        .route("/api/v1/resume/export", get(resume::handle_export))
        .route("/api/v1/resume/import", post(resume::handle_import))
        .route(
            "/api/v1/resume/contact",
            patch(resume::handle_update_contact),
        )
        .route("/api/v1/resume/summary", put(resume::handle_update_summary))
        .route(
            "/api/v1/resume/summary/variants",
            post(resume::handle_add_summary_variant),
        )
        .route(
            "/api/v1/resume/skills/:group",
            post(resume::handle_add_skill).put(resume::handle_replace_skills),
        )
        .route(
            "/api/v1/resume/skills/:group/:id",
            delete(resume::handle_remove_skill),
        )
        .route(
            "/api/v1/resume/sections/:section",
            post(resume::handle_add_entry),
        )
        .route(
            "/api/v1/resume/sections/:section/:id",
            get(resume::handle_get_entry)
                .patch(resume::handle_update_entry)
                .delete(resume::handle_remove_entry),
        )
        .route(
            "/api/v1/resume/experience/:id/bullets",
            post(resume::handle_add_bullet),
        )
        .route(
            "/api/v1/resume/experience/:id/enhance",
            post(import::handle_enhance_experience),
        )
        // Imports
        .route(
            "/api/v1/import/linkedin",
            post(import::handle_import_linkedin_text),
        )
        .route(
            "/api/v1/import/linkedin/file",
            post(import::handle_import_linkedin_file),
        )
        .route("/api/v1/import/text", post(import::handle_import_text))
        .route("/api/v1/import/file", post(import::handle_import_file))
        // AI session and operations
        .route(
            "/api/v1/ai/session",
            get(session::handle_get_session)
                .put(session::handle_configure_session)
                .delete(session::handle_clear_session),
        )
        .route("/api/v1/ai/providers", get(session::handle_list_providers))
        .route("/api/v1/ai/models", post(session::handle_list_models))
        .route(
            "/api/v1/ai/skills/suggest",
            post(import::handle_suggest_skills),
        )
        .route(
            "/api/v1/ai/bullets/enhance",
            post(import::handle_enhance_bullet),
        )
        .route("/api/v1/ai/summary", post(import::handle_generate_summary))
        // Tailoring
        .route("/api/v1/tailor", post(tailoring::handle_tailor))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
