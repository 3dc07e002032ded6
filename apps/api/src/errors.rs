use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// No text-completion provider is configured for this session.
    #[error("AI provider is not configured: {0}")]
    Configuration(String),

    /// The provider answered, but not with the structured data we asked for.
    #[error("Could not parse the AI response for {operation}: {detail}")]
    ExtractionParse { operation: String, detail: String },

    #[error("Import format error: {0}")]
    ImportFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn extraction_parse(operation: &str, detail: impl std::fmt::Display) -> Self {
        AppError::ExtractionParse {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Llm(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Configuration(msg) => (
                StatusCode::PRECONDITION_REQUIRED,
                "CONFIGURATION_ERROR",
                msg.clone(),
            ),
            AppError::ExtractionParse { operation, detail } => {
                tracing::warn!("Unparseable AI response for {operation}: {detail}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_PARSE_ERROR",
                    format!("Failed to parse the AI response for {operation}. Please try again."),
                )
            }
            AppError::ImportFormat(msg) => (
                StatusCode::BAD_REQUEST,
                "IMPORT_FORMAT_ERROR",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Configuration("x".into()), StatusCode::PRECONDITION_REQUIRED),
            (AppError::extraction_parse("resume extraction", "eof"), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::ImportFormat("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Llm("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_extraction_parse_message_names_operation() {
        let err = AppError::extraction_parse("resume tailoring", "expected value");
        assert!(err.to_string().contains("resume tailoring"));
    }
}
