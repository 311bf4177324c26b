use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::render::CompileError;
use crate::resume::sections::MatchError;
use crate::resume::template_store::TemplateError;
use crate::tailoring::prompts::PromptError;
use crate::tailoring::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Generation service error: {0}")]
    Llm(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Section comparison failed: {0}")]
    Match(#[from] MatchError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Session(e) => (StatusCode::CONFLICT, "INVALID_TRANSITION", e.to_string()),
            AppError::Template(e) => {
                tracing::error!("Template error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_ERROR",
                    "The base resume template could not be loaded".to_string(),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    "The text generation service failed; try regenerating".to_string(),
                )
            }
            AppError::Prompt(e) => {
                tracing::error!("Prompt error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROMPT_ERROR",
                    "A generation request could not be built".to_string(),
                )
            }
            AppError::Match(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MATCH_ERROR",
                e.to_string(),
            ),
            AppError::Compile(e) => {
                tracing::error!("Compile error: {e}");
                // The compiler diagnostic is the only useful hint for fixing the LaTeX.
                (StatusCode::UNPROCESSABLE_ENTITY, "COMPILE_ERROR", e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

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
    fn test_status_codes_per_kind() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Session(SessionError::NoProposal), StatusCode::CONFLICT),
            (AppError::Llm(LlmError::EmptyContent), StatusCode::BAD_GATEWAY),
            (
                AppError::Match(MatchError::MalformedMarker { line: 2 }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Compile(CompileError::Failed {
                    pass: 1,
                    code: Some(1),
                    stderr: "boom".into(),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.parts().0, status, "{err}");
        }
    }

    #[test]
    fn test_compile_error_message_carries_diagnostic() {
        let err = AppError::Compile(CompileError::Failed {
            pass: 2,
            code: Some(1),
            stderr: "! Missing $ inserted.".into(),
        });
        let (_, code, message) = err.parts();
        assert_eq!(code, "COMPILE_ERROR");
        assert!(message.contains("! Missing $ inserted."));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("secret path /etc/x"));
        let (_, _, message) = err.parts();
        assert!(!message.contains("/etc/x"));
    }
}
