pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tailoring::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Tailoring workflow
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/analyze",
            post(handlers::handle_analyze),
        )
        .route("/api/v1/sessions/:id/accept", post(handlers::handle_accept))
        .route("/api/v1/sessions/:id/reject", post(handlers::handle_reject))
        .route(
            "/api/v1/sessions/:id/artifacts/:kind",
            get(handlers::handle_download_artifact),
        )
        // Standalone CV draft
        .route("/api/v1/cv/draft", post(handlers::handle_draft_cv))
        .with_state(state)
}
