//! Axum route handlers for the tailoring workflow.

use std::io::ErrorKind;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::artifacts::{create_artifacts, ArtifactPair};
use crate::state::AppState;
use crate::tailoring::analyzer::{analyze, AnalyzeRequest, Proposal};
use crate::tailoring::drafting::{draft_cv, DraftCvRequest, DraftCvResponse};
use crate::tailoring::session::SessionSnapshot;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub attempt: u32,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub session_id: Uuid,
    pub attempt: u32,
    #[serde(flatten)]
    pub proposal: Proposal,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub artifacts: ArtifactPair,
}

#[derive(Debug, Serialize)]
pub struct RejectResponse {
    pub session_id: Uuid,
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Tex,
    Pdf,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.sessions.create().await;
    info!("Created tailoring session {}", session.id);
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            attempt: session.attempt,
        }),
    )
}

/// GET /api/v1/sessions/:id
///
/// Never waits on an in-flight operation: while one runs, `busy` is true and
/// the state shown is the one from before it started.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.snapshot(session_id).await?))
}

/// DELETE /api/v1/sessions/:id
///
/// Forgets the session. Accepted artifact files are left on disk.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(session_id).await?;
    info!("Deleted tailoring session {session_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/analyze
///
/// Runs a full analysis cycle against the base template and stores the
/// resulting proposal on the session, replacing any earlier one.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    request.validate()?;
    let mut session = state.sessions.lock(session_id).await?;

    let base_resume = state.templates.read().await?;
    let proposal = analyze(
        state.generator.as_ref(),
        &state.matcher,
        &base_resume,
        &request,
    )
    .await?;

    session.start_analysis(proposal.clone());
    info!(
        "Session {session_id}: proposal ready (attempt {}, changed sections: {:?})",
        session.attempt,
        proposal.changed_sections()
    );

    Ok(Json(AnalyzeResponse {
        session_id,
        attempt: session.attempt,
        proposal,
    }))
}

/// POST /api/v1/sessions/:id/accept
///
/// Writes and compiles the proposed LaTeX into the session's own output
/// subdirectory. On compile failure the proposal stays pending so the user can
/// retry or reject it.
pub async fn handle_accept(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<AcceptResponse>, AppError> {
    let mut session = state.sessions.lock(session_id).await?;
    let proposal = session.pending_proposal()?;

    let artifacts = create_artifacts(
        state.compiler.as_ref(),
        &proposal.modified_latex,
        &proposal.company_name,
        Local::now().date_naive(),
        &session_id.to_string(),
    )
    .await?;

    session.accept(artifacts.clone())?;
    info!("Session {session_id}: accepted → {}", artifacts.pdf_file);

    Ok(Json(AcceptResponse {
        session_id,
        artifacts,
    }))
}

/// POST /api/v1/sessions/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<RejectResponse>, AppError> {
    let mut session = state.sessions.lock(session_id).await?;
    let attempt = session.reject()?;
    info!("Session {session_id}: proposal rejected (attempt {attempt})");
    Ok(Json(RejectResponse {
        session_id,
        attempt,
    }))
}

/// GET /api/v1/sessions/:id/artifacts/:kind
///
/// Downloads the accepted `.tex` or `.pdf` file of a session.
pub async fn handle_download_artifact(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(Uuid, ArtifactKind)>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.sessions.snapshot(session_id).await?;
    let artifacts = snapshot.session.artifacts().ok_or_else(|| {
        AppError::NotFound(format!("Session {session_id} has no accepted resume yet"))
    })?;

    let (path, file_name, content_type) = match kind {
        ArtifactKind::Tex => (&artifacts.tex_path, &artifacts.tex_file, "text/plain; charset=utf-8"),
        ArtifactKind::Pdf => (&artifacts.pdf_path, &artifacts.pdf_file, "application/pdf"),
    };

    let data = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            AppError::NotFound(format!("{file_name} no longer exists"))
        } else {
            AppError::Internal(anyhow::anyhow!("Failed to read {}: {e}", path.display()))
        }
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        Bytes::from(data),
    ))
}

/// POST /api/v1/cv/draft
pub async fn handle_draft_cv(
    State(state): State<AppState>,
    Json(request): Json<DraftCvRequest>,
) -> Result<Json<DraftCvResponse>, AppError> {
    let cv_markdown = draft_cv(state.generator.as_ref(), &request.job_description).await?;
    Ok(Json(DraftCvResponse { cv_markdown }))
}
