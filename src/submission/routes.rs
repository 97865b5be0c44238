//! REST endpoints for the submission wizard.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::{AdvanceError, WizardError};

use super::controller::WizardController;
use super::service::SubmissionService;
use super::steps::{STEPS, StepId};
use super::validator::RawInput;

/// Shared state for submission routes.
#[derive(Clone)]
pub struct SubmissionRouteState {
    pub controller: Arc<Mutex<WizardController>>,
    pub service: Arc<dyn SubmissionService>,
}

fn error_body(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({"error": message.to_string()}))).into_response()
}

fn parse_step(raw: &str) -> Result<StepId, Response> {
    StepId::parse(raw).ok_or_else(|| {
        error_body(
            StatusCode::NOT_FOUND,
            WizardError::UnknownStep(raw.to_string()),
        )
    })
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "innovation-intake"
    }))
}

/// GET /api/submission/steps
///
/// Step definitions in wizard order, for rendering forms.
async fn list_steps() -> impl IntoResponse {
    Json(&STEPS)
}

/// GET /api/submission/status
async fn get_status(State(state): State<SubmissionRouteState>) -> impl IntoResponse {
    let controller = state.controller.lock().await;
    Json(controller.status())
}

/// POST /api/submission/resume
///
/// Called once when the wizard mounts; moves to the first incomplete step.
async fn resume(State(state): State<SubmissionRouteState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    controller.resume();
    Json(controller.status())
}

/// POST /api/submission/steps/{step}/advance
async fn advance(
    State(state): State<SubmissionRouteState>,
    Path(step): Path<String>,
    Json(input): Json<RawInput>,
) -> Response {
    let step = match parse_step(&step) {
        Ok(step) => step,
        Err(resp) => return resp,
    };

    let mut controller = state.controller.lock().await;
    match controller.advance(step, &input).await {
        Ok(next) => Json(json!({"next": next})).into_response(),
        Err(AdvanceError::Invalid(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"errors": errors})),
        )
            .into_response(),
        Err(e @ AdvanceError::Locked { .. }) => error_body(StatusCode::CONFLICT, e),
        Err(AdvanceError::ProgressNotSaved { next, source }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": format!("Progress could not be saved: {source}"),
                "next": next,
            })),
        )
            .into_response(),
    }
}

/// POST /api/submission/steps/{step}/revisit
///
/// Move back to a step; returns the values currently held for it.
async fn revisit(
    State(state): State<SubmissionRouteState>,
    Path(step): Path<String>,
) -> Response {
    let step = match parse_step(&step) {
        Ok(step) => step,
        Err(resp) => return resp,
    };

    let mut controller = state.controller.lock().await;
    match controller.revisit(step) {
        Ok(values) => Json(json!({
            "step": step,
            "complete": controller.store().is_step_complete(step),
            "values": values,
        }))
        .into_response(),
        Err(e) => error_body(StatusCode::CONFLICT, e),
    }
}

/// POST /api/submission/submit
async fn submit(State(state): State<SubmissionRouteState>) -> Response {
    let mut controller = state.controller.lock().await;
    match controller.submit(state.service.as_ref()).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e @ WizardError::Incomplete { .. }) => error_body(StatusCode::CONFLICT, e),
        Err(e @ WizardError::Submission(_)) => error_body(StatusCode::BAD_GATEWAY, e),
        Err(e) => error_body(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// POST /api/submission/reset
async fn reset(State(state): State<SubmissionRouteState>) -> Response {
    let mut controller = state.controller.lock().await;
    match controller.cancel().await {
        Ok(position) => Json(json!({"position": position})).into_response(),
        Err(e) => error_body(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Build the submission REST routes.
pub fn submission_routes(state: SubmissionRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/submission/steps", get(list_steps))
        .route("/api/submission/status", get(get_status))
        .route("/api/submission/resume", post(resume))
        .route("/api/submission/steps/{step}/revisit", post(revisit))
        .route("/api/submission/steps/{step}/advance", post(advance))
        .route("/api/submission/submit", post(submit))
        .route("/api/submission/reset", post(reset))
        .with_state(state)
}
