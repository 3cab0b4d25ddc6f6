//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for the simulation.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use lyceum_core::SimulationError;
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{
        ClassroomRuntimeResponse, CreateSessionPayload, ErrorResponse, HintResponse,
        ProcessTurnPayload, SessionCreatedResponse, SessionSummaryResponse, SupervisorHintPayload,
        TaskAssignmentPayload, TurnResponse,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::NotFound { .. } => Self::NotFound(err.to_string()),
            SimulationError::BadRequest(message) => Self::BadRequest(message),
            SimulationError::Internal(_) => Self::InternalServerError(err.into()),
        }
    }
}

/// Create a new classroom or debate session.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = SessionCreatedResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Classroom not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.create_session(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(SessionCreatedResponse::from(created))))
}

/// Get a session summary by its ID.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session summary", body = SessionSummaryResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummaryResponse>, ApiError> {
    let summary = state.service.get_session_summary(&id).await?;
    Ok(Json(summary.into()))
}

/// End a session and release its state.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.end_session(&id).await?;
    state.gateway.forget_session(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// Submit one instructor message and run a turn.
#[utoipa::path(
    post,
    path = "/sessions/{id}/turns",
    request_body = ProcessTurnPayload,
    responses(
        (status = 200, description = "Turn processed, blocked or paused", body = TurnResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Agent execution failed", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn process_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ProcessTurnPayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let result = state.service.process_turn(&id, &payload.message).await?;
    Ok(Json(result.into()))
}

/// Queue a supervisor hint for the next turn of a supervised classroom.
#[utoipa::path(
    post,
    path = "/sessions/{id}/hints",
    request_body = SupervisorHintPayload,
    responses(
        (status = 202, description = "Hint queued", body = HintResponse),
        (status = 400, description = "Empty hint or unsupervised session", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn submit_hint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SupervisorHintPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .service
        .submit_supervisor_hint(&id, &payload.hint_text)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(HintResponse::from(receipt))))
}

/// Assign practice groups and resume a paused classroom.
#[utoipa::path(
    post,
    path = "/sessions/{id}/task-assignment",
    request_body = TaskAssignmentPayload,
    responses(
        (status = 200, description = "Assignment accepted", body = ClassroomRuntimeResponse),
        (status = 400, description = "Invalid groups or not a classroom", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn submit_task_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<TaskAssignmentPayload>,
) -> Result<Json<ClassroomRuntimeResponse>, ApiError> {
    let classroom_runtime = state
        .service
        .submit_task_assignment(&id, payload.into())
        .await?;
    Ok(Json(ClassroomRuntimeResponse { classroom_runtime }))
}
