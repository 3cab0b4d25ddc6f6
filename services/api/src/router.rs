//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the two realtime WebSocket channels, and OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{
        ClassroomRuntimeResponse, CreateSessionPayload, ErrorResponse, HintResponse,
        ProcessTurnPayload, SessionCreatedResponse, SessionSummaryResponse, SupervisorHintPayload,
        TaskAssignmentPayload, TurnResponse,
    },
    state::AppState,
    ws::{supervised_ws_handler, unsupervised_ws_handler},
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::get_session,
        handlers::end_session,
        handlers::process_turn,
        handlers::submit_hint,
        handlers::submit_task_assignment,
    ),
    components(
        schemas(
            CreateSessionPayload,
            SessionCreatedResponse,
            SessionSummaryResponse,
            ProcessTurnPayload,
            TurnResponse,
            SupervisorHintPayload,
            HintResponse,
            TaskAssignmentPayload,
            ClassroomRuntimeResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Lyceum API", description = "Classroom and debate turn simulation")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::end_session),
        )
        .route("/sessions/{id}/turns", post(handlers::process_turn))
        .route("/sessions/{id}/hints", post(handlers::submit_hint))
        .route(
            "/sessions/{id}/task-assignment",
            post(handlers::submit_task_assignment),
        )
        .route("/ws/supervised", get(supervised_ws_handler))
        .route("/ws/unsupervised", get(unsupervised_ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
