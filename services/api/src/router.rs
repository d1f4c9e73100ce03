//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the progress REST API, the teaching WebSocket endpoint, and
//! OpenAPI documentation.

use crate::{
    handlers,
    models::{ErrorResponse, QuizResultPayload, ReadinessResponse, UpdateLessonPayload},
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, patch, post},
};
use outlrn_core::{
    curriculum::{Lesson, Module, Quiz, Status},
    progress::SkillProgress,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_progress,
        handlers::ensure_skill,
        handlers::update_lesson,
        handlers::mark_quiz,
        handlers::get_readiness,
    ),
    components(
        schemas(SkillProgress, Module, Lesson, Quiz, Status, UpdateLessonPayload, QuizResultPayload, ReadinessResponse, ErrorResponse)
    ),
    tags(
        (name = "Outlrn API", description = "Curriculum progress for the teaching agent")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/progress/{student_id}/{company_id}",
            get(handlers::get_progress),
        )
        .route(
            "/progress/{student_id}/{company_id}/readiness",
            get(handlers::get_readiness),
        )
        .route(
            "/progress/{student_id}/{company_id}/skills/{skill}",
            post(handlers::ensure_skill),
        )
        .route(
            "/progress/{student_id}/{company_id}/skills/{skill}/modules/{module_id}/lessons/{lesson_id}",
            patch(handlers::update_lesson),
        )
        .route(
            "/progress/{student_id}/{company_id}/skills/{skill}/modules/{module_id}/quiz",
            post(handlers::mark_quiz),
        )
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
