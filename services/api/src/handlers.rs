//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests against the
//! curriculum progress store. It uses `utoipa` doc comments to generate
//! OpenAPI documentation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use outlrn_core::progress::{
    ProgressStore, SkillProgress, compute_readiness, validate_learner_ids,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{
        ErrorResponse, QuizResultPayload, ReadinessQuery, ReadinessResponse, UpdateLessonPayload,
    },
    state::AppState,
};

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

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn validate_ids(student_id: &str, company_id: &str) -> Result<(), ApiError> {
    validate_learner_ids(student_id, company_id).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Runs a store operation off the async runtime; storage backends do blocking I/O.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&ProgressStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = state.progress.clone();
    Ok(tokio::task::spawn_blocking(move || op(&store)).await?)
}

/// Get all tracked skills for a student at a company.
#[utoipa::path(
    get,
    path = "/progress/{student_id}/{company_id}",
    responses(
        (status = 200, description = "Progress keyed by skill", body = BTreeMap<String, SkillProgress>),
        (status = 400, description = "Bad request", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID"),
        ("company_id" = String, Path, description = "Company ID")
    )
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((student_id, company_id)): Path<(String, String)>,
) -> Result<Json<BTreeMap<String, SkillProgress>>, ApiError> {
    validate_ids(&student_id, &company_id)?;
    let progress = with_store(&state, move |store| {
        store.get_progress(&student_id, &company_id)
    })
    .await?;
    Ok(Json(progress))
}

/// Initialize a skill's curriculum (idempotent) and return it.
#[utoipa::path(
    post,
    path = "/progress/{student_id}/{company_id}/skills/{skill}",
    responses(
        (status = 200, description = "The skill's progress", body = SkillProgress),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID"),
        ("company_id" = String, Path, description = "Company ID"),
        ("skill" = String, Path, description = "Skill name, e.g. react")
    )
)]
pub async fn ensure_skill(
    State(state): State<Arc<AppState>>,
    Path((student_id, company_id, skill)): Path<(String, String, String)>,
) -> Result<Json<SkillProgress>, ApiError> {
    validate_ids(&student_id, &company_id)?;
    let (mut progress, skill) = with_store(&state, move |store| {
        let (progress, _) = store.ensure_skill_initialized(&student_id, &company_id, &skill);
        (progress, skill)
    })
    .await?;

    let entry = progress
        .remove(&skill)
        .ok_or_else(|| anyhow::anyhow!("Skill '{}' missing after initialization", skill))?;
    Ok(Json(entry))
}

/// Set the status of a single lesson.
#[utoipa::path(
    patch,
    path = "/progress/{student_id}/{company_id}/skills/{skill}/modules/{module_id}/lessons/{lesson_id}",
    request_body = UpdateLessonPayload,
    responses(
        (status = 200, description = "Lesson updated", body = SkillProgress),
        (status = 404, description = "Skill not initialized or lesson not found", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID"),
        ("company_id" = String, Path, description = "Company ID"),
        ("skill" = String, Path, description = "Skill name"),
        ("module_id" = String, Path, description = "Module ID"),
        ("lesson_id" = String, Path, description = "Lesson ID")
    )
)]
pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    Path((student_id, company_id, skill, module_id, lesson_id)): Path<(
        String,
        String,
        String,
        String,
        String,
    )>,
    Json(payload): Json<UpdateLessonPayload>,
) -> Result<Json<SkillProgress>, ApiError> {
    validate_ids(&student_id, &company_id)?;
    let not_found = format!(
        "Lesson '{}' in module '{}' of skill '{}' not found",
        lesson_id, module_id, skill
    );
    let updated = with_store(&state, move |store| {
        store.update_lesson(
            &student_id,
            &company_id,
            &skill,
            &module_id,
            &lesson_id,
            payload.status,
        )
    })
    .await?;

    updated.map(Json).ok_or(ApiError::NotFound(not_found))
}

/// Record a quiz submission for a module.
#[utoipa::path(
    post,
    path = "/progress/{student_id}/{company_id}/skills/{skill}/modules/{module_id}/quiz",
    request_body = QuizResultPayload,
    responses(
        (status = 200, description = "Quiz result recorded", body = SkillProgress),
        (status = 404, description = "Skill not initialized or module not found", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID"),
        ("company_id" = String, Path, description = "Company ID"),
        ("skill" = String, Path, description = "Skill name"),
        ("module_id" = String, Path, description = "Module ID")
    )
)]
pub async fn mark_quiz(
    State(state): State<Arc<AppState>>,
    Path((student_id, company_id, skill, module_id)): Path<(String, String, String, String)>,
    Json(payload): Json<QuizResultPayload>,
) -> Result<Json<SkillProgress>, ApiError> {
    validate_ids(&student_id, &company_id)?;
    let not_found = format!("Module '{}' of skill '{}' not found", module_id, skill);
    let updated = with_store(&state, move |store| {
        store.mark_quiz(&student_id, &company_id, &skill, &module_id, payload.passed)
    })
    .await?;

    updated.map(Json).ok_or(ApiError::NotFound(not_found))
}

/// Compute readiness for a set of required skills.
#[utoipa::path(
    get,
    path = "/progress/{student_id}/{company_id}/readiness",
    responses(
        (status = 200, description = "Readiness percentage", body = ReadinessResponse),
        (status = 400, description = "Bad request", body = ErrorResponse)
    ),
    params(
        ("student_id" = String, Path, description = "Student ID"),
        ("company_id" = String, Path, description = "Company ID"),
        ReadinessQuery
    )
)]
pub async fn get_readiness(
    State(state): State<Arc<AppState>>,
    Path((student_id, company_id)): Path<(String, String)>,
    Query(query): Query<ReadinessQuery>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    validate_ids(&student_id, &company_id)?;
    let required_skills = query.required_skills();
    let progress = with_store(&state, move |store| {
        store.get_progress(&student_id, &company_id)
    })
    .await?;

    Ok(Json(ReadinessResponse {
        readiness: compute_readiness(&progress, required_skills.as_slice()),
        required_skills,
    }))
}
