//! API Models
//!
//! Request and response bodies for the progress REST API, annotated for
//! OpenAPI generation with `utoipa`.

use outlrn_core::curriculum::Status;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema, Debug)]
pub struct UpdateLessonPayload {
    #[schema(example = "done")]
    pub status: Status,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct QuizResultPayload {
    pub passed: bool,
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct ReadinessQuery {
    /// Comma-separated list of required skills, e.g. `react,sql`.
    pub skills: Option<String>,
}

impl ReadinessQuery {
    /// The requested skills with blanks removed, in request order.
    pub fn required_skills(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct ReadinessResponse {
    #[schema(example = 60)]
    pub readiness: u8,
    pub required_skills: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
