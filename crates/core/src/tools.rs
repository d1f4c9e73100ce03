//! Progress Tools Service
//!
//! Exposes the curriculum progress store to a tutoring LLM through the Model
//! Context Protocol (MCP). One service instance is bound to a single
//! (student, company) pair, so the model can only touch the learner it is
//! currently teaching.

use crate::curriculum::Status;
use crate::progress::{ProgressStore, compute_readiness};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

// --- Data Structures for Tools ---

#[derive(Deserialize, JsonSchema, Debug)]
pub struct SkillArgs {
    /// The skill to inspect, e.g. "react".
    pub skill: String,
}

/// Arguments for changing the status of one lesson.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct UpdateLessonArgs {
    pub skill: String,
    pub module_id: String,
    pub lesson_id: String,
    #[schemars(description = "The new status: 'not_started', 'in_progress', or 'done'")]
    pub status: String,
}

/// Arguments for recording a quiz submission.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct QuizResultArgs {
    pub skill: String,
    pub module_id: String,
    #[schemars(description = "Whether the learner passed this attempt")]
    pub passed: bool,
}

#[derive(Deserialize, JsonSchema, Debug)]
pub struct ReadinessArgs {
    #[schemars(description = "Skills the target project requires")]
    pub required_skills: Vec<String>,
}

// --- Service and Handler Implementation ---

/// MCP tools over the progress of one learner.
pub struct ProgressToolService {
    store: ProgressStore,
    student_id: String,
    company_id: String,
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for ProgressToolService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tool_router]
impl ProgressToolService {
    pub fn new(store: ProgressStore, student_id: String, company_id: String) -> Self {
        Self {
            store,
            student_id,
            company_id,
            tool_router: Self::tool_router(),
        }
    }

    /// Returns the skill's modules, creating the default curriculum on first use.
    #[tool(
        description = "Get the learner's modules, lessons and quiz results for a skill. Initializes the skill's curriculum if needed."
    )]
    pub async fn get_skill_progress(&self, args: Parameters<SkillArgs>) -> Result<String, String> {
        info!(skill = %args.0.skill, "Executing tool 'get_skill_progress'");
        let (progress, _) =
            self.store
                .ensure_skill_initialized(&self.student_id, &self.company_id, &args.0.skill);
        let entry = progress
            .get(&args.0.skill)
            .ok_or_else(|| format!("Skill '{}' could not be initialized.", args.0.skill))?;
        serde_json::to_string(entry).map_err(|e| format!("Failed to serialize progress: {}", e))
    }

    #[tool(
        description = "Set the status of a lesson (e.g. mark lesson 'jsx' of module 'react-fundamentals' as 'done')."
    )]
    pub async fn update_lesson_status(
        &self,
        args: Parameters<UpdateLessonArgs>,
    ) -> Result<String, String> {
        info!(args = ?args.0, "Executing tool 'update_lesson_status'");
        let status: Status = args.0.status.parse()?;

        let skill = self
            .store
            .update_lesson(
                &self.student_id,
                &self.company_id,
                &args.0.skill,
                &args.0.module_id,
                &args.0.lesson_id,
                status,
            )
            .ok_or_else(|| {
                format!(
                    "Lesson '{}' in module '{}' of skill '{}' not found.",
                    args.0.lesson_id, args.0.module_id, args.0.skill
                )
            })?;

        let module_status = skill
            .modules
            .iter()
            .find(|m| m.id == args.0.module_id)
            .map(|m| m.status)
            .unwrap_or_default();
        Ok(format!(
            "OK. Lesson '{}' is now '{}'; module '{}' is '{}'.",
            args.0.lesson_id, status, args.0.module_id, module_status
        ))
    }

    #[tool(description = "Record the result of a module quiz attempt.")]
    pub async fn submit_quiz_result(
        &self,
        args: Parameters<QuizResultArgs>,
    ) -> Result<String, String> {
        info!(args = ?args.0, "Executing tool 'submit_quiz_result'");
        let skill = self
            .store
            .mark_quiz(
                &self.student_id,
                &self.company_id,
                &args.0.skill,
                &args.0.module_id,
                args.0.passed,
            )
            .ok_or_else(|| {
                format!(
                    "Module '{}' of skill '{}' not found.",
                    args.0.module_id, args.0.skill
                )
            })?;

        let attempts = skill
            .modules
            .iter()
            .find(|m| m.id == args.0.module_id)
            .map(|m| m.quiz.attempts)
            .unwrap_or_default();
        Ok(format!(
            "OK. Quiz for module '{}' recorded as {} (attempt {}).",
            args.0.module_id,
            if args.0.passed { "passed" } else { "failed" },
            attempts
        ))
    }

    #[tool(description = "Get the learner's readiness percentage (0-100) for a set of required skills.")]
    pub async fn get_readiness(&self, args: Parameters<ReadinessArgs>) -> Result<String, String> {
        info!(args = ?args.0, "Executing tool 'get_readiness'");
        let progress = self.store.get_progress(&self.student_id, &self.company_id);
        let readiness = compute_readiness(&progress, args.0.required_skills.as_slice());
        Ok(serde_json::json!({ "readiness": readiness }).to_string())
    }
}
