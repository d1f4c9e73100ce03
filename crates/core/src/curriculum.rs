//! Curriculum Model and Templates
//!
//! This module defines the learning content tracked per skill: modules made of
//! lessons plus one quiz. It also holds the hard-coded curriculum templates used
//! to bootstrap a skill the first time a student opens it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Completion state shared by lessons and modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotStarted => write!(f, "not_started"),
            Status::InProgress => write!(f, "in_progress"),
            Status::Done => write!(f, "done"),
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Status::NotStarted),
            "in_progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(format!("Invalid status: '{}'", other)),
        }
    }
}

/// The smallest trackable unit of learning content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub status: Status,
}

impl Lesson {
    /// Creates a lesson that has not been started yet.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: Status::NotStarted,
        }
    }
}

/// Quiz state attached to a module.
///
/// `attempts` counts every submission; `passed` only reflects the latest one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Quiz {
    pub passed: bool,
    pub attempts: u32,
}

impl Quiz {
    /// Records one submission.
    pub fn record(&mut self, passed: bool) {
        self.passed = passed;
        self.attempts = self.attempts.saturating_add(1);
    }
}

/// A named group of lessons plus one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Module {
    pub id: String,
    pub title: String,
    /// Derived from `lessons`; see [`derive_module_status`].
    pub status: Status,
    pub lessons: Vec<Lesson>,
    pub quiz: Quiz,
}

impl Module {
    pub fn new(id: impl Into<String>, title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        let status = derive_module_status(&lessons);
        Self {
            id: id.into(),
            title: title.into(),
            status,
            lessons,
            quiz: Quiz::default(),
        }
    }

    /// Sets a lesson's status and recomputes the module status.
    ///
    /// Returns `false` when no lesson carries `lesson_id`.
    pub fn set_lesson_status(&mut self, lesson_id: &str, status: Status) -> bool {
        let Some(lesson) = self.lessons.iter_mut().find(|l| l.id == lesson_id) else {
            return false;
        };
        lesson.status = status;
        self.status = derive_module_status(&self.lessons);
        true
    }

    /// A module counts toward readiness only once its lessons are done and its quiz passed.
    pub fn is_complete(&self) -> bool {
        self.status == Status::Done && self.quiz.passed
    }
}

/// Computes a module's status from its lessons.
///
/// `Done` iff every lesson is done, `InProgress` iff any lesson has left
/// `NotStarted`, otherwise `NotStarted`. A module without lessons is vacuously `Done`.
pub fn derive_module_status(lessons: &[Lesson]) -> Status {
    if lessons.iter().all(|l| l.status == Status::Done) {
        Status::Done
    } else if lessons.iter().any(|l| l.status != Status::NotStarted) {
        Status::InProgress
    } else {
        Status::NotStarted
    }
}

/// Builds the starting curriculum for a skill.
///
/// Lookup is by lower-cased skill name. Skills without a dedicated template get
/// a generic two-module placeholder.
pub fn default_modules(skill: &str) -> Vec<Module> {
    match skill.trim().to_lowercase().as_str() {
        "react" => react_curriculum(),
        _ => generic_curriculum(skill.trim()),
    }
}

fn module(id: &str, title: &str, lessons: &[(&str, &str)]) -> Module {
    Module::new(
        id,
        title,
        lessons
            .iter()
            .map(|(lesson_id, lesson_title)| Lesson::new(*lesson_id, *lesson_title))
            .collect(),
    )
}

fn react_curriculum() -> Vec<Module> {
    vec![
        module(
            "react-fundamentals",
            "React Fundamentals",
            &[
                ("jsx", "JSX and Rendering"),
                ("components", "Function Components"),
                ("props", "Passing Props"),
            ],
        ),
        module(
            "react-state",
            "State and Events",
            &[
                ("use-state", "useState Basics"),
                ("events", "Handling Events"),
                ("lifting-state", "Lifting State Up"),
            ],
        ),
        module(
            "react-effects",
            "Effects and Data Fetching",
            &[
                ("use-effect", "useEffect and Dependencies"),
                ("fetching", "Fetching Data"),
                ("cleanup", "Cleanup and Race Conditions"),
            ],
        ),
        module(
            "react-patterns",
            "Component Patterns",
            &[
                ("composition", "Composition over Inheritance"),
                ("context", "Context API"),
                ("custom-hooks", "Writing Custom Hooks"),
            ],
        ),
        module(
            "react-project",
            "Building a Project",
            &[
                ("routing", "Client-side Routing"),
                ("forms", "Forms and Validation"),
                ("performance", "Memoization and Performance"),
            ],
        ),
    ]
}

fn generic_curriculum(skill: &str) -> Vec<Module> {
    vec![
        Module::new(
            "foundations",
            format!("{} Foundations", skill),
            vec![
                Lesson::new("overview", format!("What is {}?", skill)),
                Lesson::new("core-concepts", "Core Concepts"),
            ],
        ),
        Module::new(
            "applied",
            format!("Applied {}", skill),
            vec![
                Lesson::new("hands-on", "Hands-on Exercise"),
                Lesson::new("review", "Review and Next Steps"),
            ],
        ),
    ]
}
