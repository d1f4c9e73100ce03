//! Curriculum Progress Store
//!
//! Tracks a student's learning progress per company: which lessons are done
//! and which module quizzes were passed, grouped by skill. All progress for a
//! (student, company) pair lives in one JSON blob, read and rewritten whole on
//! every mutation. Two writers racing on the same pair resolve as
//! last-write-wins.
//!
//! The progress is advisory UI state, so every storage or parse failure is
//! logged and degrades to "no data" instead of propagating.

use crate::curriculum::{Module, Status, default_modules};
use crate::storage::KeyValueStorage;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress for one skill of one student at one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub skill: String,
    pub modules: Vec<Module>,
    pub updated_at: DateTime<Utc>,
}

/// All tracked skills for one (student, company) pair, keyed by skill name.
pub type TeacherProgress = BTreeMap<String, SkillProgress>;

/// The storage key holding the blob for a (student, company) pair.
pub fn progress_key(student_id: &str, company_id: &str) -> String {
    format!("teacherAgent.progress.{}.{}", student_id, company_id)
}

/// A learner id that cannot be mapped to its own storage key.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{field} must be non-empty and may not contain '.'")]
pub struct InvalidLearnerId {
    pub field: &'static str,
}

/// Checks that a (student, company) pair maps to a key no other pair shares.
///
/// Ids are joined with dots, so `a.b`/`c` and `a`/`b.c` would collide.
pub fn validate_learner_ids(student_id: &str, company_id: &str) -> Result<(), InvalidLearnerId> {
    for (field, value) in [("student_id", student_id), ("company_id", company_id)] {
        if value.trim().is_empty() || value.contains('.') {
            return Err(InvalidLearnerId { field });
        }
    }
    Ok(())
}

/// Percentage of completed modules across the required skills, rounded half up.
///
/// Only skills that are both required and initialized contribute. A module is
/// complete when its lessons are all done and its quiz is passed. Returns 0 when
/// nothing contributes.
pub fn compute_readiness<S: AsRef<str>>(progress: &TeacherProgress, required_skills: &[S]) -> u8 {
    let mut seen = HashSet::new();
    let (mut done, mut total) = (0u64, 0u64);

    for skill in required_skills {
        let skill = skill.as_ref();
        if !seen.insert(skill) {
            continue;
        }
        if let Some(entry) = progress.get(skill) {
            total += entry.modules.len() as u64;
            done += entry.modules.iter().filter(|m| m.is_complete()).count() as u64;
        }
    }

    if total == 0 {
        return 0;
    }
    ((200 * done + total) / (2 * total)) as u8
}

/// Reads and mutates progress blobs through an injected storage backend.
#[derive(Clone)]
pub struct ProgressStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl ProgressStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Loads the blob for a pair. Missing or unreadable data yields an empty map.
    pub fn get_progress(&self, student_id: &str, company_id: &str) -> TeacherProgress {
        if let Err(e) = validate_learner_ids(student_id, company_id) {
            warn!(error = %e, "Refusing to read progress for an ambiguous learner");
            return TeacherProgress::new();
        }
        let key = progress_key(student_id, company_id);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return TeacherProgress::new(),
            Err(e) => {
                warn!(%key, error = %e, "Failed to read progress; using empty progress");
                return TeacherProgress::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(%key, error = %e, "Stored progress is corrupt; using empty progress");
            TeacherProgress::new()
        })
    }

    /// Stamps every skill with the current time and overwrites the stored blob.
    pub fn save_progress(&self, student_id: &str, company_id: &str, data: &mut TeacherProgress) {
        if let Err(e) = validate_learner_ids(student_id, company_id) {
            warn!(error = %e, "Refusing to write progress for an ambiguous learner");
            return;
        }
        let now = Utc::now();
        for entry in data.values_mut() {
            entry.updated_at = now;
        }

        let key = progress_key(student_id, company_id);
        let serialized = match serde_json::to_string(data) {
            Ok(s) => s,
            Err(e) => {
                warn!(%key, error = %e, "Failed to serialize progress; skipping save");
                return;
            }
        };
        if let Err(e) = self.storage.set(&key, &serialized) {
            warn!(%key, error = %e, "Failed to persist progress");
        }
    }

    /// Returns the modules for a skill, creating them from the template on first use.
    ///
    /// Only the first call writes; later calls are pure reads.
    pub fn ensure_skill_initialized(
        &self,
        student_id: &str,
        company_id: &str,
        skill: &str,
    ) -> (TeacherProgress, Vec<Module>) {
        let mut progress = self.get_progress(student_id, company_id);
        if let Some(existing) = progress.get(skill) {
            let modules = existing.modules.clone();
            return (progress, modules);
        }

        let modules = default_modules(skill);
        info!(student_id, company_id, skill, modules = modules.len(), "Initializing skill curriculum");
        progress.insert(
            skill.to_string(),
            SkillProgress {
                skill: skill.to_string(),
                modules: modules.clone(),
                updated_at: Utc::now(),
            },
        );
        self.save_progress(student_id, company_id, &mut progress);
        (progress, modules)
    }

    /// Sets one lesson's status and recomputes its module's status.
    ///
    /// Returns the updated skill, or `None` without writing anything when the
    /// skill is uninitialized or the ids match no lesson.
    pub fn update_lesson(
        &self,
        student_id: &str,
        company_id: &str,
        skill: &str,
        module_id: &str,
        lesson_id: &str,
        status: Status,
    ) -> Option<SkillProgress> {
        let mut progress = self.get_progress(student_id, company_id);
        let entry = progress.get_mut(skill)?;

        let updated = entry
            .modules
            .iter_mut()
            .find(|m| m.id == module_id)
            .is_some_and(|m| m.set_lesson_status(lesson_id, status));
        if !updated {
            debug!(skill, module_id, lesson_id, "No matching lesson; update skipped");
            return None;
        }

        self.save_progress(student_id, company_id, &mut progress);
        progress.remove(skill)
    }

    /// Records a quiz submission on a module: overwrites `passed`, bumps `attempts`.
    ///
    /// Returns `None` without writing when the skill or module is unknown.
    pub fn mark_quiz(
        &self,
        student_id: &str,
        company_id: &str,
        skill: &str,
        module_id: &str,
        passed: bool,
    ) -> Option<SkillProgress> {
        let mut progress = self.get_progress(student_id, company_id);
        let entry = progress.get_mut(skill)?;

        let Some(module) = entry.modules.iter_mut().find(|m| m.id == module_id) else {
            debug!(skill, module_id, "No matching module; quiz submission skipped");
            return None;
        };
        module.quiz.record(passed);
        info!(skill, module_id, passed, attempts = module.quiz.attempts, "Quiz submission recorded");

        self.save_progress(student_id, company_id, &mut progress);
        progress.remove(skill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, MockKeyValueStorage, StorageError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts writes to an in-memory backend.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
    }

    impl KeyValueStorage for CountingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
    }

    fn memory_store() -> ProgressStore {
        ProgressStore::new(Arc::new(MemoryStorage::new()))
    }

    fn complete_skill(store: &ProgressStore, skill: &str) {
        let (_, modules) = store.ensure_skill_initialized("s1", "c1", skill);
        for m in &modules {
            for l in &m.lessons {
                store.update_lesson("s1", "c1", skill, &m.id, &l.id, Status::Done);
            }
            store.mark_quiz("s1", "c1", skill, &m.id, true);
        }
    }

    #[test]
    fn test_learner_ids_must_map_to_distinct_keys() {
        assert_eq!(validate_learner_ids("s1", "c1"), Ok(()));
        assert_eq!(
            validate_learner_ids("a.b", "c"),
            Err(InvalidLearnerId { field: "student_id" })
        );
        assert_eq!(
            validate_learner_ids("a", "b.c"),
            Err(InvalidLearnerId { field: "company_id" })
        );
        assert_eq!(
            validate_learner_ids("s1", " "),
            Err(InvalidLearnerId { field: "company_id" })
        );
    }

    #[test]
    fn test_store_ignores_colliding_learner_ids() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ProgressStore::new(storage.clone());

        store.ensure_skill_initialized("a.b", "c", "react");
        assert!(storage.get(&progress_key("a.b", "c")).unwrap().is_none());

        store.ensure_skill_initialized("a", "b", "react");
        assert!(store.get_progress("a", "b.c").is_empty());
        assert!(store.get_progress("a", "b").contains_key("react"));
    }

    #[test]
    fn test_progress_key_format() {
        assert_eq!(progress_key("stu", "acme"), "teacherAgent.progress.stu.acme");
    }

    #[test]
    fn test_get_progress_absent_is_empty() {
        assert!(memory_store().get_progress("s1", "c1").is_empty());
    }

    #[test]
    fn test_get_progress_corrupt_is_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(&progress_key("s1", "c1"), "{not json").unwrap();
        let store = ProgressStore::new(storage);
        assert!(store.get_progress("s1", "c1").is_empty());
    }

    #[test]
    fn test_storage_failures_degrade_to_no_data() {
        let mut storage = MockKeyValueStorage::new();
        storage
            .expect_get()
            .returning(|_| Err(StorageError::Unavailable("quota exceeded".to_string())));
        storage
            .expect_set()
            .returning(|_, _| Err(StorageError::Unavailable("quota exceeded".to_string())));
        let store = ProgressStore::new(Arc::new(storage));

        let (progress, modules) = store.ensure_skill_initialized("s1", "c1", "react");
        assert_eq!(modules.len(), 5);
        assert!(progress.contains_key("react"));
        assert!(store.get_progress("s1", "c1").is_empty());
        assert!(store.mark_quiz("s1", "c1", "react", "react-state", true).is_none());
    }

    #[test]
    fn test_ensure_skill_is_idempotent() {
        let storage = Arc::new(CountingStorage::default());
        let store = ProgressStore::new(storage.clone());

        let (_, first) = store.ensure_skill_initialized("s1", "c1", "react");
        let (_, second) = store.ensure_skill_initialized("s1", "c1", "react");

        assert_eq!(first, second);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ensure_skill_keeps_other_skills() {
        let store = memory_store();
        store.ensure_skill_initialized("s1", "c1", "react");
        let (progress, modules) = store.ensure_skill_initialized("s1", "c1", "sql");

        assert_eq!(modules.len(), 2);
        assert_eq!(progress.len(), 2);
        assert!(store.get_progress("s1", "c2").is_empty());
    }

    #[test]
    fn test_save_progress_stamps_updated_at() {
        let store = memory_store();
        let (mut progress, _) = store.ensure_skill_initialized("s1", "c1", "react");
        let before = progress["react"].updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        store.save_progress("s1", "c1", &mut progress);

        let stored = store.get_progress("s1", "c1");
        assert!(stored["react"].updated_at > before);
    }

    #[test]
    fn test_update_lesson_uninitialized_is_noop() {
        let storage = Arc::new(CountingStorage::default());
        let store = ProgressStore::new(storage.clone());

        let result = store.update_lesson("s1", "c1", "react", "react-state", "events", Status::Done);
        assert!(result.is_none());
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_update_lesson_maintains_module_status() {
        let store = memory_store();
        let (_, modules) = store.ensure_skill_initialized("s1", "c1", "react");
        let target = &modules[1];

        let steps = [
            (0, Status::InProgress, Status::InProgress),
            (0, Status::Done, Status::InProgress),
            (1, Status::Done, Status::InProgress),
            (2, Status::Done, Status::Done),
            (1, Status::NotStarted, Status::InProgress),
            (0, Status::NotStarted, Status::InProgress),
            (2, Status::NotStarted, Status::NotStarted),
        ];
        for (lesson_idx, status, expected) in steps {
            let lesson_id = &target.lessons[lesson_idx].id;
            let skill = store
                .update_lesson("s1", "c1", "react", &target.id, lesson_id, status)
                .expect("skill is initialized");
            let module = skill.modules.iter().find(|m| m.id == target.id).unwrap();
            assert_eq!(module.status, expected);
            assert_eq!(module.status, crate::curriculum::derive_module_status(&module.lessons));
        }

        let stored = store.get_progress("s1", "c1");
        assert_eq!(stored["react"].modules[1].status, Status::NotStarted);
    }

    #[test]
    fn test_update_lesson_unknown_ids() {
        let store = memory_store();
        store.ensure_skill_initialized("s1", "c1", "react");
        assert!(store.update_lesson("s1", "c1", "react", "nope", "jsx", Status::Done).is_none());
        assert!(store.update_lesson("s1", "c1", "react", "react-fundamentals", "nope", Status::Done).is_none());
    }

    #[test]
    fn test_mark_quiz_counts_attempts() {
        let store = memory_store();
        store.ensure_skill_initialized("s1", "c1", "react");

        let outcomes = [false, true, false, true, true];
        for (i, passed) in outcomes.iter().enumerate() {
            let skill = store
                .mark_quiz("s1", "c1", "react", "react-effects", *passed)
                .expect("module exists");
            let quiz = &skill.modules[2].quiz;
            assert_eq!(quiz.attempts as usize, i + 1);
            assert_eq!(quiz.passed, *passed);
        }
    }

    #[test]
    fn test_mark_quiz_uninitialized_is_noop() {
        let store = memory_store();
        assert!(store.mark_quiz("s1", "c1", "react", "react-effects", true).is_none());
        assert!(store.get_progress("s1", "c1").is_empty());
    }

    #[test]
    fn test_readiness_boundaries() {
        let empty = TeacherProgress::new();
        assert_eq!(compute_readiness(&empty, &["react"]), 0);

        let store = memory_store();
        complete_skill(&store, "react");
        let progress = store.get_progress("s1", "c1");
        let none: [&str; 0] = [];
        assert_eq!(compute_readiness(&progress, &none), 0);
        assert_eq!(compute_readiness(&progress, &["react"]), 100);
    }

    #[test]
    fn test_readiness_requires_quiz_pass() {
        let store = memory_store();
        let (_, modules) = store.ensure_skill_initialized("s1", "c1", "react");
        for l in &modules[0].lessons {
            store.update_lesson("s1", "c1", "react", &modules[0].id, &l.id, Status::Done);
        }
        let progress = store.get_progress("s1", "c1");
        assert_eq!(compute_readiness(&progress, &["react"]), 0);

        store.mark_quiz("s1", "c1", "react", &modules[0].id, true);
        let progress = store.get_progress("s1", "c1");
        assert_eq!(compute_readiness(&progress, &["react"]), 20);
    }

    #[test]
    fn test_readiness_ignores_uninitialized_and_duplicate_skills() {
        let store = memory_store();
        complete_skill(&store, "sql");
        store.ensure_skill_initialized("s1", "c1", "react");
        let progress = store.get_progress("s1", "c1");

        // 2 done of 7 total.
        assert_eq!(compute_readiness(&progress, &["sql", "react", "go"]), 29);
        assert_eq!(compute_readiness(&progress, &["sql", "sql", "go"]), 100);
    }

    #[test]
    fn test_stored_blob_uses_camel_case() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ProgressStore::new(storage.clone());
        store.ensure_skill_initialized("s1", "c1", "react");

        let raw = storage.get(&progress_key("s1", "c1")).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["react"]["updatedAt"].is_string());
        assert_eq!(value["react"]["modules"][0]["status"], "not_started");
        assert_eq!(value["react"]["modules"][0]["quiz"]["attempts"], 0);
    }
}
