// Run handoff - what an editing session gives to the execution engine

use crate::model::snapshot::ModelSystemSnapshot;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

/// Characters that can not appear in a run name; runs are stored in a
/// directory named after them
const INVALID_RUN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Whether `name` can be used as a run name
pub fn is_valid_run_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !name
            .chars()
            .any(|c| c.is_control() || INVALID_RUN_NAME_CHARS.contains(&c))
}

/// A request to execute one model system of a project.
///
/// The project is a copy taken when the run was requested, with the live
/// (possibly unsaved) document in place of the stored model system.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub run_id: Uuid,
    pub run_name: String,
    pub project_name: String,
    pub model_system_index: usize,
    pub model_systems: Vec<ModelSystemSnapshot>,
    pub requested_at: DateTime<Utc>,
}

impl RunRequest {
    pub fn new(
        run_name: impl Into<String>,
        project_name: impl Into<String>,
        model_system_index: usize,
        model_systems: Vec<ModelSystemSnapshot>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_name: run_name.into(),
            project_name: project_name.into(),
            model_system_index,
            model_systems,
            requested_at: Utc::now(),
        }
    }

    /// The model system being run
    pub fn model_system(&self) -> Option<&ModelSystemSnapshot> {
        self.model_systems.get(self.model_system_index)
    }
}

/// Execution engine entry point. Runs are handed off and never awaited.
pub trait RunController: Send + Sync {
    fn execute_run(&self, request: RunRequest);
}

/// Run controller that only records what it was given
#[derive(Debug, Default)]
pub struct QueuedRuns {
    queue: Mutex<Vec<RunRequest>>,
}

impl QueuedRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every request received so far
    pub fn drain(&self) -> Vec<RunRequest> {
        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *queue)
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RunController for QueuedRuns {
    fn execute_run(&self, request: RunRequest) {
        log::info!(
            "queued run '{}' ({}) of {}",
            request.run_name,
            request.run_id,
            request.project_name
        );
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }
}
