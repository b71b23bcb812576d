// In-memory project

use crate::model::snapshot::ModelSystemSnapshot;
use crate::project::provider::{ProjectError, StructureProvider};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    model_systems: Vec<ModelSystemSnapshot>,
    last_saved: Option<DateTime<Utc>>,
    save_count: usize,
}

/// A project kept entirely in memory.
///
/// Useful as the storage behind tests and tools that build model systems on
/// the fly.
#[derive(Debug, Default)]
pub struct MemoryProject {
    name: String,
    inner: Mutex<Inner>,
}

impl MemoryProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Start with the given model systems
    pub fn with_model_systems(name: impl Into<String>, model_systems: Vec<ModelSystemSnapshot>) -> Self {
        let project = Self::new(name);
        project.lock().model_systems = model_systems;
        project
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// When a model system was last saved into this project
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.lock().last_saved
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }
}

impl StructureProvider for MemoryProject {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn model_system_count(&self) -> usize {
        self.lock().model_systems.len()
    }

    fn clone_model_system(&self, index: usize) -> Result<ModelSystemSnapshot, ProjectError> {
        self.lock()
            .model_systems
            .get(index)
            .cloned()
            .ok_or(ProjectError::InvalidIndex(index))
    }

    fn save_model_system(
        &self,
        index: usize,
        snapshot: ModelSystemSnapshot,
    ) -> Result<(), ProjectError> {
        let mut inner = self.lock();
        let slot = inner
            .model_systems
            .get_mut(index)
            .ok_or(ProjectError::InvalidIndex(index))?;
        *slot = snapshot;
        inner.last_saved = Some(Utc::now());
        inner.save_count += 1;
        Ok(())
    }

    fn add_model_system(&self, snapshot: ModelSystemSnapshot) -> Result<usize, ProjectError> {
        let mut inner = self.lock();
        inner.model_systems.push(snapshot);
        Ok(inner.model_systems.len() - 1)
    }

    fn remove_model_system(&self, index: usize) -> Result<ModelSystemSnapshot, ProjectError> {
        let mut inner = self.lock();
        if index >= inner.model_systems.len() {
            return Err(ProjectError::InvalidIndex(index));
        }
        Ok(inner.model_systems.remove(index))
    }

    fn move_model_system(&self, from: usize, to: usize) -> Result<(), ProjectError> {
        let mut inner = self.lock();
        let count = inner.model_systems.len();
        if from >= count {
            return Err(ProjectError::MoveSourceOutOfRange);
        }
        if to >= count {
            return Err(ProjectError::MoveDestinationOutOfRange);
        }
        let moved = inner.model_systems.remove(from);
        inner.model_systems.insert(to, moved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> MemoryProject {
        MemoryProject::with_model_systems(
            "Test",
            vec![
                ModelSystemSnapshot::empty("A"),
                ModelSystemSnapshot::empty("B"),
                ModelSystemSnapshot::empty("C"),
            ],
        )
    }

    fn names(project: &MemoryProject) -> Vec<String> {
        project
            .clone_all()
            .unwrap()
            .into_iter()
            .map(|ms| ms.name)
            .collect()
    }

    #[test]
    fn test_move_model_system() {
        let project = project();
        project.move_model_system(0, 2).unwrap();
        assert_eq!(names(&project), vec!["B", "C", "A"]);
        project.move_model_system(2, 0).unwrap();
        assert_eq!(names(&project), vec!["A", "B", "C"]);
        assert_eq!(
            project.move_model_system(3, 0),
            Err(ProjectError::MoveSourceOutOfRange)
        );
        assert_eq!(
            project.move_model_system(0, 3),
            Err(ProjectError::MoveDestinationOutOfRange)
        );
    }

    #[test]
    fn test_save_records_time() {
        let project = project();
        assert!(project.last_saved().is_none());
        let mut snapshot = project.clone_model_system(1).unwrap();
        snapshot.description = "saved".to_string();
        project.save_model_system(1, snapshot).unwrap();
        assert!(project.last_saved().is_some());
        assert_eq!(project.save_count(), 1);
        assert_eq!(project.clone_model_system(1).unwrap().description, "saved");
        assert!(project.save_model_system(7, ModelSystemSnapshot::empty("X")).is_err());
    }

    #[test]
    fn test_add_and_remove() {
        let project = project();
        assert_eq!(project.add_model_system(ModelSystemSnapshot::empty("D")).unwrap(), 3);
        assert_eq!(project.remove_model_system(0).unwrap().name, "A");
        assert_eq!(names(&project), vec!["B", "C", "D"]);
        assert_eq!(project.remove_model_system(5), Err(ProjectError::InvalidIndex(5)));
    }
}
