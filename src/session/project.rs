// Project editing session - shared, reference counted model system sessions

use crate::config::EditingConfig;
use crate::model::module_type::ModuleRegistry;
use crate::model::snapshot::ModelSystemSnapshot;
use crate::project::provider::{ProjectError, StructureProvider};
use crate::project::run::RunController;
use crate::session::SessionError;
use crate::session::model_system::ModelSystemEditingSession;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

/// At most one live session per model system, plus how many handles
/// reference it
#[derive(Default)]
struct SessionSlot {
    session: Option<Arc<ModelSystemEditingSession>>,
    references: usize,
}

struct ProjectState {
    provider: Arc<dyn StructureProvider>,
    slots: Vec<SessionSlot>,
}

struct ProjectShared {
    state: Mutex<ProjectState>,
    registry: Arc<dyn ModuleRegistry>,
    config: EditingConfig,
    runner: Option<Arc<dyn RunController>>,
}

impl ProjectShared {
    fn lock(&self) -> MutexGuard<'_, ProjectState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn acquire(&self, session: &Arc<ModelSystemEditingSession>) {
        let mut state = self.lock();
        if let Some(slot) = find_slot(&mut state.slots, session) {
            slot.references += 1;
        }
    }

    /// Drop one reference; the last one tears the session down
    fn release(&self, session: &Arc<ModelSystemEditingSession>) {
        let mut state = self.lock();
        let Some(slot) = find_slot(&mut state.slots, session) else {
            return;
        };
        slot.references = slot.references.saturating_sub(1);
        if slot.references == 0
            && let Some(closed) = slot.session.take()
        {
            closed.terminate();
        }
    }

    fn references(&self, session: &Arc<ModelSystemEditingSession>) -> usize {
        let mut state = self.lock();
        find_slot(&mut state.slots, session).map_or(0, |slot| slot.references)
    }
}

fn find_slot<'a>(
    slots: &'a mut [SessionSlot],
    session: &Arc<ModelSystemEditingSession>,
) -> Option<&'a mut SessionSlot> {
    slots.iter_mut().find(|slot| {
        slot.session
            .as_ref()
            .is_some_and(|live| Arc::ptr_eq(live, session))
    })
}

/// Reindex live sessions after the slot list changed shape
fn reindex(slots: &[SessionSlot]) {
    for (index, slot) in slots.iter().enumerate() {
        if let Some(session) = &slot.session {
            session.set_model_system_index(index);
        }
    }
}

/// Edits one project's list of model systems and hands out shared editing
/// sessions for them.
///
/// Every view asking for the same model system gets the same session; the
/// session lives until the last [`SessionHandle`] is dropped or closed.
pub struct ProjectEditingSession {
    shared: Arc<ProjectShared>,
}

impl ProjectEditingSession {
    pub fn new(
        provider: Arc<dyn StructureProvider>,
        registry: Arc<dyn ModuleRegistry>,
        config: EditingConfig,
        runner: Option<Arc<dyn RunController>>,
    ) -> Self {
        let slots = (0..provider.model_system_count())
            .map(|_| SessionSlot::default())
            .collect();
        Self {
            shared: Arc::new(ProjectShared {
                state: Mutex::new(ProjectState { provider, slots }),
                registry,
                config,
                runner,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.shared.lock().provider.name()
    }

    pub fn model_system_count(&self) -> usize {
        self.shared.lock().slots.len()
    }

    /// Open, or join, the editing session of a model system
    pub fn edit_model_system(&self, index: usize) -> Result<SessionHandle, SessionError> {
        let mut state = self.shared.lock();
        let provider = Arc::clone(&state.provider);
        let slot = state
            .slots
            .get_mut(index)
            .ok_or(SessionError::InvalidIndex(index))?;

        let session = match &slot.session {
            Some(session) => Arc::clone(session),
            None => {
                let session = Arc::new(
                    ModelSystemEditingSession::open(
                        provider,
                        index,
                        Arc::clone(&self.shared.registry),
                        &self.shared.config,
                    )?
                    .with_runner(self.shared.runner.clone()),
                );
                slot.session = Some(Arc::clone(&session));
                session
            }
        };
        slot.references += 1;
        log::debug!(
            "model system {} now has {} editing reference(s)",
            index,
            slot.references
        );

        Ok(SessionHandle {
            session,
            project: Arc::clone(&self.shared),
        })
    }

    /// Whether a model system has a live editing session
    pub fn is_editing(&self, index: usize) -> bool {
        self.reference_count(index) > 0
    }

    pub fn reference_count(&self, index: usize) -> usize {
        self.shared
            .lock()
            .slots
            .get(index)
            .map_or(0, |slot| slot.references)
    }

    /// Append a model system to the project, returning its index
    pub fn add_model_system(&self, snapshot: ModelSystemSnapshot) -> Result<usize, SessionError> {
        let mut state = self.shared.lock();
        let index = state.provider.add_model_system(snapshot)?;
        while state.slots.len() <= index {
            state.slots.push(SessionSlot::default());
        }
        Ok(index)
    }

    /// Remove a model system that nobody is editing
    pub fn remove_model_system(&self, index: usize) -> Result<ModelSystemSnapshot, SessionError> {
        let mut state = self.shared.lock();
        let slot = state
            .slots
            .get(index)
            .ok_or(SessionError::InvalidIndex(index))?;
        if slot.session.is_some() {
            return Err(SessionError::SessionInUse);
        }
        let removed = state.provider.remove_model_system(index)?;
        state.slots.remove(index);
        reindex(&state.slots);
        Ok(removed)
    }

    /// Move a model system; sessions keep following their model system
    pub fn move_model_system(&self, from: usize, to: usize) -> Result<(), SessionError> {
        let mut state = self.shared.lock();
        let count = state.slots.len();
        if from >= count {
            return Err(ProjectError::MoveSourceOutOfRange.into());
        }
        if to >= count {
            return Err(ProjectError::MoveDestinationOutOfRange.into());
        }
        if from == to {
            return Ok(());
        }
        state.provider.move_model_system(from, to)?;
        let moved = state.slots.remove(from);
        state.slots.insert(to, moved);
        reindex(&state.slots);
        Ok(())
    }

    /// The project was saved by someone else: swap in the new provider and
    /// rebuild every live session from it.
    ///
    /// All live sessions are reloaded even if one fails; the first failure is
    /// returned.
    pub fn project_was_externally_saved(
        &self,
        provider: Arc<dyn StructureProvider>,
    ) -> Result<(), SessionError> {
        let mut state = self.shared.lock();
        state.provider = Arc::clone(&provider);
        while state.slots.len() < provider.model_system_count() {
            state.slots.push(SessionSlot::default());
        }

        let mut first_error = None;
        for session in state.slots.iter().filter_map(|slot| slot.session.as_ref()) {
            if let Err(e) = session.reload_from(Arc::clone(&provider)) {
                log::warn!(
                    "unable to reload model system {}: {}",
                    session.model_system_index(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }
        log::info!("project '{}' was saved externally", provider.name());
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for ProjectEditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        let references: Vec<usize> = state.slots.iter().map(|slot| slot.references).collect();
        f.debug_struct("ProjectEditingSession")
            .field("name", &state.provider.name())
            .field("references", &references)
            .finish()
    }
}

/// One reference to a shared model system editing session.
///
/// Cloning adds a reference; dropping releases it. The session is torn down
/// when the last handle goes away.
pub struct SessionHandle {
    session: Arc<ModelSystemEditingSession>,
    project: Arc<ProjectShared>,
}

impl SessionHandle {
    /// True when this is the last reference to the session
    pub fn will_close_terminate(&self) -> bool {
        self.project.references(&self.session) <= 1
    }

    /// Number of handles sharing this session
    pub fn reference_count(&self) -> usize {
        self.project.references(&self.session)
    }

    /// Release this reference.
    ///
    /// # Errors
    /// Hands the handle back when the document has unsaved changes.
    pub fn close(self) -> Result<(), (Self, SessionError)> {
        if self.session.is_dirty() {
            return Err((self, SessionError::UnsavedChanges));
        }
        drop(self);
        Ok(())
    }

    /// Both handles refer to the same live session
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }
}

impl Deref for SessionHandle {
    type Target = ModelSystemEditingSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl Clone for SessionHandle {
    fn clone(&self) -> Self {
        self.project.acquire(&self.session);
        Self {
            session: Arc::clone(&self.session),
            project: Arc::clone(&self.project),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.project.release(&self.session);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::module_type::TypeCatalog;
    use crate::project::memory::MemoryProject;

    fn project() -> ProjectEditingSession {
        let provider = MemoryProject::with_model_systems(
            "Project",
            vec![
                ModelSystemSnapshot::empty("A"),
                ModelSystemSnapshot::empty("B"),
            ],
        );
        ProjectEditingSession::new(
            Arc::new(provider),
            Arc::new(TypeCatalog::new()),
            EditingConfig::default(),
            None,
        )
    }

    #[test]
    fn test_handles_share_one_session() {
        let project = project();
        let first = project.edit_model_system(0).unwrap();
        let second = project.edit_model_system(0).unwrap();
        assert!(first.same_session(&second));
        assert_eq!(project.reference_count(0), 2);
        assert!(!first.will_close_terminate());

        let third = second.clone();
        assert_eq!(third.reference_count(), 3);
        drop(second);
        drop(third);
        assert!(first.will_close_terminate());
        drop(first);
        assert!(!project.is_editing(0));
    }

    #[test]
    fn test_invalid_index() {
        let project = project();
        assert_eq!(
            project.edit_model_system(2).unwrap_err(),
            SessionError::InvalidIndex(2)
        );
        assert_eq!(
            project.remove_model_system(9).unwrap_err(),
            SessionError::InvalidIndex(9)
        );
    }

    #[test]
    fn test_move_keeps_session_index() {
        let project = project();
        let handle = project.edit_model_system(0).unwrap();
        project.move_model_system(0, 1).unwrap();
        assert_eq!(handle.model_system_index(), 1);
        assert_eq!(handle.name(), "A");
        assert_eq!(project.reference_count(1), 1);
    }
}
