// Model system editing session - the single entry point for document edits

use crate::command::commands::{
    AddCollectionMemberCommand, MoveCollectionMemberCommand, NodeProperty,
    RemoveAllCollectionMembersCommand, RemoveCollectionMemberCommand,
    SetModelSystemDescriptionCommand, SetNodePropertyCommand, SetParameterValueCommand,
    SetQuickParameterCommand, SetTypeCommand,
};
use crate::command::linked::{
    AddParameterToLinkedCommand, NewLinkedParameterCommand, RemoveLinkedParameterCommand,
    RemoveParameterFromLinkedCommand, SetLinkedParameterNameCommand,
    SetLinkedParameterValueCommand,
};
use crate::command::manager::{BoxedCommand, CombinedScope, CommandManager};
use crate::command::paste::{PasteCommand, copy_modules, decode_copy_buffer};
use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::config::EditingConfig;
use crate::messaging::channels::{NotificationConsumer, Notifier, create_notification_channel};
use crate::messaging::notification::NotificationKind;
use crate::model::document::ModelSystemModel;
use crate::model::ids::{LinkedParameterId, NodeId, ParameterId};
use crate::model::module_type::{ModuleRegistry, ModuleType};
use crate::project::provider::StructureProvider;
use crate::project::run::{RunController, RunRequest, is_valid_run_name};
use crate::session::SessionError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Everything guarded by the session lock
struct SessionState {
    model: ModelSystemModel,
    manager: CommandManager,
    provider: Arc<dyn StructureProvider>,
    registry: Arc<dyn ModuleRegistry>,
}

/// Owns one live model system document and its undo/redo history.
///
/// Command execution, undo, redo, save and reload are serialized by one lock;
/// the session can be shared between threads. A save additionally holds a
/// save gate so that a second saver can detect the contention with
/// [`try_save`](Self::try_save).
///
/// Operations that only make sense on a certain shape of node (collection
/// edits on a collection) panic when called on the wrong shape; that is a
/// caller bug, not a recoverable condition. Everything else reports through
/// [`CommandResult`].
pub struct ModelSystemEditingSession {
    state: Mutex<SessionState>,
    save_gate: Mutex<()>,
    index: AtomicUsize,
    runner: Option<Arc<dyn RunController>>,
    notifications: Mutex<Option<NotificationConsumer>>,
}

impl ModelSystemEditingSession {
    /// Open the model system at `index` of `provider` for editing.
    ///
    /// A session opened this way can not be run; project sessions attach a
    /// run controller.
    pub fn open(
        provider: Arc<dyn StructureProvider>,
        index: usize,
        registry: Arc<dyn ModuleRegistry>,
        config: &EditingConfig,
    ) -> Result<Self, SessionError> {
        let snapshot = provider.clone_model_system(index)?;
        let mut model = ModelSystemModel::from_snapshot(&snapshot, Arc::clone(&registry))?;
        let (producer, consumer) = create_notification_channel(config.notification_capacity);
        model.set_notifier(Notifier::new(producer));
        log::info!(
            "opened model system '{}' ({} of {})",
            model.name(),
            index,
            provider.name()
        );

        Ok(Self {
            state: Mutex::new(SessionState {
                model,
                manager: CommandManager::with_capacity(config.history_capacity),
                provider,
                registry,
            }),
            save_gate: Mutex::new(()),
            index: AtomicUsize::new(index),
            runner: None,
            notifications: Mutex::new(Some(consumer)),
        })
    }

    pub(crate) fn with_runner(mut self, runner: Option<Arc<dyn RunController>>) -> Self {
        self.runner = runner;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the document under the session lock
    pub fn read<R>(&self, f: impl FnOnce(&ModelSystemModel) -> R) -> R {
        f(&self.lock().model)
    }

    /// Take the GUI notification stream. Only the first caller gets it.
    pub fn take_notifications(&self) -> Option<NotificationConsumer> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Position of the model system inside its project
    pub fn model_system_index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    pub(crate) fn set_model_system_index(&self, index: usize) {
        self.index.store(index, Ordering::Release);
    }

    pub fn name(&self) -> String {
        self.read(|model| model.name().to_string())
    }

    pub fn can_run(&self) -> bool {
        self.runner.is_some()
    }

    // ---- command path ----

    /// Execute a command and record it in the history
    pub fn run_command(&self, command: impl UndoableCommand + 'static) -> CommandResult<()> {
        self.run_boxed(Box::new(command))
    }

    pub fn run_boxed(&self, command: BoxedCommand) -> CommandResult<()> {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        manager.execute(command, model)
    }

    /// Run several commands as a single undo step named `name`.
    ///
    /// The session lock is held for the whole body; the body must issue its
    /// commands through the scope and must not call back into the session.
    pub fn execute_combined_commands<F, R>(&self, name: impl Into<String>, body: F) -> R
    where
        F: FnOnce(&mut CombinedScope<'_>) -> R,
    {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        manager.execute_combined(name, model, body)
    }

    /// Undo the last command, returning its description
    pub fn undo(&self) -> CommandResult<String> {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        manager.undo(model)
    }

    /// Redo the last undone command, returning its description
    pub fn redo(&self) -> CommandResult<String> {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        manager.redo(model)
    }

    pub fn can_undo(&self) -> bool {
        self.lock().manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().manager.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.lock().manager.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.lock().manager.redo_description()
    }

    /// Names on the undo stack, most recent first
    pub fn undo_history(&self) -> Vec<String> {
        self.lock().manager.undo_descriptions()
    }

    /// True when a command ran, or was undone or redone, since the last save
    pub fn has_changed(&self) -> bool {
        self.lock().manager.has_changed()
    }

    /// True when the document differs from what was last saved or loaded
    pub fn is_dirty(&self) -> bool {
        self.read(|model| model.is_dirty())
    }

    // ---- structure edits ----

    fn assert_shape(&self, node: NodeId, collection: bool, operation: &str) {
        let is_collection = self.read(|model| model.node(node).map(|n| n.is_collection()));
        if is_collection.is_some_and(|c| c != collection) {
            if collection {
                panic!("{} can only be used on a collection, {} is not one", operation, node);
            }
            panic!("{} can not be used on the collection {}", operation, node);
        }
    }

    /// Assign a module type to a node, or clear it with `None`
    ///
    /// # Panics
    /// If `node` is a collection.
    pub fn set_module_type(
        &self,
        node: NodeId,
        module_type: Option<Arc<ModuleType>>,
    ) -> CommandResult<()> {
        self.assert_shape(node, false, "set_module_type");
        self.run_command(SetTypeCommand::new(node, module_type))
    }

    /// Append a member to a collection, returning the new node
    ///
    /// # Panics
    /// If `collection` is not a collection.
    pub fn add_collection_member(
        &self,
        collection: NodeId,
        module_type: Arc<ModuleType>,
        name: Option<String>,
    ) -> CommandResult<NodeId> {
        self.assert_shape(collection, true, "add_collection_member");
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        manager.execute(
            Box::new(AddCollectionMemberCommand::new(collection, module_type, name)),
            model,
        )?;
        model
            .node(collection)
            .and_then(|node| node.children().last())
            .map(|member| member.id())
            .ok_or(CommandError::NodeNotFound(collection))
    }

    /// # Panics
    /// If `collection` is not a collection.
    pub fn remove_collection_member(&self, collection: NodeId, index: usize) -> CommandResult<()> {
        self.assert_shape(collection, true, "remove_collection_member");
        self.run_command(RemoveCollectionMemberCommand::new(collection, index))
    }

    /// # Panics
    /// If `collection` is not a collection.
    pub fn remove_all_collection_members(&self, collection: NodeId) -> CommandResult<()> {
        self.assert_shape(collection, true, "remove_all_collection_members");
        self.run_command(RemoveAllCollectionMembersCommand::new(collection))
    }

    /// # Panics
    /// If `collection` is not a collection.
    pub fn move_collection_member(
        &self,
        collection: NodeId,
        from: usize,
        to: usize,
    ) -> CommandResult<()> {
        self.assert_shape(collection, true, "move_collection_member");
        self.run_command(MoveCollectionMemberCommand::new(
            collection,
            from as isize,
            to as isize,
        ))
    }

    /// Move a collection member by `delta` positions
    pub fn move_module_in_parent(&self, node: NodeId, delta: isize) -> CommandResult<()> {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        let (parent, index) = model
            .root()
            .locate(node)
            .ok_or(CommandError::NodeNotFound(node))?;
        if !model.node(parent).is_some_and(|p| p.is_collection()) {
            return Err(CommandError::Validation(
                "You can only move the children of a collection!".to_string(),
            ));
        }
        let from = index as isize;
        manager.execute(
            Box::new(MoveCollectionMemberCommand::new(parent, from, from + delta)),
            model,
        )
    }

    /// Remove a node.
    ///
    /// A collection loses all its members, a collection member is taken out
    /// of its collection and any other node has its type cleared.
    pub fn remove(&self, node: NodeId) -> CommandResult<()> {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        let target = model.node(node).ok_or(CommandError::NodeNotFound(node))?;
        let command: BoxedCommand = if target.is_collection() {
            Box::new(RemoveAllCollectionMembersCommand::new(node))
        } else {
            match model.root().locate(node) {
                Some((parent, index)) if model.node(parent).is_some_and(|p| p.is_collection()) => {
                    Box::new(RemoveCollectionMemberCommand::new(parent, index))
                }
                _ => Box::new(SetTypeCommand::new(node, None)),
            }
        };
        manager.execute(command, model)
    }

    pub fn set_name(&self, node: NodeId, name: impl Into<String>) -> CommandResult<()> {
        self.run_command(SetNodePropertyCommand::new(node, NodeProperty::Name(name.into())))
    }

    pub fn set_description(&self, node: NodeId, description: impl Into<String>) -> CommandResult<()> {
        self.run_command(SetNodePropertyCommand::new(
            node,
            NodeProperty::Description(description.into()),
        ))
    }

    pub fn set_disabled(&self, node: NodeId, disabled: bool) -> CommandResult<()> {
        self.run_command(SetNodePropertyCommand::new(node, NodeProperty::Disabled(disabled)))
    }

    pub fn set_meta_module(&self, node: NodeId, meta_module: bool) -> CommandResult<()> {
        self.run_command(SetNodePropertyCommand::new(
            node,
            NodeProperty::MetaModule(meta_module),
        ))
    }

    pub fn set_model_system_description(&self, description: impl Into<String>) -> CommandResult<()> {
        self.run_command(SetModelSystemDescriptionCommand::new(description))
    }

    /// Parent of `node`; `None` for the root
    pub fn get_parent(&self, node: NodeId) -> Option<NodeId> {
        self.read(|model| model.parent(node).map(|parent| parent.id()))
    }

    /// Types that can be assigned to `node`, or added to it when it is a
    /// collection
    pub fn get_valid_modules(&self, node: NodeId) -> Vec<Arc<ModuleType>> {
        self.read(|model| model.valid_modules(node))
    }

    /// Look up a type in the session's registry
    pub fn resolve_type(&self, type_name: &str) -> Option<Arc<ModuleType>> {
        self.lock().registry.resolve(type_name)
    }

    // ---- parameters ----

    pub fn set_parameter_value(&self, parameter: ParameterId, value: impl Into<String>) -> CommandResult<()> {
        self.run_command(SetParameterValueCommand::new(parameter, value))
    }

    pub fn reset_parameter(&self, parameter: ParameterId) -> CommandResult<()> {
        self.run_command(SetParameterValueCommand::to_default(parameter))
    }

    pub fn set_quick_parameter(&self, parameter: ParameterId, quick: bool) -> CommandResult<()> {
        self.run_command(SetQuickParameterCommand::new(parameter, quick))
    }

    // ---- linked parameters ----

    /// Create a linked parameter, returning its id
    pub fn create_linked_parameter(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> CommandResult<LinkedParameterId> {
        let mut state = self.lock();
        let SessionState { model, manager, .. } = &mut *state;
        manager.execute(Box::new(NewLinkedParameterCommand::new(name, value)), model)?;
        model
            .linked_parameters()
            .iter()
            .last()
            .map(|linked| linked.id())
            .ok_or_else(|| CommandError::ExecutionFailed("The linked parameter was not created".into()))
    }

    pub fn remove_linked_parameter(&self, linked: LinkedParameterId) -> CommandResult<()> {
        self.run_command(RemoveLinkedParameterCommand::new(linked))
    }

    /// Add a parameter to a linked parameter, moving it out of any other one
    pub fn add_parameter_to_linked(
        &self,
        linked: LinkedParameterId,
        parameter: ParameterId,
    ) -> CommandResult<()> {
        self.run_command(AddParameterToLinkedCommand::new(linked, parameter))
    }

    pub fn remove_parameter_from_linked(
        &self,
        linked: LinkedParameterId,
        parameter: ParameterId,
    ) -> CommandResult<()> {
        self.run_command(RemoveParameterFromLinkedCommand::new(linked, parameter))
    }

    pub fn set_linked_parameter_value(
        &self,
        linked: LinkedParameterId,
        value: impl Into<String>,
    ) -> CommandResult<()> {
        self.run_command(SetLinkedParameterValueCommand::new(linked, value))
    }

    pub fn set_linked_parameter_name(
        &self,
        linked: LinkedParameterId,
        name: impl Into<String>,
    ) -> CommandResult<()> {
        self.run_command(SetLinkedParameterNameCommand::new(linked, name))
    }

    // ---- copy and paste ----

    /// Copy one module into the text form of a copy buffer
    pub fn copy_module(&self, node: NodeId) -> CommandResult<String> {
        self.copy_modules(&[node])
    }

    pub fn copy_modules(&self, nodes: &[NodeId]) -> CommandResult<String> {
        let buffer = self.read(|model| copy_modules(model, nodes))?;
        buffer
            .to_text()
            .map_err(|e| CommandError::ExecutionFailed(e.to_string()))
    }

    /// Paste a copy buffer at `target`.
    ///
    /// A buffer holding several modules is pasted as one combined command.
    pub fn paste(&self, target: NodeId, buffer: &str) -> CommandResult<()> {
        let buffer = decode_copy_buffer(buffer)?;
        let mut modules = buffer.modules;
        match modules.len() {
            0 => Err(CommandError::Validation(
                "There was nothing to paste.".to_string(),
            )),
            1 => {
                let module = modules.remove(0);
                self.run_command(PasteCommand::new(target, module))
            }
            _ => self.execute_combined_commands("Pasting Modules", |scope| {
                modules
                    .into_iter()
                    .try_for_each(|module| scope.run(PasteCommand::new(target, module)))
            }),
        }
    }

    // ---- lifecycle ----

    /// Save the document back to its provider, waiting for any save in
    /// progress
    pub fn save(&self) -> Result<(), SessionError> {
        let _gate = self
            .save_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.save_locked()
    }

    /// Save unless another save is already running
    pub fn try_save(&self) -> Result<(), SessionError> {
        let _gate = match self.save_gate.try_lock() {
            Ok(gate) => gate,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(SessionError::SaveInProgress),
        };
        self.save_locked()
    }

    /// True while a save holds the save gate
    pub fn is_saving(&self) -> bool {
        matches!(self.save_gate.try_lock(), Err(TryLockError::WouldBlock))
    }

    fn save_locked(&self) -> Result<(), SessionError> {
        let mut state = self.lock();
        let index = self.model_system_index();
        let snapshot = state.model.to_snapshot();
        state.provider.save_model_system(index, snapshot)?;
        state.model.clear_dirty();
        state.manager.mark_saved();
        state.model.notify(NotificationKind::Saved);
        log::info!("saved model system '{}' at {}", state.model.name(), index);
        Ok(())
    }

    /// Rebuild the document from the provider, discarding unsaved edits and
    /// both histories
    pub fn reload(&self) -> Result<(), SessionError> {
        let mut state = self.lock();
        self.rebuild(&mut state)
    }

    pub(crate) fn reload_from(&self, provider: Arc<dyn StructureProvider>) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.provider = provider;
        self.rebuild(&mut state)
    }

    fn rebuild(&self, state: &mut SessionState) -> Result<(), SessionError> {
        let index = self.model_system_index();
        let snapshot = state.provider.clone_model_system(index)?;
        let mut model = ModelSystemModel::from_snapshot(&snapshot, Arc::clone(&state.registry))?;
        model.set_notifier(state.model.take_notifier());
        state.model = model;
        state.manager.clear();
        state.manager.mark_saved();
        state.model.notify(NotificationKind::Reloaded);
        log::info!("reloaded model system '{}' at {}", state.model.name(), index);
        Ok(())
    }

    /// Hand the model system to the run controller.
    ///
    /// The request carries a copy of every model system in the project with
    /// the live document, saved or not, in place of this one.
    pub fn run(&self, run_name: &str) -> Result<RunRequest, SessionError> {
        let runner = self.runner.as_ref().ok_or(SessionError::CannotRun)?;
        if !is_valid_run_name(run_name) {
            return Err(SessionError::InvalidRunName(run_name.to_string()));
        }
        let request = {
            let state = self.lock();
            let index = self.model_system_index();
            let mut model_systems = state.provider.clone_all()?;
            if let Some(slot) = model_systems.get_mut(index) {
                *slot = state.model.to_snapshot();
            }
            RunRequest::new(run_name, state.provider.name(), index, model_systems)
        };
        runner.execute_run(request.clone());
        Ok(request)
    }

    /// Close a session that is not shared through a project.
    ///
    /// # Errors
    /// Hands the session back when the document has unsaved changes.
    pub fn close(self) -> Result<(), (Self, SessionError)> {
        if self.is_dirty() {
            return Err((self, SessionError::UnsavedChanges));
        }
        self.terminate();
        Ok(())
    }

    pub(crate) fn terminate(&self) {
        let mut state = self.lock();
        state.model.notify(NotificationKind::SessionClosed);
        log::info!("closed model system session '{}'", state.model.name());
    }
}

impl std::fmt::Debug for ModelSystemEditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSystemEditingSession")
            .field("index", &self.model_system_index())
            .field("can_run", &self.can_run())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::module_type::{MODEL_SYSTEM_TEMPLATE, ParameterSpec, SlotSpec, TypeCatalog};
    use crate::model::parameter::ParameterKind;
    use crate::model::snapshot::ModelSystemSnapshot;
    use crate::project::memory::MemoryProject;
    use ringbuf::traits::Consumer;

    fn open() -> (Arc<MemoryProject>, ModelSystemEditingSession) {
        let mut catalog = TypeCatalog::new();
        catalog.register(
            ModuleType::new("Template")
                .implementing(MODEL_SYSTEM_TEMPLATE)
                .with_parameter(ParameterSpec::new("Iterations", ParameterKind::Integer, "1"))
                .with_slot(SlotSpec::collection("Modes", "IMode")),
        );
        catalog.register(ModuleType::new("Mode").implementing("IMode"));
        let project = Arc::new(MemoryProject::with_model_systems(
            "Project",
            vec![ModelSystemSnapshot::empty("MS")],
        ));
        let session = ModelSystemEditingSession::open(
            project.clone(),
            0,
            Arc::new(catalog),
            &EditingConfig::default(),
        )
        .unwrap();
        (project, session)
    }

    fn root(session: &ModelSystemEditingSession) -> NodeId {
        session.read(|model| model.root().id())
    }

    #[test]
    fn test_save_clears_flags() {
        let (project, session) = open();
        let template = session.resolve_type("Template");
        session.set_module_type(root(&session), template).unwrap();
        assert!(session.has_changed());
        assert!(session.is_dirty());

        session.save().unwrap();
        assert!(!session.has_changed());
        assert!(!session.is_dirty());
        assert_eq!(
            project.clone_model_system(0).unwrap().root.type_name.as_deref(),
            Some("Template")
        );
    }

    #[test]
    fn test_try_save_detects_contention() {
        let (_project, session) = open();
        let gate = session.save_gate.lock().unwrap();
        assert!(session.is_saving());
        assert_eq!(session.try_save(), Err(SessionError::SaveInProgress));
        drop(gate);
        assert!(!session.is_saving());
        assert!(session.try_save().is_ok());
    }

    #[test]
    fn test_reload_discards_history() {
        let (_project, session) = open();
        let template = session.resolve_type("Template");
        session.set_module_type(root(&session), template).unwrap();
        assert!(session.can_undo());

        session.reload().unwrap();
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert!(!session.has_changed());
        assert!(session.read(|model| model.root().module_type().is_none()));
    }

    #[test]
    fn test_standalone_session_can_not_run() {
        let (_project, session) = open();
        assert!(!session.can_run());
        assert_eq!(session.run("Run").unwrap_err(), SessionError::CannotRun);
    }

    #[test]
    fn test_close_refuses_unsaved_changes() {
        let (_project, session) = open();
        session.set_model_system_description("changed").unwrap();
        let (session, error) = session.close().unwrap_err();
        assert_eq!(error, SessionError::UnsavedChanges);
        session.save().unwrap();
        assert!(session.close().is_ok());
    }

    #[test]
    fn test_notifications_reach_consumer() {
        let (_project, session) = open();
        let mut consumer = session.take_notifications().unwrap();
        assert!(session.take_notifications().is_none());
        session.set_model_system_description("described").unwrap();

        let mut kinds = Vec::new();
        while let Some(notification) = consumer.try_pop() {
            kinds.push(notification.kind);
        }
        assert!(kinds.contains(&NotificationKind::ModelSystemDescriptionChanged));
        assert!(kinds.contains(&NotificationKind::CommandExecuted {
            name: "Set Model System Description".to_string()
        }));
    }

    #[test]
    #[should_panic(expected = "can only be used on a collection")]
    fn test_collection_edit_on_slot_panics() {
        let (_project, session) = open();
        let _ = session.remove_all_collection_members(root(&session));
    }
}
