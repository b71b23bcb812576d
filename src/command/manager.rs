// CommandManager - Manages undo/redo stacks

use crate::command::history::EditingStack;
use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::messaging::notification::NotificationKind;
use crate::model::document::ModelSystemModel;
use std::panic::{self, AssertUnwindSafe};

/// Default maximum number of commands to keep in history
pub const DEFAULT_MAX_HISTORY: usize = 100;

pub type BoxedCommand = Box<dyn UndoableCommand>;

/// Manages command execution and undo/redo functionality
///
/// The CommandManager maintains two bounded stacks:
/// - Undo stack: Commands that have been executed and can be undone
/// - Redo stack: Commands that have been undone and can be redone
///
/// When a new command succeeds the redo stack is cleared; there is a single
/// linear history. Inside a combined context successful commands are
/// buffered instead and land on the undo stack as one entry when the outermost
/// context ends.
pub struct CommandManager {
    undo_stack: EditingStack<BoxedCommand>,
    redo_stack: EditingStack<BoxedCommand>,

    /// Commands run inside the current combined context
    combined: Option<Vec<BoxedCommand>>,

    /// Set by any successful execute, undo or redo; cleared on save
    has_changed: bool,
}

impl CommandManager {
    /// Create a new CommandManager with default settings
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    /// Create a new CommandManager with a custom history limit
    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            undo_stack: EditingStack::new(max_history),
            redo_stack: EditingStack::new(max_history),
            combined: None,
            has_changed: false,
        }
    }

    /// Execute a command and record it
    ///
    /// # Errors
    /// Returns the command's error; nothing is recorded and the changed flag
    /// is left alone.
    pub fn execute(
        &mut self,
        mut command: BoxedCommand,
        model: &mut ModelSystemModel,
    ) -> CommandResult<()> {
        command.execute(model)?;

        let description = command.description();
        log::debug!("executed '{}'", description);
        self.has_changed = true;

        match self.combined.as_mut() {
            Some(buffer) => {
                if command.can_undo() {
                    buffer.push(command);
                }
            }
            None => {
                if command.can_undo() {
                    self.undo_stack.add(command);
                }
                model.notify(NotificationKind::CommandExecuted { name: description });
            }
        }

        // New timeline
        self.redo_stack.clear();
        Ok(())
    }

    /// Run `body` so that every command it executes is undone and redone as
    /// one step named `name`.
    ///
    /// Nested contexts are flattened into the outermost one. Nothing is
    /// recorded when no command inside succeeded. If `body` panics, the
    /// commands that already ran are still recorded before the panic resumes.
    pub fn execute_combined<F, R>(
        &mut self,
        name: impl Into<String>,
        model: &mut ModelSystemModel,
        body: F,
    ) -> R
    where
        F: FnOnce(&mut CombinedScope<'_>) -> R,
    {
        let outermost = self.combined.is_none();
        if outermost {
            self.combined = Some(Vec::new());
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            body(&mut CombinedScope {
                manager: &mut *self,
                model: &mut *model,
            })
        }));

        if outermost {
            if result.is_err() {
                log::warn!("combined command body panicked; keeping the commands that ran");
            }
            self.close_combined(name.into(), model);
        }
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Record the buffered commands of the outermost context as one entry
    fn close_combined(&mut self, name: String, model: &mut ModelSystemModel) {
        let commands = self.combined.take().unwrap_or_default();
        if commands.is_empty() {
            return;
        }
        log::debug!("combined {} command(s) into '{}'", commands.len(), name);
        self.undo_stack.add(Box::new(CombinedCommand {
            name: name.clone(),
            commands,
        }));
        self.redo_stack.clear();
        model.notify(NotificationKind::CommandExecuted { name });
    }

    /// True while a combined context is open
    pub fn in_combined_context(&self) -> bool {
        self.combined.is_some()
    }

    /// Undo the last command
    ///
    /// A command whose undo fails goes back onto the undo stack.
    ///
    /// # Errors
    /// Returns an error if:
    /// - There are no commands to undo
    /// - The undo operation fails
    pub fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<String> {
        let mut command = self.undo_stack.pop().ok_or(CommandError::NothingToUndo)?;
        let description = command.description();

        if let Err(e) = command.undo(model) {
            log::debug!("undo of '{}' failed: {}", description, e);
            self.undo_stack.add(command);
            return Err(e);
        }

        log::debug!("undid '{}'", description);
        self.redo_stack.add(command);
        self.has_changed = true;
        model.notify(NotificationKind::CommandExecuted {
            name: description.clone(),
        });
        Ok(description)
    }

    /// Redo the last undone command
    ///
    /// A command whose redo fails goes back onto the redo stack.
    ///
    /// # Errors
    /// Returns an error if:
    /// - There are no commands to redo
    /// - The redo operation fails
    pub fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<String> {
        let mut command = self.redo_stack.pop().ok_or(CommandError::NothingToRedo)?;
        let description = command.description();

        if let Err(e) = command.redo(model) {
            log::debug!("redo of '{}' failed: {}", description, e);
            self.redo_stack.add(command);
            return Err(e);
        }

        log::debug!("redid '{}'", description);
        self.undo_stack.add(command);
        self.has_changed = true;
        model.notify(NotificationKind::CommandExecuted {
            name: description.clone(),
        });
        Ok(description)
    }

    /// Check if there are commands that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if there are commands that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get a description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.peek_with(|cmd| cmd.description())
    }

    /// Get a description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.peek_with(|cmd| cmd.description())
    }

    /// Descriptions on the undo stack, most recent first
    pub fn undo_descriptions(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.undo_stack.for_each(|cmd| names.push(cmd.description()));
        names
    }

    /// Clear all command history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get the number of commands in the undo stack
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of commands in the redo stack
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    pub fn mark_saved(&mut self) {
        self.has_changed = false;
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Access handed to the body of a combined command
pub struct CombinedScope<'a> {
    manager: &'a mut CommandManager,
    model: &'a mut ModelSystemModel,
}

impl CombinedScope<'_> {
    /// Run a command inside the combined context
    pub fn run(&mut self, command: impl UndoableCommand + 'static) -> CommandResult<()> {
        self.manager.execute(Box::new(command), self.model)
    }

    pub fn run_boxed(&mut self, command: BoxedCommand) -> CommandResult<()> {
        self.manager.execute(command, self.model)
    }

    /// Open a nested context; its commands join the enclosing one
    pub fn combined<F, R>(&mut self, name: impl Into<String>, body: F) -> R
    where
        F: FnOnce(&mut CombinedScope<'_>) -> R,
    {
        self.manager.execute_combined(name, self.model, body)
    }

    /// Read the document between commands
    pub fn model(&self) -> &ModelSystemModel {
        self.model
    }
}

/// Several commands presented as one history entry
struct CombinedCommand {
    name: String,
    commands: Vec<BoxedCommand>,
}

impl UndoableCommand for CombinedCommand {
    fn execute(&mut self, _model: &mut ModelSystemModel) -> CommandResult<()> {
        // The buffered commands already ran
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        for index in (0..self.commands.len()).rev() {
            if let Err(e) = self.commands[index].undo(model) {
                // Put back what was already undone so the group stays whole
                for command in &mut self.commands[index + 1..] {
                    if let Err(rollback) = command.redo(model) {
                        log::warn!(
                            "'{}': could not redo '{}' after a failed undo: {}",
                            self.name,
                            command.description(),
                            rollback
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        for index in 0..self.commands.len() {
            if let Err(e) = self.commands[index].redo(model) {
                for command in self.commands[..index].iter_mut().rev() {
                    if let Err(rollback) = command.undo(model) {
                        log::warn!(
                            "'{}': could not undo '{}' after a failed redo: {}",
                            self.name,
                            command.description(),
                            rollback
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::module_type::TypeCatalog;
    use std::sync::Arc;

    // Mock command appending a letter to the model description
    struct AppendCommand {
        letter: char,
        fail_undo: bool,
    }

    impl AppendCommand {
        fn new(letter: char) -> Box<Self> {
            Box::new(Self {
                letter,
                fail_undo: false,
            })
        }
    }

    impl UndoableCommand for AppendCommand {
        fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
            let text = format!("{}{}", model.description(), self.letter);
            model.set_description(&text);
            Ok(())
        }

        fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
            if self.fail_undo {
                return Err(CommandError::UndoFailed("refused".into()));
            }
            let mut text = model.description().to_string();
            if text.pop() != Some(self.letter) {
                return Err(CommandError::UndoFailed("wrong order".into()));
            }
            model.set_description(&text);
            Ok(())
        }

        fn description(&self) -> String {
            format!("Append {}", self.letter)
        }
    }

    struct FailingCommand;

    impl UndoableCommand for FailingCommand {
        fn execute(&mut self, _model: &mut ModelSystemModel) -> CommandResult<()> {
            Err(CommandError::Validation("no".into()))
        }

        fn undo(&mut self, _model: &mut ModelSystemModel) -> CommandResult<()> {
            Ok(())
        }

        fn description(&self) -> String {
            "Fail".to_string()
        }
    }

    fn create_test_model() -> ModelSystemModel {
        ModelSystemModel::new("Test", Arc::new(TypeCatalog::new()))
    }

    #[test]
    fn test_execute_command() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute(AppendCommand::new('a'), &mut model).unwrap();

        assert_eq!(model.description(), "a");
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
        assert!(manager.can_undo());
        assert!(!manager.can_redo());
        assert!(manager.has_changed());
    }

    #[test]
    fn test_undo_and_redo() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();
        manager.execute(AppendCommand::new('a'), &mut model).unwrap();

        assert_eq!(manager.undo(&mut model).unwrap(), "Append a");
        assert_eq!(model.description(), "");
        assert_eq!(manager.redo_description().as_deref(), Some("Append a"));

        assert_eq!(manager.redo(&mut model).unwrap(), "Append a");
        assert_eq!(model.description(), "a");
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_redo_stack_cleared_on_new_command() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute(AppendCommand::new('a'), &mut model).unwrap();
        manager.execute(AppendCommand::new('b'), &mut model).unwrap();
        manager.undo(&mut model).unwrap();
        manager.execute(AppendCommand::new('c'), &mut model).unwrap();

        assert!(!manager.can_redo());
        assert_eq!(model.description(), "ac");
    }

    #[test]
    fn test_failed_command_is_not_recorded() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        assert!(manager.execute(Box::new(FailingCommand), &mut model).is_err());
        assert!(!manager.can_undo());
        assert!(!manager.has_changed());
    }

    #[test]
    fn test_history_limit() {
        let mut manager = CommandManager::with_capacity(3);
        let mut model = create_test_model();

        for letter in ['a', 'b', 'c', 'd', 'e'] {
            manager.execute(AppendCommand::new(letter), &mut model).unwrap();
        }

        assert_eq!(manager.undo_count(), 3);
        assert_eq!(
            manager.undo_descriptions(),
            vec!["Append e", "Append d", "Append c"]
        );
    }

    #[test]
    fn test_empty_stacks() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        assert_eq!(manager.undo(&mut model).unwrap_err(), CommandError::NothingToUndo);
        assert_eq!(manager.redo(&mut model).unwrap_err(), CommandError::NothingToRedo);
    }

    #[test]
    fn test_failed_undo_keeps_command() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();
        manager
            .execute(
                Box::new(AppendCommand {
                    letter: 'a',
                    fail_undo: true,
                }),
                &mut model,
            )
            .unwrap();

        assert!(manager.undo(&mut model).is_err());
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_combined_is_one_step() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute_combined("Two Letters", &mut model, |scope| {
            scope.run_boxed(AppendCommand::new('a')).unwrap();
            scope.run_boxed(AppendCommand::new('b')).unwrap();
            assert!(scope.run(FailingCommand).is_err());
        });

        assert_eq!(model.description(), "ab");
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.undo_description().as_deref(), Some("Two Letters"));

        // Undo runs b's undo before a's, otherwise AppendCommand reports an error
        manager.undo(&mut model).unwrap();
        assert_eq!(model.description(), "");
        manager.redo(&mut model).unwrap();
        assert_eq!(model.description(), "ab");
    }

    #[test]
    fn test_failed_combined_undo_rolls_back() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute_combined("Two Letters", &mut model, |scope| {
            scope
                .run_boxed(Box::new(AppendCommand {
                    letter: 'a',
                    fail_undo: true,
                }))
                .unwrap();
            scope.run_boxed(AppendCommand::new('b')).unwrap();
        });

        assert!(manager.undo(&mut model).is_err());
        assert_eq!(model.description(), "ab");
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_panicking_combined_body_keeps_history() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            manager.execute_combined("Boom", &mut model, |scope| {
                scope.run_boxed(AppendCommand::new('a')).unwrap();
                panic!("body failed");
            })
        }));
        assert!(outcome.is_err());
        assert!(!manager.in_combined_context());
        assert_eq!(manager.undo_description().as_deref(), Some("Boom"));

        manager.execute(AppendCommand::new('b'), &mut model).unwrap();
        assert_eq!(manager.undo_count(), 2);
        manager.undo(&mut model).unwrap();
        manager.undo(&mut model).unwrap();
        assert_eq!(model.description(), "");
    }

    #[test]
    fn test_nested_combined_flattens() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute_combined("Outer", &mut model, |scope| {
            scope.run_boxed(AppendCommand::new('a')).unwrap();
            scope.combined("Inner", |inner| {
                inner.run_boxed(AppendCommand::new('b')).unwrap();
            });
        });

        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.undo_description().as_deref(), Some("Outer"));
        assert!(!manager.in_combined_context());
    }

    #[test]
    fn test_empty_combined_records_nothing() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute_combined("Nothing", &mut model, |scope| {
            let _ = scope.run(FailingCommand);
        });

        assert!(!manager.can_undo());
    }

    #[test]
    fn test_failing_member_rolls_combined_undo_back() {
        let mut manager = CommandManager::new();
        let mut model = create_test_model();

        manager.execute_combined("Mixed", &mut model, |scope| {
            scope
                .run_boxed(Box::new(AppendCommand {
                    letter: 'a',
                    fail_undo: true,
                }))
                .unwrap();
            scope.run_boxed(AppendCommand::new('b')).unwrap();
        });

        assert!(manager.undo(&mut model).is_err());
        assert_eq!(model.description(), "ab");
        assert_eq!(manager.undo_count(), 1);
    }
}
