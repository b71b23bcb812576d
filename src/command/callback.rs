// Command built from closures

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::model::document::ModelSystemModel;

pub type CommandCallback = Box<dyn FnMut(&mut ModelSystemModel) -> CommandResult<()> + Send>;

/// A named command whose steps are closures.
///
/// Undo and redo are either both present or both absent; a command without
/// them runs once and is never recorded in the history.
pub struct Command {
    name: String,
    on_do: CommandCallback,
    on_undo: Option<CommandCallback>,
    on_redo: Option<CommandCallback>,
}

impl Command {
    /// Command that can not be undone
    pub fn new<D>(name: impl Into<String>, on_do: D) -> Self
    where
        D: FnMut(&mut ModelSystemModel) -> CommandResult<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            on_do: Box::new(on_do),
            on_undo: None,
            on_redo: None,
        }
    }

    /// Command with all three steps
    pub fn reversible<D, U, R>(name: impl Into<String>, on_do: D, on_undo: U, on_redo: R) -> Self
    where
        D: FnMut(&mut ModelSystemModel) -> CommandResult<()> + Send + 'static,
        U: FnMut(&mut ModelSystemModel) -> CommandResult<()> + Send + 'static,
        R: FnMut(&mut ModelSystemModel) -> CommandResult<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            on_do: Box::new(on_do),
            on_undo: Some(Box::new(on_undo)),
            on_redo: Some(Box::new(on_redo)),
        }
    }

    /// Build from optional steps.
    ///
    /// # Errors
    /// Returns [`CommandError::AsymmetricUndo`] when only one of undo and redo
    /// is given.
    pub fn from_parts(
        name: impl Into<String>,
        on_do: CommandCallback,
        on_undo: Option<CommandCallback>,
        on_redo: Option<CommandCallback>,
    ) -> CommandResult<Self> {
        if on_undo.is_some() != on_redo.is_some() {
            return Err(CommandError::AsymmetricUndo);
        }
        Ok(Self {
            name: name.into(),
            on_do,
            on_undo,
            on_redo,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl UndoableCommand for Command {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        (self.on_do)(model)
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        match self.on_undo.as_mut() {
            Some(undo) => undo(model),
            None => Err(CommandError::NotUndoable(self.name.clone())),
        }
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        match self.on_redo.as_mut() {
            Some(redo) => redo(model),
            None => Err(CommandError::NotUndoable(self.name.clone())),
        }
    }

    fn description(&self) -> String {
        self.name.clone()
    }

    fn can_undo(&self) -> bool {
        self.on_undo.is_some()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("can_undo", &self.can_undo())
            .finish()
    }
}
