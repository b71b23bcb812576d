// UndoableCommand trait definition

use crate::model::document::ModelSystemModel;
use crate::model::ids::{LinkedParameterId, NodeId, ParameterId};

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur while running, undoing or redoing a command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Undo failed: {0}")]
    UndoFailed(String),

    #[error("Redo failed: {0}")]
    RedoFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A proposed value, type or location was rejected before anything changed
    #[error("{0}")]
    Validation(String),

    #[error("Unable to find {0}")]
    NodeNotFound(NodeId),

    #[error("Unable to find {0}")]
    ParameterNotFound(ParameterId),

    #[error("Unable to find {0}")]
    LinkedParameterNotFound(LinkedParameterId),

    #[error("The command '{0}' can not be undone")]
    NotUndoable(String),

    #[error("A command must provide both an undo and a redo, or neither")]
    AsymmetricUndo,

    #[error("There was nothing to undo.")]
    NothingToUndo,

    #[error("There was nothing to redo.")]
    NothingToRedo,
}

/// Trait for commands that support undo/redo
///
/// Every change to a [`ModelSystemModel`] goes through a command run by its
/// editing session. `execute` runs once; after an undo the session calls
/// `redo`, which lets a command reattach what it built the first time instead
/// of building it again.
///
/// # Example
/// ```no_run
/// use xtmf_editing::command::trait_def::{CommandError, CommandResult, UndoableCommand};
/// use xtmf_editing::model::ModelSystemModel;
///
/// struct SetDescriptionCommand {
///     description: String,
///     old_description: Option<String>,
/// }
///
/// impl UndoableCommand for SetDescriptionCommand {
///     fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
///         self.old_description = Some(model.description().to_string());
///         Ok(())
///     }
///
///     fn undo(&mut self, _model: &mut ModelSystemModel) -> CommandResult<()> {
///         self.old_description
///             .take()
///             .map(|_| ())
///             .ok_or_else(|| CommandError::UndoFailed("No old description stored".into()))
///     }
///
///     fn description(&self) -> String {
///         "Set Description".to_string()
///     }
/// }
/// ```
pub trait UndoableCommand: Send {
    /// Apply the command for the first time.
    ///
    /// On failure the document must be left as it was.
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()>;

    /// Reverse a successful `execute` or `redo`
    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()>;

    /// Re-apply after an undo
    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.execute(model)
    }

    /// Human-readable name shown in the history (e.g. "Undo: Set Module Name")
    fn description(&self) -> String;

    /// Commands that can not be undone are never pushed onto the history
    fn can_undo(&self) -> bool {
        true
    }
}
