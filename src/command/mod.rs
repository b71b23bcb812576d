// Command Pattern for Undo/Redo of model system edits
//
// Every change to a model system document goes through an UndoableCommand
// executed by the CommandManager of its editing session.
//
// Architecture:
// - UndoableCommand trait: execute(), undo(), redo(), description()
// - EditingStack: bounded, thread-safe history used for the undo/redo stacks
// - CommandManager: routes execution, combined commands and undo/redo
// - Concrete commands: structure edits, parameter edits, linked parameters,
//   copy and paste

pub mod callback;
pub mod commands;
pub mod history;
pub mod linked;
pub mod manager;
pub mod paste;
pub mod trait_def;

pub use callback::Command;
pub use history::EditingStack;
pub use manager::{CombinedScope, CommandManager};
pub use trait_def::{CommandError, CommandResult, UndoableCommand};
