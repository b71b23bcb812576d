// Editing sessions
//
// A ModelSystemEditingSession owns one live document and its undo/redo
// history. A ProjectEditingSession shares those sessions between views by
// reference counting and keeps them in step with the project.

pub mod model_system;
pub mod project;

pub use model_system::ModelSystemEditingSession;
pub use project::{ProjectEditingSession, SessionHandle};

use crate::command::trait_def::CommandError;
use crate::model::snapshot::SnapshotError;
use crate::project::provider::ProjectError;

/// Session and project level errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("Unable to load the model system: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("The model system is already being saved.")]
    SaveInProgress,

    #[error("The project has changed and has not been saved.")]
    UnsavedChanges,

    #[error("You can not run this model system.")]
    CannotRun,

    #[error("The run name '{0}' is not valid.")]
    InvalidRunName(String),

    #[error("The index is invalid.")]
    InvalidIndex(usize),

    #[error("Unable to remove the model system. It is currently being edited.")]
    SessionInUse,
}
