// Persisted structure provider - the storage seen by editing sessions

use crate::model::snapshot::ModelSystemSnapshot;

/// Project error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    #[error("The index is invalid.")]
    InvalidIndex(usize),

    #[error("The model system to move is out of range!")]
    MoveSourceOutOfRange,

    #[error("The new position is out of range!")]
    MoveDestinationOutOfRange,

    #[error("Failed to save the model system: {0}")]
    SaveFailed(String),

    #[error("Run controller error: {0}")]
    RunRejected(String),
}

/// A project's list of model systems.
///
/// Sessions only ever exchange snapshots with a provider; how they are
/// persisted is the provider's business. Implementations are shared between
/// sessions and threads.
pub trait StructureProvider: Send + Sync {
    /// Project name
    fn name(&self) -> String;

    fn model_system_count(&self) -> usize;

    /// A fresh copy of the model system at `index`
    fn clone_model_system(&self, index: usize) -> Result<ModelSystemSnapshot, ProjectError>;

    /// Replace the stored model system at `index`
    fn save_model_system(
        &self,
        index: usize,
        snapshot: ModelSystemSnapshot,
    ) -> Result<(), ProjectError>;

    /// Append a model system, returning its index
    fn add_model_system(&self, snapshot: ModelSystemSnapshot) -> Result<usize, ProjectError>;

    fn remove_model_system(&self, index: usize) -> Result<ModelSystemSnapshot, ProjectError>;

    /// Move the model system at `from` so that it ends up at `to`
    fn move_model_system(&self, from: usize, to: usize) -> Result<(), ProjectError>;

    /// Copies of every model system in order
    fn clone_all(&self) -> Result<Vec<ModelSystemSnapshot>, ProjectError> {
        (0..self.model_system_count())
            .map(|index| self.clone_model_system(index))
            .collect()
    }
}
