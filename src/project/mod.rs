// Project side of the editing core
//
// The persisted project is reached only through StructureProvider; runs are
// handed to a RunController.

pub mod memory;
pub mod provider;
pub mod run;

pub use memory::MemoryProject;
pub use provider::{ProjectError, StructureProvider};
pub use run::{QueuedRuns, RunController, RunRequest, is_valid_run_name};
