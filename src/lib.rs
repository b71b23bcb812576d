// XTMF editing core - model system documents, commands and editing sessions

pub mod command;
pub mod config;
pub mod messaging;
pub mod model;
pub mod project;
pub mod session;

// Re-export commonly used types for convenience
pub use command::{
    CombinedScope, Command, CommandError, CommandManager, CommandResult, EditingStack,
    UndoableCommand,
};
pub use config::{ConfigError, EditingConfig};
pub use messaging::{Notification, NotificationKind, Property, create_notification_channel};
pub use model::{
    LinkedParameterId, ModelSystemModel, ModelSystemSnapshot, ModuleRegistry, ModuleType, NodeId,
    ParameterId, TypeCatalog,
};
pub use project::{MemoryProject, ProjectError, RunController, RunRequest, StructureProvider};
pub use session::{ModelSystemEditingSession, ProjectEditingSession, SessionError, SessionHandle};
