// Structural document model: module types, the structure tree, parameters
// and linked parameters

pub mod document;
pub mod ids;
pub mod linked;
pub mod module_type;
pub mod parameter;
pub mod path;
pub mod snapshot;
pub mod structure;

pub use document::ModelSystemModel;
pub use ids::{LinkedParameterId, NodeId, ParameterId, ParametersId};
pub use linked::{Detachment, LinkedParameterModel, LinkedParametersModel};
pub use module_type::{
    AssignmentTarget, MODEL_SYSTEM_TEMPLATE, ModuleRegistry, ModuleType, ParameterSpec, SlotSpec,
    TypeCatalog,
};
pub use parameter::{ParameterKind, ParameterModel, ParametersModel};
pub use path::PathError;
pub use snapshot::{
    CopiedModule, CopyBuffer, LinkedParameterSnapshot, ModelSystemSnapshot, ParameterSnapshot,
    SnapshotError, StructureSnapshot,
};
pub use structure::StructureNode;
