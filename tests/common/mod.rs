// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;
use xtmf_editing::UndoableCommand;
use xtmf_editing::command::commands::SetTypeCommand;
use xtmf_editing::model::{
    MODEL_SYSTEM_TEMPLATE, ModelSystemModel, ModelSystemSnapshot, ModuleRegistry, ModuleType,
    NodeId, ParameterId, ParameterKind, ParameterSpec, SlotSpec, TypeCatalog,
};
use xtmf_editing::project::MemoryProject;
use xtmf_editing::{EditingConfig, ModelSystemEditingSession};

pub const TEMPLATE: &str = "TestModelSystemTemplate";
pub const TEST_MODULE: &str = "TestModule";
pub const OTHER_MODULE: &str = "OtherModule";
pub const RESTRICTED_MODULE: &str = "RestrictedModule";

/// Types used by every test: a template with a required child slot and a
/// collection, plus a few modules to put in them
pub fn registry() -> Arc<dyn ModuleRegistry> {
    let mut catalog = TypeCatalog::new();
    catalog.register(
        ModuleType::new(TEMPLATE)
            .implementing(MODEL_SYSTEM_TEMPLATE)
            .with_parameter(ParameterSpec::new("Input Directory", ParameterKind::Text, "../../Input").quick())
            .with_parameter(ParameterSpec::new("SecondaryString", ParameterKind::Text, ""))
            .with_parameter(ParameterSpec::new("Iterations", ParameterKind::Integer, "5"))
            .with_slot(SlotSpec::module("Child", "ITestModule", true))
            .with_slot(SlotSpec::collection("Modes", "ITestModule")),
    );
    catalog.register(
        ModuleType::new(TEST_MODULE)
            .implementing("ITestModule")
            .with_parameter(ParameterSpec::new("Value", ParameterKind::Float, "1.0"))
            .with_parameter(ParameterSpec::new("SomeParam", ParameterKind::Integer, "2")),
    );
    catalog.register(
        ModuleType::new(OTHER_MODULE)
            .implementing("ITestModule")
            .with_parameter(ParameterSpec::new("Label", ParameterKind::Text, "other"))
            .with_slot(SlotSpec::module("Sub", "ITestModule", false)),
    );
    catalog.register(
        ModuleType::new(RESTRICTED_MODULE)
            .implementing("ITestModule")
            .allowed_under("SomeOtherTemplate"),
    );
    Arc::new(catalog)
}

/// A model system whose root already has the template type
pub fn template_snapshot(name: &str) -> ModelSystemSnapshot {
    let registry = registry();
    let mut model = ModelSystemModel::new(name, Arc::clone(&registry));
    let root = model.root().id();
    SetTypeCommand::new(root, registry.resolve(TEMPLATE))
        .execute(&mut model)
        .unwrap();
    model.to_snapshot()
}

pub fn memory_project(model_systems: &[&str]) -> Arc<MemoryProject> {
    Arc::new(MemoryProject::with_model_systems(
        "Test Project",
        model_systems.iter().map(|name| template_snapshot(name)).collect(),
    ))
}

/// A standalone session on a fresh template model system
pub fn open_session() -> ModelSystemEditingSession {
    ModelSystemEditingSession::open(
        memory_project(&["Model System"]),
        0,
        registry(),
        &EditingConfig::default(),
    )
    .unwrap()
}

pub fn root(session: &ModelSystemEditingSession) -> NodeId {
    session.read(|model| model.root().id())
}

/// Child of the root by field name
pub fn slot(session: &ModelSystemEditingSession, field: &str) -> NodeId {
    session.read(|model| {
        model
            .root()
            .children()
            .iter()
            .find(|child| child.parent_field_name() == field)
            .map(|child| child.id())
            .unwrap()
    })
}

pub fn parameter(session: &ModelSystemEditingSession, node: NodeId, name: &str) -> ParameterId {
    session.read(|model| model.node(node).unwrap().parameters().by_name(name).unwrap().id())
}

pub fn value(session: &ModelSystemEditingSession, parameter: ParameterId) -> String {
    session.read(|model| model.parameter(parameter).unwrap().value().to_string())
}

pub fn module_type(session: &ModelSystemEditingSession, name: &str) -> Arc<ModuleType> {
    session.resolve_type(name).unwrap()
}

pub fn children(session: &ModelSystemEditingSession, node: NodeId) -> Vec<NodeId> {
    session.read(|model| model.node(node).unwrap().children().iter().map(|c| c.id()).collect())
}
