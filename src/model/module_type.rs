// Module types and the type-compatibility oracle
//
// A module type declares the shape a structural node takes once the type is
// assigned: its parameters and its child slots. The registry answers whether a
// type may be assigned at a given location.

use crate::model::parameter::ParameterKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Interface implemented by every type that can sit at the root of a model system
pub const MODEL_SYSTEM_TEMPLATE: &str = "IModelSystemTemplate";

/// Declared parameter of a module type
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub default_value: String,
    pub description: String,
    pub quick: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterKind, default_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            default_value: default_value.into(),
            description: String::new(),
            quick: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }
}

/// Declared child slot of a module type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    /// Name of the field the child is bound to
    pub field_name: String,
    /// Interface a module must implement to fill the slot (the element
    /// interface for collection slots)
    pub interface: String,
    pub required: bool,
    pub collection: bool,
}

impl SlotSpec {
    pub fn module(field_name: impl Into<String>, interface: impl Into<String>, required: bool) -> Self {
        Self {
            field_name: field_name.into(),
            interface: interface.into(),
            required,
            collection: false,
        }
    }

    pub fn collection(field_name: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            interface: interface.into(),
            required: false,
            collection: true,
        }
    }
}

/// A module type that can be assigned to a structural node
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleType {
    name: String,
    interfaces: Vec<String>,
    parameters: Vec<ParameterSpec>,
    slots: Vec<SlotSpec>,
    /// Type names this module may be placed under; empty means any parent
    allowed_parents: Vec<String>,
    /// Interface the model system root must implement for this module to be used
    required_root: Option<String>,
}

impl ModuleType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            parameters: Vec::new(),
            slots: Vec::new(),
            allowed_parents: Vec::new(),
            required_root: None,
        }
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_slot(mut self, slot: SlotSpec) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn allowed_under(mut self, parent_type: impl Into<String>) -> Self {
        self.allowed_parents.push(parent_type.into());
        self
    }

    pub fn requiring_root(mut self, interface: impl Into<String>) -> Self {
        self.required_root = Some(interface.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    /// Check the parent constraint (a `None` parent is the model system itself)
    pub fn accepts_parent(&self, parent: Option<&ModuleType>) -> bool {
        if self.allowed_parents.is_empty() {
            return true;
        }
        match parent {
            Some(parent) => self.allowed_parents.iter().any(|p| p == parent.name()),
            None => false,
        }
    }

    /// Check the root constraint against the root the model system would have
    pub fn accepts_root(&self, root: Option<&ModuleType>) -> bool {
        match (&self.required_root, root) {
            (None, _) => true,
            (Some(interface), Some(root)) => root.implements(interface),
            (Some(_), None) => false,
        }
    }

    /// Name shown for a collection member created from this type: a space
    /// goes before every capital but the first, so `TestModule` becomes
    /// `Test Module` and `GTAModel` becomes `G T A Model`
    pub fn display_name(&self) -> String {
        let mut name = String::with_capacity(self.name.len() * 2);
        for (i, c) in self.name.chars().enumerate() {
            if i > 0 && c.is_uppercase() {
                name.push(' ');
            }
            name.push(c);
        }
        name
    }
}

/// The location a type is being assigned to
#[derive(Debug, Clone, Copy)]
pub struct AssignmentTarget<'a> {
    /// Interface required by the slot
    pub slot_interface: &'a str,
    /// Type of the module owning the slot; `None` at the model system root
    pub parent_type: Option<&'a ModuleType>,
    /// Type the model system root will have after the assignment
    pub root_type: Option<&'a ModuleType>,
}

/// Type-compatibility oracle and type lookup.
///
/// Implementations are shared between sessions and must be thread safe.
pub trait ModuleRegistry: Send + Sync {
    /// Look up a type by name
    fn resolve(&self, type_name: &str) -> Option<Arc<ModuleType>>;

    /// All known types
    fn module_types(&self) -> Vec<Arc<ModuleType>>;

    /// Whether `candidate` may be assigned at `target`
    fn is_assignable(&self, candidate: &ModuleType, target: &AssignmentTarget<'_>) -> bool {
        candidate.implements(target.slot_interface)
            && candidate.accepts_parent(target.parent_type)
            && candidate.accepts_root(target.root_type)
    }
}

/// Registry backed by a fixed set of declared types
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: HashMap<String, Arc<ModuleType>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module_type: ModuleType) -> Arc<ModuleType> {
        let module_type = Arc::new(module_type);
        self.types
            .insert(module_type.name().to_string(), Arc::clone(&module_type));
        module_type
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ModuleRegistry for TypeCatalog {
    fn resolve(&self, type_name: &str) -> Option<Arc<ModuleType>> {
        self.types.get(type_name).cloned()
    }

    fn module_types(&self) -> Vec<Arc<ModuleType>> {
        let mut types: Vec<_> = self.types.values().cloned().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_inserts_spaces() {
        assert_eq!(ModuleType::new("TestModule").display_name(), "Test Module");
        assert_eq!(ModuleType::new("GTAModel").display_name(), "G T A Model");
        assert_eq!(ModuleType::new("myModel").display_name(), "my Model");
        assert_eq!(ModuleType::new("mode").display_name(), "mode");
    }

    #[test]
    fn test_default_oracle_checks_interface_parent_and_root() {
        let mut catalog = TypeCatalog::new();
        let template = catalog.register(ModuleType::new("Template").implementing(MODEL_SYSTEM_TEMPLATE));
        let other_template =
            catalog.register(ModuleType::new("OtherTemplate").implementing(MODEL_SYSTEM_TEMPLATE));
        let restricted = catalog.register(
            ModuleType::new("Restricted")
                .implementing("IMode")
                .allowed_under("OtherTemplate"),
        );

        let under_template = AssignmentTarget {
            slot_interface: "IMode",
            parent_type: Some(&template),
            root_type: Some(&template),
        };
        let under_other = AssignmentTarget {
            slot_interface: "IMode",
            parent_type: Some(&other_template),
            root_type: Some(&other_template),
        };
        assert!(!catalog.is_assignable(&restricted, &under_template));
        assert!(catalog.is_assignable(&restricted, &under_other));

        let wrong_slot = AssignmentTarget {
            slot_interface: "IZoneSystem",
            parent_type: Some(&other_template),
            root_type: Some(&other_template),
        };
        assert!(!catalog.is_assignable(&restricted, &wrong_slot));
    }

    #[test]
    fn test_root_constraint() {
        let root = ModuleType::new("Root").implementing("ITashaRuntime");
        let module = ModuleType::new("Mode").requiring_root("ITashaRuntime");
        assert!(module.accepts_root(Some(&root)));
        assert!(!module.accepts_root(None));
        assert!(!module.accepts_root(Some(&ModuleType::new("Other"))));
    }
}
