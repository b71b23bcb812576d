// ModelSystemModel - the live document edited by a session
//
// The document owns the structure tree and the linked parameters. Commands are
// the only callers of the mutating helpers below; everything else goes through
// a session so the history stays consistent.

use crate::command::trait_def::{CommandError, CommandResult};
use crate::messaging::channels::Notifier;
use crate::messaging::notification::{Notification, NotificationKind, Property};
use crate::model::ids::{LinkedParameterId, NodeId, ParameterId};
use crate::model::linked::{Detachment, LinkedParameterModel, LinkedParametersModel};
use crate::model::module_type::{AssignmentTarget, ModuleRegistry, ModuleType};
use crate::model::parameter::ParameterModel;
use crate::model::snapshot::{
    LinkedParameterSnapshot, ModelSystemSnapshot, SnapshotError, StructureSnapshot,
    instantiate_linked_parameters,
};
use crate::model::structure::StructureNode;
use std::sync::Arc;

pub struct ModelSystemModel {
    pub(crate) description: String,
    pub(crate) root: StructureNode,
    pub(crate) linked_parameters: LinkedParametersModel,
    registry: Arc<dyn ModuleRegistry>,
    pub(crate) notifier: Notifier,
    /// Changes that are not attached to a node (description, linked parameters)
    pub(crate) dirty: bool,
}

impl ModelSystemModel {
    /// Empty document whose root slot has no type yet
    pub fn new(name: impl Into<String>, registry: Arc<dyn ModuleRegistry>) -> Self {
        let name = name.into();
        Self {
            description: String::new(),
            root: StructureNode::new_slot(
                name,
                "Root",
                crate::model::module_type::MODEL_SYSTEM_TEMPLATE,
                true,
            ),
            linked_parameters: LinkedParametersModel::new(),
            registry,
            notifier: Notifier::disconnected(),
            dirty: false,
        }
    }

    /// Build a live document from a persisted snapshot
    pub fn from_snapshot(
        snapshot: &ModelSystemSnapshot,
        registry: Arc<dyn ModuleRegistry>,
    ) -> Result<Self, SnapshotError> {
        let mut root = snapshot.root.instantiate(registry.as_ref())?;
        root.name = snapshot.name.clone();
        let linked_parameters = instantiate_linked_parameters(&root, &snapshot.linked_parameters)?;
        Ok(Self {
            description: snapshot.description.clone(),
            root,
            linked_parameters,
            registry,
            notifier: Notifier::disconnected(),
            dirty: false,
        })
    }

    /// Capture the document for the persisted structure provider
    pub fn to_snapshot(&self) -> ModelSystemSnapshot {
        ModelSystemSnapshot {
            name: self.root.name().to_string(),
            description: self.description.clone(),
            root: StructureSnapshot::capture(&self.root),
            linked_parameters: LinkedParameterSnapshot::capture_all(
                &self.root,
                &self.linked_parameters,
            ),
        }
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn root(&self) -> &StructureNode {
        &self.root
    }

    pub fn linked_parameters(&self) -> &LinkedParametersModel {
        &self.linked_parameters
    }

    pub fn registry(&self) -> &Arc<dyn ModuleRegistry> {
        &self.registry
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.root.is_dirty()
    }

    pub(crate) fn clear_dirty(&mut self) {
        let was_dirty = self.is_dirty();
        self.dirty = false;
        self.root.clear_dirty();
        if was_dirty {
            self.notify_property(self.root.id(), Property::IsDirty);
        }
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    pub(crate) fn take_notifier(&mut self) -> Notifier {
        std::mem::take(&mut self.notifier)
    }

    pub(crate) fn notify(&mut self, kind: NotificationKind) {
        self.notifier.send(Notification::new(kind));
    }

    pub(crate) fn notify_property(&mut self, node: NodeId, property: Property) {
        self.notifier.send(Notification::property(node, property));
    }

    pub fn node(&self, id: NodeId) -> Option<&StructureNode> {
        self.root.find(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> CommandResult<&mut StructureNode> {
        self.root.find_mut(id).ok_or(CommandError::NodeNotFound(id))
    }

    /// Parent of a node, recomputed by searching from the root
    pub fn parent(&self, id: NodeId) -> Option<&StructureNode> {
        self.root.find_parent(id)
    }

    pub fn parameter(&self, id: ParameterId) -> Option<&ParameterModel> {
        self.root.find_parameter(id)
    }

    /// Parameters flagged for the quick-parameter view, in tree order
    pub fn quick_parameters(&self) -> Vec<&ParameterModel> {
        let mut quick = Vec::new();
        self.root.visit(&mut |node| {
            quick.extend(node.parameters().parameters().iter().filter(|p| p.is_quick()))
        });
        quick
    }

    /// The linked parameter a parameter belongs to, if any
    pub fn linked_parameter_of(&self, parameter: ParameterId) -> Option<&LinkedParameterModel> {
        self.linked_parameters.containing(parameter)
    }

    /// Type of the module that owns a node's slot; collections are looked
    /// through. `None` at the model system root.
    fn enclosing_type<'a>(&'a self, mut owner: Option<&'a StructureNode>) -> Option<Arc<ModuleType>> {
        while let Some(node) = owner {
            if !node.is_collection() {
                return node.module_type().cloned();
            }
            owner = self.parent(node.id());
        }
        None
    }

    /// Whether `candidate` may be assigned to the node `target`
    pub fn can_assign(&self, target: NodeId, candidate: &ModuleType) -> bool {
        let Some(node) = self.node(target) else {
            return false;
        };
        if node.is_collection() {
            return false;
        }
        if target == self.root.id() {
            return self.registry.is_assignable(
                candidate,
                &AssignmentTarget {
                    slot_interface: node.slot_interface(),
                    parent_type: None,
                    root_type: Some(candidate),
                },
            );
        }
        let parent_type = self.enclosing_type(self.parent(target));
        self.registry.is_assignable(
            candidate,
            &AssignmentTarget {
                slot_interface: node.slot_interface(),
                parent_type: parent_type.as_deref(),
                root_type: self.root.module_type().map(|t| t.as_ref()),
            },
        )
    }

    /// Whether `candidate` may be added as a member of `collection`
    pub fn can_add_member(&self, collection: NodeId, candidate: &ModuleType) -> bool {
        let Some(node) = self.node(collection) else {
            return false;
        };
        if !node.is_collection() {
            return false;
        }
        let parent_type = self.enclosing_type(Some(node));
        self.registry.is_assignable(
            candidate,
            &AssignmentTarget {
                slot_interface: node.slot_interface(),
                parent_type: parent_type.as_deref(),
                root_type: self.root.module_type().map(|t| t.as_ref()),
            },
        )
    }

    /// Registry types that can be placed at a node (as a member when the node
    /// is a collection)
    pub fn valid_modules(&self, target: NodeId) -> Vec<Arc<ModuleType>> {
        let Some(node) = self.node(target) else {
            return Vec::new();
        };
        let collection = node.is_collection();
        self.registry
            .module_types()
            .into_iter()
            .filter(|t| {
                if collection {
                    self.can_add_member(target, t)
                } else {
                    self.can_assign(target, t)
                }
            })
            .collect()
    }

    /// Check that every member of a linked parameter accepts `value`
    pub(crate) fn validate_linked_value(
        &self,
        linked: LinkedParameterId,
        value: &str,
    ) -> CommandResult<()> {
        let model = self
            .linked_parameters
            .get(linked)
            .ok_or(CommandError::LinkedParameterNotFound(linked))?;
        for member in model.parameters() {
            if let Some(parameter) = self.root.find_parameter(*member) {
                parameter.accepts(value).map_err(CommandError::Validation)?;
            }
        }
        Ok(())
    }

    /// Set a linked parameter and all its members, returning the previous
    /// linked value. Nothing changes unless every member accepts the value.
    pub(crate) fn set_linked_value(
        &mut self,
        linked: LinkedParameterId,
        value: &str,
    ) -> CommandResult<String> {
        self.validate_linked_value(linked, value)?;
        let model = self
            .linked_parameters
            .get_mut(linked)
            .ok_or(CommandError::LinkedParameterNotFound(linked))?;
        let previous = std::mem::replace(&mut model.value, value.to_string());
        let members = model.members.clone();
        for member in members {
            self.write_parameter(member, value);
        }
        self.dirty = true;
        self.notify(NotificationKind::LinkedParameterChanged { linked });
        Ok(previous)
    }

    /// Set a single parameter after validating it, returning the previous value
    pub(crate) fn set_parameter_value(
        &mut self,
        parameter: ParameterId,
        value: &str,
    ) -> CommandResult<String> {
        let current = self
            .root
            .find_parameter(parameter)
            .ok_or(CommandError::ParameterNotFound(parameter))?;
        current.accepts(value).map_err(CommandError::Validation)?;
        let previous = current.value().to_string();
        self.write_parameter(parameter, value);
        Ok(previous)
    }

    fn write_parameter(&mut self, parameter: ParameterId, value: &str) {
        if let Some(model) = self.root.find_parameter_mut(parameter) {
            model.value = value.to_string();
            self.dirty = true;
            self.notify(NotificationKind::ParameterValueChanged { parameter });
        }
    }

    pub(crate) fn set_parameter_quick(
        &mut self,
        parameter: ParameterId,
        quick: bool,
    ) -> CommandResult<bool> {
        let model = self
            .root
            .find_parameter_mut(parameter)
            .ok_or(CommandError::ParameterNotFound(parameter))?;
        let previous = std::mem::replace(&mut model.quick, quick);
        self.dirty = true;
        self.notify(NotificationKind::ParameterValueChanged { parameter });
        Ok(previous)
    }

    /// Add a parameter to a linked parameter at `index`, giving it the linked
    /// value. The parameter must not belong to any linked parameter.
    pub(crate) fn link_parameter(
        &mut self,
        linked: LinkedParameterId,
        parameter: ParameterId,
        index: usize,
    ) -> CommandResult<()> {
        let value = self
            .linked_parameters
            .get(linked)
            .ok_or(CommandError::LinkedParameterNotFound(linked))?
            .value()
            .to_string();
        if self.linked_parameters.containing(parameter).is_some() {
            return Err(CommandError::InvalidState(format!(
                "{} is already part of a linked parameter",
                parameter
            )));
        }
        let model = self
            .root
            .find_parameter(parameter)
            .ok_or(CommandError::ParameterNotFound(parameter))?;
        model.accepts(&value).map_err(CommandError::Validation)?;

        if let Some(target) = self.linked_parameters.get_mut(linked) {
            let index = index.min(target.members.len());
            target.members.insert(index, parameter);
        }
        self.write_parameter(parameter, &value);
        self.notify(NotificationKind::IsLinkedChanged { parameter });
        Ok(())
    }

    /// Remove a parameter from a linked parameter, returning where it was
    pub(crate) fn unlink_parameter(
        &mut self,
        linked: LinkedParameterId,
        parameter: ParameterId,
    ) -> CommandResult<usize> {
        let model = self
            .linked_parameters
            .get_mut(linked)
            .ok_or(CommandError::LinkedParameterNotFound(linked))?;
        let index = model.position(parameter).ok_or_else(|| {
            CommandError::Validation(
                "The parameter does not exist inside of the linked parameter!".to_string(),
            )
        })?;
        model.members.remove(index);
        self.dirty = true;
        self.notify(NotificationKind::IsLinkedChanged { parameter });
        Ok(index)
    }

    pub(crate) fn insert_linked_parameter(&mut self, index: usize, linked: LinkedParameterModel) {
        let id = linked.id();
        self.linked_parameters.insert(index, linked);
        self.dirty = true;
        self.notify(NotificationKind::LinkedParameterAdded { linked: id });
    }

    pub(crate) fn remove_linked_parameter(
        &mut self,
        linked: LinkedParameterId,
    ) -> CommandResult<(usize, LinkedParameterModel)> {
        let removed = self
            .linked_parameters
            .remove(linked)
            .ok_or(CommandError::LinkedParameterNotFound(linked))?;
        self.dirty = true;
        self.notify(NotificationKind::LinkedParameterRemoved { linked });
        Ok(removed)
    }

    pub(crate) fn rename_linked_parameter(
        &mut self,
        linked: LinkedParameterId,
        name: &str,
    ) -> CommandResult<String> {
        let model = self
            .linked_parameters
            .get_mut(linked)
            .ok_or(CommandError::LinkedParameterNotFound(linked))?;
        let previous = std::mem::replace(&mut model.name, name.to_string());
        self.dirty = true;
        self.notify(NotificationKind::LinkedParameterChanged { linked });
        Ok(previous)
    }

    /// Drop the linked memberships of parameters that are leaving the tree
    pub(crate) fn detach_parameters(&mut self, parameters: &[ParameterId]) -> Vec<Detachment> {
        let detached = self.linked_parameters.detach_all(parameters);
        for detachment in &detached {
            self.notify(NotificationKind::IsLinkedChanged {
                parameter: detachment.parameter,
            });
        }
        detached
    }

    pub(crate) fn restore_detached(&mut self, detached: &[Detachment]) {
        self.linked_parameters.restore(detached);
        for detachment in detached {
            self.notify(NotificationKind::IsLinkedChanged {
                parameter: detachment.parameter,
            });
        }
    }

    /// Take the child at `index` out of `parent`
    pub(crate) fn take_child(&mut self, parent: NodeId, index: usize) -> CommandResult<StructureNode> {
        let node = self.node_mut(parent)?;
        if index >= node.children.len() {
            return Err(CommandError::InvalidState(format!(
                "{} has no child at index {}",
                parent, index
            )));
        }
        let child = node.children.remove(index);
        node.dirty = true;
        self.notify(NotificationKind::ChildrenChanged { node: parent });
        Ok(child)
    }

    /// Put a node into `parent` at `index` (clamped to the end)
    pub(crate) fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: StructureNode,
    ) -> CommandResult<()> {
        let node = self.node_mut(parent)?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        node.dirty = true;
        self.notify(NotificationKind::ChildrenChanged { node: parent });
        Ok(())
    }

    /// Swap the node `target` for `replacement`, returning the old node.
    ///
    /// Replacing the root keeps the model system's name.
    pub(crate) fn replace_node(
        &mut self,
        target: NodeId,
        mut replacement: StructureNode,
    ) -> CommandResult<StructureNode> {
        replacement.dirty = true;
        if target == self.root.id() {
            let old = std::mem::replace(&mut self.root, replacement);
            let root = self.root.id();
            self.notify(NotificationKind::ChildrenChanged { node: root });
            return Ok(old);
        }
        let (parent, index) = self
            .root
            .locate(target)
            .ok_or(CommandError::NodeNotFound(target))?;
        let old = self.take_child(parent, index)?;
        self.insert_child(parent, index, replacement)?;
        Ok(old)
    }

    pub(crate) fn set_description(&mut self, description: &str) -> String {
        let previous = std::mem::replace(&mut self.description, description.to_string());
        self.dirty = true;
        self.notify(NotificationKind::ModelSystemDescriptionChanged);
        previous
    }
}

impl std::fmt::Debug for ModelSystemModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSystemModel")
            .field("name", &self.name())
            .field("description", &self.description)
            .field("root", &self.root)
            .field("linked_parameters", &self.linked_parameters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::module_type::{MODEL_SYSTEM_TEMPLATE, ParameterSpec, SlotSpec, TypeCatalog};
    use crate::model::parameter::ParameterKind;

    fn registry() -> Arc<dyn ModuleRegistry> {
        let mut catalog = TypeCatalog::new();
        catalog.register(
            ModuleType::new("Template")
                .implementing(MODEL_SYSTEM_TEMPLATE)
                .with_slot(SlotSpec::module("Child", "IMode", true))
                .with_slot(SlotSpec::collection("Modes", "IMode")),
        );
        catalog.register(
            ModuleType::new("Mode")
                .implementing("IMode")
                .with_parameter(ParameterSpec::new("Constant", ParameterKind::Float, "0"))
                .with_parameter(ParameterSpec::new("Label", ParameterKind::Text, "x").quick()),
        );
        catalog.register(
            ModuleType::new("Restricted")
                .implementing("IMode")
                .allowed_under("Elsewhere"),
        );
        Arc::new(catalog)
    }

    fn document() -> ModelSystemModel {
        let registry = registry();
        let mut document = ModelSystemModel::new("Test", Arc::clone(&registry));
        let template = registry.resolve("Template").unwrap();
        let (children, parameters) = StructureNode::default_shape(Some(&template));
        document.root.module_type = Some(template);
        document.root.children = children;
        document.root.parameters = parameters;
        let mode = registry.resolve("Mode").unwrap();
        let child = &mut document.root.children[0];
        let (children, parameters) = StructureNode::default_shape(Some(&mode));
        child.module_type = Some(mode);
        child.children = children;
        child.parameters = parameters;
        document
    }

    #[test]
    fn test_assignability_looks_through_collections() {
        let document = document();
        let modes = document.root.children()[1].id();
        let mode = document.registry().resolve("Mode").unwrap();
        let restricted = document.registry().resolve("Restricted").unwrap();
        assert!(document.can_add_member(modes, &mode));
        assert!(!document.can_add_member(modes, &restricted));
        assert!(!document.can_assign(modes, &mode));

        let names: Vec<_> = document
            .valid_modules(modes)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["Mode"]);
    }

    #[test]
    fn test_linked_value_is_all_or_nothing() {
        let mut document = document();
        let child = &document.root.children()[0];
        let constant = child.parameters().by_name("Constant").unwrap().id();
        let label = child.parameters().by_name("Label").unwrap().id();
        let linked = LinkedParameterModel::new("Shared", "1");
        let linked_id = linked.id();
        document.insert_linked_parameter(0, linked);
        document.link_parameter(linked_id, label, 0).unwrap();
        document.link_parameter(linked_id, constant, 1).unwrap();

        assert!(document.set_linked_value(linked_id, "abc").is_err());
        assert_eq!(document.parameter(constant).unwrap().value(), "1");
        assert_eq!(document.parameter(label).unwrap().value(), "1");

        assert_eq!(document.set_linked_value(linked_id, "2").unwrap(), "1");
        assert_eq!(document.parameter(constant).unwrap().value(), "2");
        assert_eq!(document.parameter(label).unwrap().value(), "2");
    }

    #[test]
    fn test_quick_parameters() {
        let document = document();
        let quick: Vec<_> = document.quick_parameters().iter().map(|p| p.name()).collect();
        assert_eq!(quick, vec!["Label"]);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_links() {
        let mut document = document();
        let constant = document.root.children()[0]
            .parameters()
            .by_name("Constant")
            .unwrap()
            .id();
        let linked = LinkedParameterModel::new("Shared", "4");
        let linked_id = linked.id();
        document.insert_linked_parameter(0, linked);
        document.link_parameter(linked_id, constant, 0).unwrap();

        let snapshot = document.to_snapshot();
        let rebuilt = ModelSystemModel::from_snapshot(&snapshot, registry()).unwrap();
        let rebuilt_constant = rebuilt.root.children()[0]
            .parameters()
            .by_name("Constant")
            .unwrap();
        assert_eq!(rebuilt_constant.value(), "4");
        assert_eq!(
            rebuilt.linked_parameter_of(rebuilt_constant.id()).unwrap().name(),
            "Shared"
        );
        assert!(!rebuilt.is_dirty());
    }
}
