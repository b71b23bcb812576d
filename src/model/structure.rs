// Structural nodes of the model system tree
//
// Nodes own their children by value. There is no parent pointer: the parent
// of a node is found by searching from the root, so splicing a subtree in or
// out can never leave a stale back-reference behind.

use crate::model::ids::{NodeId, ParameterId};
use crate::model::module_type::{ModuleType, SlotSpec};
use crate::model::parameter::{ParameterModel, ParametersModel};
use std::sync::Arc;

/// One module slot or module instance in the tree
#[derive(Debug, Clone)]
pub struct StructureNode {
    id: NodeId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parent_field_name: String,
    pub(crate) slot_interface: String,
    pub(crate) module_type: Option<Arc<ModuleType>>,
    pub(crate) required: bool,
    pub(crate) disabled: bool,
    is_collection: bool,
    pub(crate) is_meta_module: bool,
    pub(crate) dirty: bool,
    pub(crate) children: Vec<StructureNode>,
    pub(crate) parameters: ParametersModel,
}

impl StructureNode {
    /// Create an unassigned module slot
    pub fn new_slot(
        name: impl Into<String>,
        parent_field_name: impl Into<String>,
        slot_interface: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            description: String::new(),
            parent_field_name: parent_field_name.into(),
            slot_interface: slot_interface.into(),
            module_type: None,
            required,
            disabled: false,
            is_collection: false,
            is_meta_module: false,
            dirty: false,
            children: Vec::new(),
            parameters: ParametersModel::empty(),
        }
    }

    /// Create an empty collection node whose members implement `element_interface`
    pub fn new_collection(
        name: impl Into<String>,
        parent_field_name: impl Into<String>,
        element_interface: impl Into<String>,
    ) -> Self {
        let mut node = Self::new_slot(name, parent_field_name, element_interface, false);
        node.is_collection = true;
        node
    }

    /// Create the node a slot declaration describes
    pub fn from_slot(slot: &SlotSpec) -> Self {
        if slot.collection {
            Self::new_collection(&slot.field_name, &slot.field_name, &slot.interface)
        } else {
            Self::new_slot(&slot.field_name, &slot.field_name, &slot.interface, slot.required)
        }
    }

    /// Child nodes and parameters a freshly assigned type starts with
    pub fn default_shape(module_type: Option<&ModuleType>) -> (Vec<StructureNode>, ParametersModel) {
        let children = module_type
            .map(|t| t.slots().iter().map(StructureNode::from_slot).collect())
            .unwrap_or_default();
        (children, ParametersModel::for_type(module_type))
    }

    pub(crate) fn set_collection(&mut self, is_collection: bool) {
        self.is_collection = is_collection;
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parent_field_name(&self) -> &str {
        &self.parent_field_name
    }

    pub fn slot_interface(&self) -> &str {
        &self.slot_interface
    }

    pub fn module_type(&self) -> Option<&Arc<ModuleType>> {
        self.module_type.as_ref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.module_type.as_deref().map(ModuleType::name)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        !self.required
    }

    pub fn can_disable(&self) -> bool {
        !self.required
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn is_meta_module(&self) -> bool {
        self.is_meta_module
    }

    /// True when this node or any descendant has unsaved structural changes
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.children.iter().any(StructureNode::is_dirty)
    }

    pub fn children(&self) -> &[StructureNode] {
        &self.children
    }

    pub fn parameters(&self) -> &ParametersModel {
        &self.parameters
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
        for child in &mut self.children {
            child.clear_dirty();
        }
    }

    /// Find a node in this subtree
    pub fn find(&self, id: NodeId) -> Option<&StructureNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: NodeId) -> Option<&mut StructureNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Find the parent of `id` within this subtree
    pub fn find_parent(&self, id: NodeId) -> Option<&StructureNode> {
        if self.children.iter().any(|c| c.id == id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_parent(id))
    }

    /// Parent id and position of `id` within its parent's children
    pub fn locate(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.find_parent(id)?;
        let index = parent.children.iter().position(|c| c.id == id)?;
        Some((parent.id, index))
    }

    /// Find a parameter anywhere in this subtree
    pub fn find_parameter(&self, id: ParameterId) -> Option<&ParameterModel> {
        self.parameters
            .get(id)
            .or_else(|| self.children.iter().find_map(|child| child.find_parameter(id)))
    }

    pub(crate) fn find_parameter_mut(&mut self, id: ParameterId) -> Option<&mut ParameterModel> {
        if self.parameters.get(id).is_some() {
            return self.parameters.get_mut(id);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_parameter_mut(id))
    }

    /// The node that owns a parameter
    pub fn parameter_owner(&self, id: ParameterId) -> Option<&StructureNode> {
        if self.parameters.get(id).is_some() {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.parameter_owner(id))
    }

    /// Every parameter id in this subtree, depth first
    pub fn parameter_ids(&self) -> Vec<ParameterId> {
        let mut ids = Vec::new();
        self.visit(&mut |node| ids.extend(node.parameters.parameters().iter().map(|p| p.id())));
        ids
    }

    /// Call `f` for every node in this subtree, depth first, parents first
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a StructureNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::module_type::ParameterSpec;
    use crate::model::parameter::ParameterKind;

    fn sample_tree() -> StructureNode {
        let module = Arc::new(
            ModuleType::new("Mode")
                .with_parameter(ParameterSpec::new("Constant", ParameterKind::Float, "0")),
        );
        let mut root = StructureNode::new_slot("Root", "Root", "IRoot", true);
        let mut modes = StructureNode::new_collection("Modes", "Modes", "IMode");
        let mut member = StructureNode::new_slot("Auto", "Modes", "IMode", false);
        let (children, parameters) = StructureNode::default_shape(Some(&module));
        member.module_type = Some(module);
        member.children = children;
        member.parameters = parameters;
        modes.children.push(member);
        root.children.push(modes);
        root
    }

    #[test]
    fn test_find_parent_is_recomputed() {
        let root = sample_tree();
        let modes = &root.children()[0];
        let member = &modes.children()[0];
        assert_eq!(root.find_parent(member.id()).unwrap().id(), modes.id());
        assert_eq!(root.find_parent(modes.id()).unwrap().id(), root.id());
        assert!(root.find_parent(root.id()).is_none());
        assert_eq!(root.locate(member.id()), Some((modes.id(), 0)));
    }

    #[test]
    fn test_parameter_lookup() {
        let root = sample_tree();
        let member = &root.children()[0].children()[0];
        let constant = member.parameters().by_name("Constant").unwrap();
        assert_eq!(root.find_parameter(constant.id()).unwrap().name(), "Constant");
        assert_eq!(root.parameter_owner(constant.id()).unwrap().id(), member.id());
        assert_eq!(root.parameter_ids(), vec![constant.id()]);
    }

    #[test]
    fn test_dirty_is_derived_from_descendants() {
        let mut root = sample_tree();
        assert!(!root.is_dirty());
        root.children[0].children[0].dirty = true;
        assert!(root.is_dirty());
        root.clear_dirty();
        assert!(!root.is_dirty());
    }
}
