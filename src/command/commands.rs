// Concrete command implementations for structure nodes and parameters

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::messaging::notification::{NotificationKind, Property};
use crate::model::document::ModelSystemModel;
use crate::model::ids::{LinkedParameterId, NodeId, ParameterId};
use crate::model::linked::Detachment;
use crate::model::module_type::ModuleType;
use crate::model::parameter::ParametersModel;
use crate::model::structure::StructureNode;
use std::sync::Arc;

/// Type, children and parameters of a node; what a type change swaps
struct NodeShape {
    module_type: Option<Arc<ModuleType>>,
    children: Vec<StructureNode>,
    parameters: ParametersModel,
}

/// Swap a node's shape for `shape`, returning the one it had.
///
/// Every swap marks the node dirty, undo included.
fn swap_shape(
    model: &mut ModelSystemModel,
    node: NodeId,
    shape: NodeShape,
) -> CommandResult<NodeShape> {
    let target = model.node_mut(node)?;
    let previous = NodeShape {
        module_type: std::mem::replace(&mut target.module_type, shape.module_type),
        children: std::mem::replace(&mut target.children, shape.children),
        parameters: std::mem::replace(&mut target.parameters, shape.parameters),
    };
    let was_dirty = std::mem::replace(&mut target.dirty, true);
    model.notify_property(node, Property::Type);
    model.notify(NotificationKind::ChildrenChanged { node });
    model.notify(NotificationKind::ParametersChanged { node });
    if !was_dirty {
        model.notify_property(node, Property::IsDirty);
    }
    Ok(previous)
}

fn collection_node(model: &ModelSystemModel, collection: NodeId) -> CommandResult<&StructureNode> {
    let node = model
        .node(collection)
        .ok_or(CommandError::NodeNotFound(collection))?;
    if !node.is_collection() {
        return Err(CommandError::InvalidState(format!(
            "{} is not a collection",
            node.name()
        )));
    }
    Ok(node)
}

/// Assign a module type to a node, or clear it with `None`.
///
/// The node's children and parameters are rebuilt from the new type. Undo
/// puts the previous children and parameter set back, the same instances,
/// not rebuilt copies.
pub struct SetTypeCommand {
    node: NodeId,
    module_type: Option<Arc<ModuleType>>,
    /// Shape that is not currently in the tree
    stashed: Option<NodeShape>,
    detached: Vec<Detachment>,
}

impl SetTypeCommand {
    pub fn new(node: NodeId, module_type: Option<Arc<ModuleType>>) -> Self {
        Self {
            node,
            module_type,
            stashed: None,
            detached: Vec::new(),
        }
    }

    fn apply(&mut self, model: &mut ModelSystemModel, shape: NodeShape) -> CommandResult<()> {
        let leaving = model
            .node(self.node)
            .ok_or(CommandError::NodeNotFound(self.node))?
            .parameter_ids();
        let previous = swap_shape(model, self.node, shape)?;
        self.detached = model.detach_parameters(&leaving);
        self.stashed = Some(previous);
        Ok(())
    }
}

impl UndoableCommand for SetTypeCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let node = model
            .node(self.node)
            .ok_or(CommandError::NodeNotFound(self.node))?;
        if node.is_collection() {
            return Err(CommandError::Validation(
                "You can not set the type of a collection!".to_string(),
            ));
        }
        if let Some(module_type) = &self.module_type {
            if !model.can_assign(self.node, module_type) {
                return Err(CommandError::Validation(format!(
                    "The type '{}' can not be assigned to '{}'!",
                    module_type.name(),
                    node.name()
                )));
            }
        }

        let (children, parameters) = StructureNode::default_shape(self.module_type.as_deref());
        self.apply(
            model,
            NodeShape {
                module_type: self.module_type.clone(),
                children,
                parameters,
            },
        )
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .stashed
            .take()
            .ok_or_else(|| CommandError::UndoFailed("No previous type stored".into()))?;
        let applied = swap_shape(model, self.node, previous)?;
        model.restore_detached(&self.detached);
        self.stashed = Some(applied);
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let applied = self
            .stashed
            .take()
            .ok_or_else(|| CommandError::RedoFailed("No applied type stored".into()))?;
        self.apply(model, applied)
    }

    fn description(&self) -> String {
        "Set Module Type".to_string()
    }
}

/// Append a new member of the given type to a collection
pub struct AddCollectionMemberCommand {
    collection: NodeId,
    module_type: Arc<ModuleType>,
    name: Option<String>,
    index: usize,
    /// The member while it is out of the tree (after an undo)
    member: Option<StructureNode>,
    member_id: Option<NodeId>,
}

impl AddCollectionMemberCommand {
    /// A `None` name is derived from the type name
    pub fn new(collection: NodeId, module_type: Arc<ModuleType>, name: Option<String>) -> Self {
        Self {
            collection,
            module_type,
            name,
            index: 0,
            member: None,
            member_id: None,
        }
    }

    /// Id of the created member once the command has run
    pub fn member_id(&self) -> Option<NodeId> {
        self.member_id
    }
}

impl UndoableCommand for AddCollectionMemberCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let collection = collection_node(model, self.collection)?;
        if !model.can_add_member(self.collection, &self.module_type) {
            return Err(CommandError::Validation(format!(
                "The type '{}' can not be added to '{}'!",
                self.module_type.name(),
                collection.name()
            )));
        }

        let name = self
            .name
            .clone()
            .unwrap_or_else(|| self.module_type.display_name());
        let mut member = StructureNode::new_slot(
            name,
            collection.parent_field_name(),
            collection.slot_interface(),
            false,
        );
        let (children, parameters) = StructureNode::default_shape(Some(&self.module_type));
        member.module_type = Some(Arc::clone(&self.module_type));
        member.children = children;
        member.parameters = parameters;
        member.dirty = true;

        self.index = collection.children().len();
        self.member_id = Some(member.id());
        model.insert_child(self.collection, self.index, member)
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.member = Some(model.take_child(self.collection, self.index)?);
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let member = self
            .member
            .take()
            .ok_or_else(|| CommandError::RedoFailed("No collection member stored".into()))?;
        model.insert_child(self.collection, self.index, member)
    }

    fn description(&self) -> String {
        "Add Collection Member".to_string()
    }
}

/// Remove the member at `index` from a collection
pub struct RemoveCollectionMemberCommand {
    collection: NodeId,
    index: usize,
    removed: Option<StructureNode>,
    detached: Vec<Detachment>,
}

impl RemoveCollectionMemberCommand {
    pub fn new(collection: NodeId, index: usize) -> Self {
        Self {
            collection,
            index,
            removed: None,
            detached: Vec::new(),
        }
    }

    fn remove(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let member = model.take_child(self.collection, self.index)?;
        self.detached = model.detach_parameters(&member.parameter_ids());
        self.removed = Some(member);
        Ok(())
    }
}

impl UndoableCommand for RemoveCollectionMemberCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let collection = collection_node(model, self.collection)?;
        if collection.children().len() <= self.index {
            return Err(CommandError::Validation(format!(
                "There is no collection member at index {}!",
                self.index
            )));
        }
        self.remove(model)
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let member = self
            .removed
            .take()
            .ok_or_else(|| CommandError::UndoFailed("No removed member stored".into()))?;
        model.insert_child(self.collection, self.index, member)?;
        model.restore_detached(&self.detached);
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.remove(model)
    }

    fn description(&self) -> String {
        "Remove Collection Member".to_string()
    }
}

/// Empty a collection in one step
pub struct RemoveAllCollectionMembersCommand {
    collection: NodeId,
    removed: Vec<StructureNode>,
    detached: Vec<Detachment>,
}

impl RemoveAllCollectionMembersCommand {
    pub fn new(collection: NodeId) -> Self {
        Self {
            collection,
            removed: Vec::new(),
            detached: Vec::new(),
        }
    }

    fn remove_all(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let collection = model.node_mut(self.collection)?;
        self.removed = std::mem::take(&mut collection.children);
        collection.dirty = true;
        let leaving: Vec<ParameterId> = self
            .removed
            .iter()
            .flat_map(StructureNode::parameter_ids)
            .collect();
        self.detached = model.detach_parameters(&leaving);
        model.notify(NotificationKind::ChildrenChanged {
            node: self.collection,
        });
        Ok(())
    }
}

impl UndoableCommand for RemoveAllCollectionMembersCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let collection = collection_node(model, self.collection)?;
        if collection.children().is_empty() {
            return Err(CommandError::Validation(
                "There were no modules to delete in the collection!".to_string(),
            ));
        }
        self.remove_all(model)
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let collection = model.node_mut(self.collection)?;
        let mut members = std::mem::take(&mut self.removed);
        members.append(&mut collection.children);
        collection.children = members;
        collection.dirty = true;
        model.restore_detached(&self.detached);
        model.notify(NotificationKind::ChildrenChanged {
            node: self.collection,
        });
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.remove_all(model)
    }

    fn description(&self) -> String {
        "Remove All Collection Members".to_string()
    }
}

/// Move a collection member from one position to another
pub struct MoveCollectionMemberCommand {
    collection: NodeId,
    from: isize,
    to: isize,
}

impl MoveCollectionMemberCommand {
    /// Positions are signed so that a move computed from a delta can be
    /// rejected instead of wrapping
    pub fn new(collection: NodeId, from: isize, to: isize) -> Self {
        Self {
            collection,
            from,
            to,
        }
    }

    fn shift(model: &mut ModelSystemModel, collection: NodeId, from: usize, to: usize) -> CommandResult<()> {
        let member = model.take_child(collection, from)?;
        model.insert_child(collection, to, member)
    }
}

impl UndoableCommand for MoveCollectionMemberCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let count = collection_node(model, self.collection)?.children().len() as isize;
        if self.from < 0 || self.from >= count {
            return Err(CommandError::Validation(
                "The original position was invalid!".to_string(),
            ));
        }
        if self.to < 0 || self.to >= count {
            return Err(CommandError::Validation(
                "The destination position was invalid!".to_string(),
            ));
        }
        Self::shift(model, self.collection, self.from as usize, self.to as usize)
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        Self::shift(model, self.collection, self.to as usize, self.from as usize)
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        Self::shift(model, self.collection, self.from as usize, self.to as usize)
    }

    fn description(&self) -> String {
        "Move Collection Member".to_string()
    }
}

/// Simple node attributes edited in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeProperty {
    Name(String),
    Description(String),
    Disabled(bool),
    MetaModule(bool),
}

impl NodeProperty {
    fn read(&self, node: &StructureNode) -> NodeProperty {
        match self {
            NodeProperty::Name(_) => NodeProperty::Name(node.name.clone()),
            NodeProperty::Description(_) => NodeProperty::Description(node.description.clone()),
            NodeProperty::Disabled(_) => NodeProperty::Disabled(node.disabled),
            NodeProperty::MetaModule(_) => NodeProperty::MetaModule(node.is_meta_module),
        }
    }

    fn write(&self, model: &mut ModelSystemModel, node: NodeId) -> CommandResult<()> {
        let target = model.node_mut(node)?;
        let property = match self {
            NodeProperty::Name(name) => {
                target.name = name.clone();
                Property::Name
            }
            NodeProperty::Description(description) => {
                target.description = description.clone();
                Property::Description
            }
            NodeProperty::Disabled(disabled) => {
                target.disabled = *disabled;
                Property::IsDisabled
            }
            NodeProperty::MetaModule(meta) => {
                target.is_meta_module = *meta;
                Property::IsMetaModule
            }
        };
        target.dirty = true;
        model.notify_property(node, property);
        Ok(())
    }
}

/// Set a name, description, disabled flag or meta-module flag
pub struct SetNodePropertyCommand {
    node: NodeId,
    value: NodeProperty,
    previous: Option<NodeProperty>,
}

impl SetNodePropertyCommand {
    pub fn new(node: NodeId, value: NodeProperty) -> Self {
        Self {
            node,
            value,
            previous: None,
        }
    }
}

impl UndoableCommand for SetNodePropertyCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let node = model
            .node(self.node)
            .ok_or(CommandError::NodeNotFound(self.node))?;
        match self.value {
            NodeProperty::Disabled(true) if node.is_required() => {
                return Err(CommandError::Validation(
                    "You can not disable a module that is required!".to_string(),
                ));
            }
            NodeProperty::MetaModule(true) if node.is_collection() => {
                return Err(CommandError::Validation(
                    "You can not create a meta-module from a collection!".to_string(),
                ));
            }
            _ => {}
        }
        self.previous = Some(self.value.read(node));
        self.value.write(model, self.node)
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.previous
            .as_ref()
            .ok_or_else(|| CommandError::UndoFailed("No previous value stored".into()))?
            .write(model, self.node)
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.value.write(model, self.node)
    }

    fn description(&self) -> String {
        match self.value {
            NodeProperty::Name(_) => "Set Module Name",
            NodeProperty::Description(_) => "Set Module Description",
            NodeProperty::Disabled(true) => "Disable Module",
            NodeProperty::Disabled(false) => "Enable Module",
            NodeProperty::MetaModule(true) => "Compose Meta-Module",
            NodeProperty::MetaModule(false) => "Decompose Meta-Module",
        }
        .to_string()
    }
}

/// Where a parameter value was written
enum ValueTarget {
    Parameter(ParameterId),
    Linked(LinkedParameterId),
}

/// Set a parameter's value, or reset it to its default.
///
/// A parameter that belongs to a linked parameter can not diverge from it;
/// the whole linked parameter is set instead.
pub struct SetParameterValueCommand {
    parameter: ParameterId,
    /// `None` resets to the default value
    value: Option<String>,
    applied: Option<(ValueTarget, String, String)>,
}

impl SetParameterValueCommand {
    pub fn new(parameter: ParameterId, value: impl Into<String>) -> Self {
        Self {
            parameter,
            value: Some(value.into()),
            applied: None,
        }
    }

    pub fn to_default(parameter: ParameterId) -> Self {
        Self {
            parameter,
            value: None,
            applied: None,
        }
    }

    fn write(model: &mut ModelSystemModel, target: &ValueTarget, value: &str) -> CommandResult<String> {
        match target {
            ValueTarget::Parameter(parameter) => model.set_parameter_value(*parameter, value),
            ValueTarget::Linked(linked) => model.set_linked_value(*linked, value),
        }
    }
}

impl UndoableCommand for SetParameterValueCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let parameter = model
            .parameter(self.parameter)
            .ok_or(CommandError::ParameterNotFound(self.parameter))?;
        let value = self
            .value
            .clone()
            .unwrap_or_else(|| parameter.default_value().to_string());
        let target = match model.linked_parameter_of(self.parameter) {
            Some(linked) => ValueTarget::Linked(linked.id()),
            None => ValueTarget::Parameter(self.parameter),
        };
        let previous = Self::write(model, &target, &value)?;
        self.applied = Some((target, previous, value));
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let (target, previous, _) = self
            .applied
            .as_ref()
            .ok_or_else(|| CommandError::UndoFailed("No previous value stored".into()))?;
        Self::write(model, target, previous).map(|_| ())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let (target, _, value) = self
            .applied
            .as_ref()
            .ok_or_else(|| CommandError::RedoFailed("No value stored".into()))?;
        Self::write(model, target, value).map(|_| ())
    }

    fn description(&self) -> String {
        match self.value {
            Some(_) => "Set Parameter Value".to_string(),
            None => "Reset Parameter to Default".to_string(),
        }
    }
}

/// Show or hide a parameter in the quick-parameter list
pub struct SetQuickParameterCommand {
    parameter: ParameterId,
    quick: bool,
    previous: Option<bool>,
}

impl SetQuickParameterCommand {
    pub fn new(parameter: ParameterId, quick: bool) -> Self {
        Self {
            parameter,
            quick,
            previous: None,
        }
    }
}

impl UndoableCommand for SetQuickParameterCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.previous = Some(model.set_parameter_quick(self.parameter, self.quick)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .previous
            .ok_or_else(|| CommandError::UndoFailed("No previous flag stored".into()))?;
        model.set_parameter_quick(self.parameter, previous).map(|_| ())
    }

    fn description(&self) -> String {
        if self.quick {
            "Add Quick Parameter".to_string()
        } else {
            "Remove Quick Parameter".to_string()
        }
    }
}

/// Edit the description of the model system itself
pub struct SetModelSystemDescriptionCommand {
    description: String,
    previous: Option<String>,
}

impl SetModelSystemDescriptionCommand {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            previous: None,
        }
    }
}

impl UndoableCommand for SetModelSystemDescriptionCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.previous = Some(model.set_description(&self.description));
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .previous
            .as_deref()
            .ok_or_else(|| CommandError::UndoFailed("No previous description stored".into()))?;
        model.set_description(previous);
        Ok(())
    }

    fn description(&self) -> String {
        "Set Model System Description".to_string()
    }
}
