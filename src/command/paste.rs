// Copy and paste of structure subtrees
//
// A copy captures a subtree and the linked parameters that reference it. A
// paste validates the whole buffer against the target before touching the
// document, then splices the subtree in and re-attaches the linked
// parameters as one undoable command.

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::messaging::notification::{NotificationKind, Property};
use crate::model::document::ModelSystemModel;
use crate::model::ids::{LinkedParameterId, NodeId, ParameterId};
use crate::model::linked::{Detachment, LinkedParameterModel};
use crate::model::module_type::ModuleType;
use crate::model::parameter::ParametersModel;
use crate::model::path::{parse_path, resolve_parameter};
use crate::model::snapshot::{CopiedModule, CopyBuffer};
use crate::model::structure::StructureNode;
use std::sync::Arc;

const NOT_PASTEABLE: &str = "The copied model system is not pasteable at this location.";

/// Capture the given nodes into a copy buffer
pub fn copy_modules(model: &ModelSystemModel, nodes: &[NodeId]) -> CommandResult<CopyBuffer> {
    let modules = nodes
        .iter()
        .map(|id| {
            let node = model.node(*id).ok_or(CommandError::NodeNotFound(*id))?;
            Ok(CopiedModule::capture(node, model.linked_parameters()))
        })
        .collect::<CommandResult<Vec<_>>>()?;
    Ok(CopyBuffer { modules })
}

/// Decode the text form of a copy buffer
pub fn decode_copy_buffer(text: &str) -> CommandResult<CopyBuffer> {
    CopyBuffer::from_text(text).map_err(|e| {
        CommandError::Validation(format!("Unable to decode the copy buffer.\n{}", e))
    })
}

/// The part of a node a replacing paste swaps out
struct Content {
    module_type: Option<Arc<ModuleType>>,
    children: Vec<StructureNode>,
    parameters: ParametersModel,
    disabled: bool,
    is_meta_module: bool,
}

impl Content {
    fn from_node(node: StructureNode) -> Self {
        Self {
            module_type: node.module_type,
            children: node.children,
            parameters: node.parameters,
            disabled: node.disabled,
            is_meta_module: node.is_meta_module,
        }
    }

    /// Put this content into `target`, returning what it had
    fn swap_into(self, model: &mut ModelSystemModel, target: NodeId) -> CommandResult<Content> {
        let node = model.node_mut(target)?;
        let previous = Content {
            module_type: std::mem::replace(&mut node.module_type, self.module_type),
            children: std::mem::replace(&mut node.children, self.children),
            parameters: std::mem::replace(&mut node.parameters, self.parameters),
            disabled: std::mem::replace(&mut node.disabled, self.disabled),
            is_meta_module: std::mem::replace(&mut node.is_meta_module, self.is_meta_module),
        };
        node.dirty = true;
        model.notify_property(target, Property::Type);
        model.notify(NotificationKind::ChildrenChanged { node: target });
        model.notify(NotificationKind::ParametersChanged { node: target });
        Ok(previous)
    }
}

/// Linked parameter from the buffer with its paths already parsed
struct PendingLink {
    name: String,
    value: String,
    paths: Vec<Vec<String>>,
}

/// A validated paste, not yet applied
struct Plan {
    nodes: Vec<StructureNode>,
    append: bool,
    /// Paths are relative to the pasted collection rather than to the
    /// pasted module
    relative_to_collection: bool,
    links: Vec<PendingLink>,
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Appended {
        collection: NodeId,
        start: usize,
        count: usize,
    },
    Replaced {
        target: NodeId,
    },
}

/// Paste one copied module at a node.
///
/// - A copied collection is appended member by member into a collection
///   with the same element interface.
/// - A single module pasted on a collection becomes a new member.
/// - A single module pasted on any other node replaces that node's content,
///   keeping its name, description and place in the tree.
pub struct PasteCommand {
    target: NodeId,
    module: CopiedModule,
    placement: Option<Placement>,
    /// Replaced content while the paste is applied, pasted content while undone
    swapped: Option<Content>,
    /// Pasted members while undone
    stashed_members: Vec<StructureNode>,
    detached: Vec<Detachment>,
    created: Vec<LinkedParameterId>,
    stashed_linked: Vec<(usize, LinkedParameterModel)>,
    attached: Vec<(LinkedParameterId, ParameterId)>,
}

impl PasteCommand {
    pub fn new(target: NodeId, module: CopiedModule) -> Self {
        Self {
            target,
            module,
            placement: None,
            swapped: None,
            stashed_members: Vec::new(),
            detached: Vec::new(),
            created: Vec::new(),
            stashed_linked: Vec::new(),
            attached: Vec::new(),
        }
    }

    /// Validate the paste without mutating anything
    fn plan(&self, model: &ModelSystemModel) -> CommandResult<Plan> {
        let not_pasteable = || CommandError::Validation(NOT_PASTEABLE.to_string());
        let target = model
            .node(self.target)
            .ok_or(CommandError::NodeNotFound(self.target))?;

        let links = self
            .module
            .linked_parameters
            .iter()
            .map(|lp| {
                let paths = lp
                    .paths
                    .iter()
                    .map(|path| parse_path(path))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| CommandError::Validation(e.to_string()))?;
                Ok(PendingLink {
                    name: lp.name.clone(),
                    value: lp.value.clone(),
                    paths,
                })
            })
            .collect::<CommandResult<Vec<_>>>()?;

        let mut pasted = self
            .module
            .structure
            .instantiate(model.registry().as_ref())
            .map_err(|e| CommandError::Validation(e.to_string()))?;

        let as_member = |mut node: StructureNode| {
            node.required = false;
            node.parent_field_name = target.parent_field_name().to_string();
            node.slot_interface = target.slot_interface().to_string();
            node.dirty = true;
            node
        };
        let assignable_member = |node: &StructureNode| {
            node.module_type()
                .is_some_and(|t| model.can_add_member(self.target, t))
        };

        if pasted.is_collection() {
            if !target.is_collection() || target.slot_interface() != pasted.slot_interface() {
                return Err(not_pasteable());
            }
            let members = std::mem::take(&mut pasted.children);
            if !members.iter().all(assignable_member) {
                return Err(not_pasteable());
            }
            return Ok(Plan {
                nodes: members.into_iter().map(as_member).collect(),
                append: true,
                relative_to_collection: true,
                links,
            });
        }

        if target.is_collection() {
            if !assignable_member(&pasted) {
                return Err(not_pasteable());
            }
            return Ok(Plan {
                nodes: vec![as_member(pasted)],
                append: true,
                relative_to_collection: false,
                links,
            });
        }

        if let Some(module_type) = pasted.module_type() {
            if !model.can_assign(self.target, module_type) {
                return Err(not_pasteable());
            }
        }
        Ok(Plan {
            nodes: vec![pasted],
            append: false,
            relative_to_collection: false,
            links,
        })
    }

    /// Resolve and attach the buffer's linked parameters below `base`
    fn attach_links(
        &mut self,
        model: &mut ModelSystemModel,
        base: NodeId,
        offset: usize,
        links: &[PendingLink],
    ) -> CommandResult<()> {
        for link in links {
            let mut parameters = Vec::new();
            for segments in &link.paths {
                let resolved = model
                    .node(base)
                    .and_then(|node| resolve_parameter(node, segments, offset));
                match resolved {
                    Some(parameter) => parameters.push(parameter),
                    None => log::warn!(
                        "unable to resolve '{}' for linked parameter '{}' while pasting",
                        segments.join("."),
                        link.name
                    ),
                }
            }

            let linked = match model.linked_parameters().by_name(&link.name) {
                Some(existing) => existing.id(),
                None => {
                    let created = LinkedParameterModel::new(&link.name, &link.value);
                    let id = created.id();
                    let index = model.linked_parameters().len();
                    model.insert_linked_parameter(index, created);
                    self.created.push(id);
                    id
                }
            };

            for parameter in parameters {
                let already = model
                    .linked_parameters()
                    .get(linked)
                    .is_some_and(|lp| lp.contains(parameter));
                if already {
                    continue;
                }
                model.link_parameter(linked, parameter, usize::MAX)?;
                self.attached.push((linked, parameter));
            }
        }
        Ok(())
    }

    /// Take the linked parameter changes back out, stashing created ones
    fn detach_links(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        for (linked, parameter) in self.attached.iter().rev() {
            model.unlink_parameter(*linked, *parameter)?;
        }
        for id in self.created.iter().rev() {
            let removed = model.remove_linked_parameter(*id)?;
            self.stashed_linked.push(removed);
        }
        Ok(())
    }

    fn reattach_links(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        while let Some((index, linked)) = self.stashed_linked.pop() {
            model.insert_linked_parameter(index, linked);
        }
        for (linked, parameter) in &self.attached {
            model.link_parameter(*linked, *parameter, usize::MAX)?;
        }
        Ok(())
    }

    fn splice_out(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        match self.placement {
            Some(Placement::Appended {
                collection,
                start,
                count,
            }) => {
                for _ in 0..count {
                    let member = model.take_child(collection, start)?;
                    self.stashed_members.push(member);
                }
            }
            Some(Placement::Replaced { target }) => {
                let original = self
                    .swapped
                    .take()
                    .ok_or_else(|| CommandError::UndoFailed("No replaced module stored".into()))?;
                self.swapped = Some(original.swap_into(model, target)?);
                model.restore_detached(&self.detached);
            }
            None => {
                return Err(CommandError::UndoFailed("The paste was never applied".into()));
            }
        }
        Ok(())
    }

    fn splice_in(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        match self.placement {
            Some(Placement::Appended {
                collection, start, ..
            }) => {
                for (offset, member) in std::mem::take(&mut self.stashed_members).into_iter().enumerate() {
                    model.insert_child(collection, start + offset, member)?;
                }
            }
            Some(Placement::Replaced { target }) => {
                let pasted = self
                    .swapped
                    .take()
                    .ok_or_else(|| CommandError::RedoFailed("No pasted module stored".into()))?;
                self.replace(model, target, pasted)?;
            }
            None => {
                return Err(CommandError::RedoFailed("The paste was never applied".into()));
            }
        }
        Ok(())
    }

    fn replace(&mut self, model: &mut ModelSystemModel, target: NodeId, pasted: Content) -> CommandResult<()> {
        let leaving = model
            .node(target)
            .ok_or(CommandError::NodeNotFound(target))?
            .parameter_ids();
        let original = pasted.swap_into(model, target)?;
        self.detached = model.detach_parameters(&leaving);
        self.swapped = Some(original);
        Ok(())
    }

    /// Best-effort reversal of a partially applied paste
    fn rollback(&mut self, model: &mut ModelSystemModel) {
        if let Err(e) = self.detach_links(model) {
            log::warn!("paste rollback left linked parameters behind: {}", e);
        }
        if let Err(e) = self.splice_out(model) {
            log::warn!("paste rollback could not remove the pasted modules: {}", e);
        }
        self.placement = None;
        self.swapped = None;
        self.stashed_members.clear();
        self.stashed_linked.clear();
        self.detached.clear();
        self.created.clear();
        self.attached.clear();
    }
}

impl UndoableCommand for PasteCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let plan = self.plan(model)?;

        let (base, offset) = if plan.append {
            let start = model
                .node(self.target)
                .map(|n| n.children().len())
                .unwrap_or_default();
            let count = plan.nodes.len();
            let first = plan.nodes.first().map(StructureNode::id);
            for (index, node) in plan.nodes.into_iter().enumerate() {
                model.insert_child(self.target, start + index, node)?;
            }
            self.placement = Some(Placement::Appended {
                collection: self.target,
                start,
                count,
            });
            match (plan.relative_to_collection, first) {
                (false, Some(first)) => (first, 0),
                _ => (self.target, start),
            }
        } else {
            let pasted = plan
                .nodes
                .into_iter()
                .next()
                .ok_or_else(|| CommandError::Validation(NOT_PASTEABLE.to_string()))?;
            self.replace(model, self.target, Content::from_node(pasted))?;
            self.placement = Some(Placement::Replaced {
                target: self.target,
            });
            (self.target, 0)
        };

        if let Err(e) = self.attach_links(model, base, offset, &plan.links) {
            self.rollback(model);
            return Err(e);
        }
        log::debug!(
            "pasted at {}: {} linked parameter(s) created, {} parameter(s) linked",
            self.target,
            self.created.len(),
            self.attached.len()
        );
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.detach_links(model)?;
        self.splice_out(model)
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.splice_in(model)?;
        self.reattach_links(model)
    }

    fn description(&self) -> String {
        "Paste Module".to_string()
    }
}
