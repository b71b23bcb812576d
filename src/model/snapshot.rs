// Serializable snapshots of model system structures
//
// Snapshots are what crosses the boundary to the persisted structure provider
// and what the copy buffer carries. Linked parameter membership is stored as
// paths relative to the snapshot's root node.

use crate::model::linked::{LinkedParameterModel, LinkedParametersModel};
use crate::model::module_type::ModuleRegistry;
use crate::model::parameter::ParametersModel;
use crate::model::path::{PathError, lookup_path, parse_path, resolve_parameter};
use crate::model::structure::StructureNode;
use ron::{from_str as ron_from_str, to_string as ron_to_string};
use serde::{Deserialize, Serialize};

/// Snapshot error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("Unable to find the module type '{0}'")]
    MissingType(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub quick: bool,
}

/// One structural node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_field_name: String,
    pub slot_interface: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub is_collection: bool,
    #[serde(default)]
    pub is_meta_module: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterSnapshot>,
    #[serde(default)]
    pub children: Vec<StructureSnapshot>,
}

impl StructureSnapshot {
    /// Capture a node and everything below it
    pub fn capture(node: &StructureNode) -> Self {
        Self {
            name: node.name().to_string(),
            description: node.description().to_string(),
            parent_field_name: node.parent_field_name().to_string(),
            slot_interface: node.slot_interface().to_string(),
            type_name: node.type_name().map(str::to_string),
            required: node.is_required(),
            disabled: node.is_disabled(),
            is_collection: node.is_collection(),
            is_meta_module: node.is_meta_module(),
            parameters: node
                .parameters()
                .parameters()
                .iter()
                .map(|p| ParameterSnapshot {
                    name: p.name().to_string(),
                    value: p.value().to_string(),
                    quick: p.is_quick(),
                })
                .collect(),
            children: node.children().iter().map(StructureSnapshot::capture).collect(),
        }
    }

    /// Build live nodes from the snapshot.
    ///
    /// Every node gets a fresh identity. Parameters start from the type's
    /// declared defaults and take the stored value where the names match.
    pub fn instantiate(&self, registry: &dyn ModuleRegistry) -> Result<StructureNode, SnapshotError> {
        let module_type = match &self.type_name {
            Some(name) => Some(
                registry
                    .resolve(name)
                    .ok_or_else(|| SnapshotError::MissingType(name.clone()))?,
            ),
            None => None,
        };

        let mut node = StructureNode::new_slot(
            &self.name,
            &self.parent_field_name,
            &self.slot_interface,
            self.required,
        );
        node.set_collection(self.is_collection);
        node.description = self.description.clone();
        node.disabled = self.disabled;
        node.is_meta_module = self.is_meta_module;

        let mut parameters = ParametersModel::for_type(module_type.as_deref());
        for stored in &self.parameters {
            match parameters.by_name_mut(&stored.name) {
                Some(parameter) => {
                    parameter.value = stored.value.clone();
                    parameter.quick = stored.quick;
                }
                None => log::warn!(
                    "dropping parameter '{}' not declared by '{}'",
                    stored.name,
                    self.type_name.as_deref().unwrap_or("<none>")
                ),
            }
        }
        node.parameters = parameters;
        node.module_type = module_type;
        node.children = self
            .children
            .iter()
            .map(|child| child.instantiate(registry))
            .collect::<Result<_, _>>()?;
        Ok(node)
    }
}

/// A linked parameter and the paths of its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedParameterSnapshot {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

impl LinkedParameterSnapshot {
    /// Capture the linked parameters whose members live under `root`.
    ///
    /// Members outside the subtree are left out; linked parameters with no
    /// member inside it are skipped entirely.
    pub fn capture_all(root: &StructureNode, linked: &LinkedParametersModel) -> Vec<Self> {
        linked
            .iter()
            .filter_map(|lp| {
                let paths: Vec<String> = lp
                    .parameters()
                    .iter()
                    .filter_map(|p| lookup_path(root, *p))
                    .collect();
                if paths.is_empty() {
                    return None;
                }
                Some(Self {
                    name: lp.name().to_string(),
                    value: lp.value().to_string(),
                    paths,
                })
            })
            .collect()
    }
}

/// Everything the provider persists for one model system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSystemSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub root: StructureSnapshot,
    #[serde(default)]
    pub linked_parameters: Vec<LinkedParameterSnapshot>,
}

impl ModelSystemSnapshot {
    /// Model system with an unassigned root slot
    pub fn empty(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            root: StructureSnapshot {
                name: name.clone(),
                description: String::new(),
                parent_field_name: "Root".to_string(),
                slot_interface: crate::model::module_type::MODEL_SYSTEM_TEMPLATE.to_string(),
                type_name: None,
                required: true,
                disabled: false,
                is_collection: false,
                is_meta_module: false,
                parameters: Vec::new(),
                children: Vec::new(),
            },
            name,
            description: String::new(),
            linked_parameters: Vec::new(),
        }
    }

    pub fn to_ron(&self) -> Result<String, SnapshotError> {
        ron_to_string(self).map_err(|e| {
            SnapshotError::SerializationError(format!("Failed to serialize to RON: {}", e))
        })
    }

    pub fn from_ron(data: &str) -> Result<Self, SnapshotError> {
        ron_from_str(data).map_err(|e| {
            SnapshotError::SerializationError(format!("Failed to deserialize from RON: {}", e))
        })
    }
}

/// Rebuild linked parameters against a live tree.
///
/// Paths that do not resolve are skipped with a warning; malformed paths are
/// an error.
pub fn instantiate_linked_parameters(
    root: &StructureNode,
    snapshots: &[LinkedParameterSnapshot],
) -> Result<LinkedParametersModel, SnapshotError> {
    let mut linked = LinkedParametersModel::new();
    for snapshot in snapshots {
        let mut model = LinkedParameterModel::new(&snapshot.name, &snapshot.value);
        for path in &snapshot.paths {
            let segments = parse_path(path)?;
            match resolve_parameter(root, &segments, 0) {
                Some(parameter)
                    if linked.containing(parameter).is_none() && !model.contains(parameter) =>
                {
                    model.members.push(parameter)
                }
                Some(_) => log::warn!(
                    "parameter at '{}' is already linked, not adding it to '{}'",
                    path,
                    snapshot.name
                ),
                None => log::warn!(
                    "unable to resolve '{}' for linked parameter '{}'",
                    path,
                    snapshot.name
                ),
            }
        }
        linked.push(model);
    }
    Ok(linked)
}

/// One copied subtree plus the linked parameters that reference it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopiedModule {
    pub structure: StructureSnapshot,
    #[serde(default)]
    pub linked_parameters: Vec<LinkedParameterSnapshot>,
}

impl CopiedModule {
    pub fn capture(node: &StructureNode, linked: &LinkedParametersModel) -> Self {
        Self {
            structure: StructureSnapshot::capture(node),
            linked_parameters: LinkedParameterSnapshot::capture_all(node, linked),
        }
    }
}

/// Clipboard contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopyBuffer {
    pub modules: Vec<CopiedModule>,
}

impl CopyBuffer {
    pub fn to_text(&self) -> Result<String, SnapshotError> {
        ron_to_string(self).map_err(|e| {
            SnapshotError::SerializationError(format!("Failed to serialize to RON: {}", e))
        })
    }

    pub fn from_text(text: &str) -> Result<Self, SnapshotError> {
        ron_from_str(text).map_err(|e| {
            SnapshotError::SerializationError(format!("Failed to deserialize from RON: {}", e))
        })
    }
}
