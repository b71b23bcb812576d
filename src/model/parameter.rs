// Parameters owned by structural nodes

use crate::model::ids::{ParameterId, ParametersId};
use crate::model::module_type::ModuleType;
use serde::{Deserialize, Serialize};

/// The value type a parameter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    Text,
    Boolean,
    Integer,
    Float,
    Char,
}

impl ParameterKind {
    /// Check that `value` can be parsed as this kind
    pub fn check(&self, value: &str) -> Result<(), String> {
        let ok = match self {
            ParameterKind::Text => true,
            ParameterKind::Boolean => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
            ParameterKind::Integer => value.trim().parse::<i64>().is_ok(),
            ParameterKind::Float => value.trim().parse::<f64>().is_ok(),
            ParameterKind::Char => value.chars().count() == 1,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid {:?} value", value, self))
        }
    }
}

/// One name/value pair on a structural node
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    id: ParameterId,
    name: String,
    description: String,
    kind: ParameterKind,
    pub(crate) value: String,
    default_value: String,
    pub(crate) quick: bool,
}

impl ParameterModel {
    pub fn new(name: impl Into<String>, kind: ParameterKind, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            id: ParameterId::generate(),
            name: name.into(),
            description: String::new(),
            kind,
            default_value: value.clone(),
            value,
            quick: false,
        }
    }

    pub fn id(&self) -> ParameterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn is_quick(&self) -> bool {
        self.quick
    }

    pub fn accepts(&self, value: &str) -> Result<(), String> {
        self.kind
            .check(value)
            .map_err(|e| format!("{}: {}", self.name, e))
    }
}

/// The ordered parameter set of one structural node.
///
/// The set is rebuilt, never patched, when the node's type changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametersModel {
    id: ParametersId,
    parameters: Vec<ParameterModel>,
}

impl ParametersModel {
    pub fn empty() -> Self {
        Self {
            id: ParametersId::generate(),
            parameters: Vec::new(),
        }
    }

    /// Build a fresh parameter set holding the type's defaults
    pub fn for_type(module_type: Option<&ModuleType>) -> Self {
        let parameters = module_type
            .map(|t| {
                t.parameters()
                    .iter()
                    .map(|spec| {
                        let mut parameter =
                            ParameterModel::new(spec.name.clone(), spec.kind, spec.default_value.clone());
                        parameter.description = spec.description.clone();
                        parameter.quick = spec.quick;
                        parameter
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id: ParametersId::generate(),
            parameters,
        }
    }

    pub fn id(&self) -> ParametersId {
        self.id
    }

    pub fn parameters(&self) -> &[ParameterModel] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&ParameterModel> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub(crate) fn by_name_mut(&mut self, name: &str) -> Option<&mut ParameterModel> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    pub fn get(&self, id: ParameterId) -> Option<&ParameterModel> {
        self.parameters.iter().find(|p| p.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: ParameterId) -> Option<&mut ParameterModel> {
        self.parameters.iter_mut().find(|p| p.id == id)
    }
}
