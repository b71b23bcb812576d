// Linked parameters: named aggregates forcing several parameters to share one value

use crate::model::ids::{LinkedParameterId, ParameterId};

/// A named value shared by an ordered set of parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedParameterModel {
    id: LinkedParameterId,
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) members: Vec<ParameterId>,
}

impl LinkedParameterModel {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: LinkedParameterId::generate(),
            name: name.into(),
            value: value.into(),
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> LinkedParameterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Member parameters in order
    pub fn parameters(&self) -> &[ParameterId] {
        &self.members
    }

    pub fn contains(&self, parameter: ParameterId) -> bool {
        self.members.contains(&parameter)
    }

    pub fn position(&self, parameter: ParameterId) -> Option<usize> {
        self.members.iter().position(|p| *p == parameter)
    }
}

/// A membership removed from a linked parameter, kept so it can be restored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detachment {
    pub linked: LinkedParameterId,
    pub index: usize,
    pub parameter: ParameterId,
}

/// The document-wide, ordered set of linked parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedParametersModel {
    items: Vec<LinkedParameterModel>,
}

impl LinkedParametersModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkedParameterModel> {
        self.items.iter()
    }

    pub fn get(&self, id: LinkedParameterId) -> Option<&LinkedParameterModel> {
        self.items.iter().find(|lp| lp.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: LinkedParameterId) -> Option<&mut LinkedParameterModel> {
        self.items.iter_mut().find(|lp| lp.id() == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&LinkedParameterModel> {
        self.items.iter().find(|lp| lp.name == name)
    }

    pub fn index_of(&self, id: LinkedParameterId) -> Option<usize> {
        self.items.iter().position(|lp| lp.id() == id)
    }

    /// The linked parameter a parameter currently belongs to
    pub fn containing(&self, parameter: ParameterId) -> Option<&LinkedParameterModel> {
        self.items.iter().find(|lp| lp.contains(parameter))
    }

    pub(crate) fn insert(&mut self, index: usize, linked: LinkedParameterModel) {
        let index = index.min(self.items.len());
        self.items.insert(index, linked);
    }

    pub(crate) fn push(&mut self, linked: LinkedParameterModel) -> usize {
        self.items.push(linked);
        self.items.len() - 1
    }

    pub(crate) fn remove(&mut self, id: LinkedParameterId) -> Option<(usize, LinkedParameterModel)> {
        let index = self.index_of(id)?;
        Some((index, self.items.remove(index)))
    }

    /// Remove every membership of the given parameters.
    ///
    /// The returned detachments are in removal order; pass them to
    /// [`LinkedParametersModel::restore`] to undo.
    pub(crate) fn detach_all(&mut self, parameters: &[ParameterId]) -> Vec<Detachment> {
        let mut detached = Vec::new();
        for linked in &mut self.items {
            let mut index = 0;
            while index < linked.members.len() {
                let parameter = linked.members[index];
                if parameters.contains(&parameter) {
                    linked.members.remove(index);
                    detached.push(Detachment {
                        linked: linked.id,
                        index,
                        parameter,
                    });
                } else {
                    index += 1;
                }
            }
        }
        detached
    }

    /// Re-insert detached memberships in reverse removal order
    pub(crate) fn restore(&mut self, detached: &[Detachment]) {
        for detachment in detached.iter().rev() {
            if let Some(linked) = self.get_mut(detachment.linked) {
                let index = detachment.index.min(linked.members.len());
                linked.members.insert(index, detachment.parameter);
            }
        }
    }
}
