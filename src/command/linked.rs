// Linked parameter commands

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::model::document::ModelSystemModel;
use crate::model::ids::{LinkedParameterId, ParameterId};
use crate::model::linked::LinkedParameterModel;

/// Create a linked parameter at the end of the list
pub struct NewLinkedParameterCommand {
    name: String,
    value: String,
    created: Option<LinkedParameterId>,
    index: usize,
    /// The linked parameter while it is out of the document
    stashed: Option<LinkedParameterModel>,
}

impl NewLinkedParameterCommand {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            created: None,
            index: 0,
            stashed: None,
        }
    }

    /// Id of the new linked parameter once the command has run
    pub fn linked_parameter(&self) -> Option<LinkedParameterId> {
        self.created
    }
}

impl UndoableCommand for NewLinkedParameterCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let linked = LinkedParameterModel::new(&self.name, &self.value);
        self.created = Some(linked.id());
        self.index = model.linked_parameters().len();
        model.insert_linked_parameter(self.index, linked);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let id = self
            .created
            .ok_or_else(|| CommandError::UndoFailed("No linked parameter created".into()))?;
        let (_, linked) = model.remove_linked_parameter(id)?;
        self.stashed = Some(linked);
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let linked = self
            .stashed
            .take()
            .ok_or_else(|| CommandError::RedoFailed("No linked parameter stored".into()))?;
        model.insert_linked_parameter(self.index, linked);
        Ok(())
    }

    fn description(&self) -> String {
        "New Linked Parameter".to_string()
    }
}

/// Remove a linked parameter; its members keep their current values
pub struct RemoveLinkedParameterCommand {
    linked: LinkedParameterId,
    removed: Option<(usize, LinkedParameterModel)>,
}

impl RemoveLinkedParameterCommand {
    pub fn new(linked: LinkedParameterId) -> Self {
        Self {
            linked,
            removed: None,
        }
    }
}

impl UndoableCommand for RemoveLinkedParameterCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        if model.linked_parameters().get(self.linked).is_none() {
            return Err(CommandError::Validation(
                "The linked parameter was not found!".to_string(),
            ));
        }
        self.removed = Some(model.remove_linked_parameter(self.linked)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let (index, linked) = self
            .removed
            .take()
            .ok_or_else(|| CommandError::UndoFailed("No linked parameter stored".into()))?;
        model.insert_linked_parameter(index, linked);
        Ok(())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.removed = Some(model.remove_linked_parameter(self.linked)?);
        Ok(())
    }

    fn description(&self) -> String {
        "Remove Linked Parameter".to_string()
    }
}

/// What adding a parameter took away from somewhere else
#[derive(Debug, Clone)]
enum PreviousLink {
    /// The parameter was in another linked parameter at this position
    Linked(LinkedParameterId, usize),
    /// The parameter was free and had this value
    Free(String),
}

/// Add a parameter to a linked parameter.
///
/// A parameter belongs to at most one linked parameter, so it is first taken
/// out of the one it is in. Both halves of that move are one history entry.
pub struct AddParameterToLinkedCommand {
    linked: LinkedParameterId,
    parameter: ParameterId,
    index: usize,
    previous: Option<PreviousLink>,
}

impl AddParameterToLinkedCommand {
    pub fn new(linked: LinkedParameterId, parameter: ParameterId) -> Self {
        Self {
            linked,
            parameter,
            index: 0,
            previous: None,
        }
    }

    /// Detach from the previous owner and attach here. On failure the
    /// detachment is put back.
    fn attach(&self, model: &mut ModelSystemModel, previous: &PreviousLink) -> CommandResult<()> {
        if let PreviousLink::Linked(original, _) = previous {
            model.unlink_parameter(*original, self.parameter)?;
        }
        if let Err(e) = model.link_parameter(self.linked, self.parameter, self.index) {
            if let PreviousLink::Linked(original, index) = previous {
                model.link_parameter(*original, self.parameter, *index)?;
            }
            return Err(e);
        }
        Ok(())
    }
}

impl UndoableCommand for AddParameterToLinkedCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let target = model
            .linked_parameters()
            .get(self.linked)
            .ok_or(CommandError::LinkedParameterNotFound(self.linked))?;
        if target.contains(self.parameter) {
            return Err(CommandError::Validation(
                "The parameter was already contained in the linked parameter!".to_string(),
            ));
        }
        self.index = target.parameters().len();

        let previous = match model.linked_parameter_of(self.parameter) {
            Some(original) => {
                let index = original.position(self.parameter).unwrap_or_default();
                PreviousLink::Linked(original.id(), index)
            }
            None => PreviousLink::Free(
                model
                    .parameter(self.parameter)
                    .ok_or(CommandError::ParameterNotFound(self.parameter))?
                    .value()
                    .to_string(),
            ),
        };
        self.attach(model, &previous)?;
        self.previous = Some(previous);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .previous
            .clone()
            .ok_or_else(|| CommandError::UndoFailed("No previous link stored".into()))?;
        model.unlink_parameter(self.linked, self.parameter)?;
        match previous {
            PreviousLink::Linked(original, index) => {
                model.link_parameter(original, self.parameter, index)
            }
            PreviousLink::Free(value) => model.set_parameter_value(self.parameter, &value).map(|_| ()),
        }
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .previous
            .clone()
            .ok_or_else(|| CommandError::RedoFailed("No previous link stored".into()))?;
        self.attach(model, &previous)
    }

    fn description(&self) -> String {
        "Add Parameter to Linked Parameter".to_string()
    }
}

/// Take a parameter out of a linked parameter; it keeps the linked value
pub struct RemoveParameterFromLinkedCommand {
    linked: LinkedParameterId,
    parameter: ParameterId,
    index: Option<usize>,
}

impl RemoveParameterFromLinkedCommand {
    pub fn new(linked: LinkedParameterId, parameter: ParameterId) -> Self {
        Self {
            linked,
            parameter,
            index: None,
        }
    }
}

impl UndoableCommand for RemoveParameterFromLinkedCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.index = Some(model.unlink_parameter(self.linked, self.parameter)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let index = self
            .index
            .ok_or_else(|| CommandError::UndoFailed("No position stored".into()))?;
        model.link_parameter(self.linked, self.parameter, index)
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.execute(model)
    }

    fn description(&self) -> String {
        "Remove Parameter from Linked Parameter".to_string()
    }
}

/// Set the shared value of a linked parameter and all of its members
pub struct SetLinkedParameterValueCommand {
    linked: LinkedParameterId,
    value: String,
    previous: Option<String>,
}

impl SetLinkedParameterValueCommand {
    pub fn new(linked: LinkedParameterId, value: impl Into<String>) -> Self {
        Self {
            linked,
            value: value.into(),
            previous: None,
        }
    }
}

impl UndoableCommand for SetLinkedParameterValueCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.previous = Some(model.set_linked_value(self.linked, &self.value)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .previous
            .as_deref()
            .ok_or_else(|| CommandError::UndoFailed("No previous value stored".into()))?;
        model.set_linked_value(self.linked, previous).map(|_| ())
    }

    fn redo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        model.set_linked_value(self.linked, &self.value).map(|_| ())
    }

    fn description(&self) -> String {
        "Set Linked Parameter Value".to_string()
    }
}

pub struct SetLinkedParameterNameCommand {
    linked: LinkedParameterId,
    name: String,
    previous: Option<String>,
}

impl SetLinkedParameterNameCommand {
    pub fn new(linked: LinkedParameterId, name: impl Into<String>) -> Self {
        Self {
            linked,
            name: name.into(),
            previous: None,
        }
    }
}

impl UndoableCommand for SetLinkedParameterNameCommand {
    fn execute(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        self.previous = Some(model.rename_linked_parameter(self.linked, &self.name)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut ModelSystemModel) -> CommandResult<()> {
        let previous = self
            .previous
            .as_deref()
            .ok_or_else(|| CommandError::UndoFailed("No previous name stored".into()))?;
        model.rename_linked_parameter(self.linked, previous).map(|_| ())
    }

    fn description(&self) -> String {
        "Set Name".to_string()
    }
}
