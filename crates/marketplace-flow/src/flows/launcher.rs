use tracing::error;

use super::blueprint::FlowConfiguration;
use super::controller::FlowController;
use super::domain::{BusinessCategory, EntityRecord, FlowKind};
use super::error::FlowError;
use super::prelude::PreludeRouter;

/// Entry parameters a caller opens a flow with.
#[derive(Debug, Clone)]
pub struct FlowEntry {
    pub kind: FlowKind,
    pub is_editing: bool,
    pub initial_data: Option<EntityRecord>,
}

impl FlowEntry {
    pub fn create(kind: FlowKind) -> Self {
        Self {
            kind,
            is_editing: false,
            initial_data: None,
        }
    }

    pub fn edit(initial: EntityRecord) -> Self {
        Self {
            kind: initial.kind,
            is_editing: true,
            initial_data: Some(initial),
        }
    }
}

/// What a freshly opened flow starts in.
#[derive(Debug)]
pub enum FlowStart {
    Prelude(PreludeRouter),
    Steps(FlowController),
}

/// Opens flows, deciding between the prelude and the step sequence.
pub fn open_flow(entry: FlowEntry) -> Result<FlowStart, FlowError> {
    let FlowEntry {
        kind,
        is_editing,
        initial_data,
    } = entry;

    if !is_editing {
        if kind.uses_prelude() {
            return Ok(FlowStart::Prelude(PreludeRouter::new(kind)));
        }
        let config = FlowConfiguration::standard(kind, None);
        return Ok(FlowStart::Steps(FlowController::create(config)));
    }

    let initial = initial_data.ok_or_else(|| {
        error!(kind = ?kind, "edit flow opened without initial data");
        FlowError::MissingInitialData(kind)
    })?;

    if initial.kind != kind {
        error!(expected = ?kind, found = ?initial.kind, "edit flow opened over the wrong entity kind");
        return Err(FlowError::KindMismatch {
            expected: kind,
            found: initial.kind,
        });
    }

    let category = edit_category(kind, &initial)?;
    let config = FlowConfiguration::standard(kind, category);
    Ok(FlowStart::Steps(FlowController::edit(config, initial)))
}

/// Finish a prelude: "Get Started" and build the controller it routes to.
pub fn route_prelude(prelude: &mut PreludeRouter) -> Result<FlowController, FlowError> {
    prelude.get_started().map(FlowController::create)
}

fn edit_category(
    kind: FlowKind,
    initial: &EntityRecord,
) -> Result<Option<BusinessCategory>, FlowError> {
    if !kind.uses_prelude() {
        return Ok(None);
    }
    match initial.category() {
        Some(category) => Ok(Some(category)),
        None => {
            error!(kind = ?kind, entity_id = %initial.id, "entity has no recognised category");
            Err(FlowError::UnknownCategory(kind))
        }
    }
}
