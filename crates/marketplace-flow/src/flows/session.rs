use super::accumulator::DataAccumulator;
use super::domain::{EntityId, FieldMap, FlowMode, StepId, SubmissionStatus};

/// Runtime state of one open flow.
///
/// Fields are only writable from inside `flows`; the controller is the single
/// place that moves the cursor or the submission status.
#[derive(Debug, Clone)]
pub struct FlowSession {
    pub(super) current_step: StepId,
    pub(super) highest_reached: StepId,
    pub(super) total_steps: StepId,
    pub(super) data: DataAccumulator,
    pub(super) mode: FlowMode,
    pub(super) status: SubmissionStatus,
    pub(super) entity_id: Option<EntityId>,
    pub(super) submit_attempts: u32,
}

impl FlowSession {
    pub(super) fn create(total_steps: StepId, seed: FieldMap) -> Self {
        Self::open(total_steps, FlowMode::Create, None, seed, 1)
    }

    pub(super) fn edit(
        total_steps: StepId,
        entity_id: EntityId,
        fields: FieldMap,
        first_service_step: StepId,
    ) -> Self {
        Self::open(
            total_steps,
            FlowMode::Edit,
            Some(entity_id),
            fields,
            first_service_step,
        )
    }

    fn open(
        total_steps: StepId,
        mode: FlowMode,
        entity_id: Option<EntityId>,
        fields: FieldMap,
        start: StepId,
    ) -> Self {
        let start = start.clamp(1, total_steps.max(1));
        Self {
            current_step: start,
            highest_reached: start,
            total_steps,
            data: DataAccumulator::from_fields(fields),
            mode,
            status: SubmissionStatus::Idle,
            entity_id,
            submit_attempts: 0,
        }
    }

    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    pub fn highest_reached(&self) -> StepId {
        self.highest_reached
    }

    pub fn total_steps(&self) -> StepId {
        self.total_steps
    }

    pub fn data(&self) -> &FieldMap {
        self.data.fields()
    }

    pub fn mode(&self) -> FlowMode {
        self.mode
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn entity_id(&self) -> Option<&EntityId> {
        self.entity_id.as_ref()
    }

    pub fn submit_attempts(&self) -> u32 {
        self.submit_attempts
    }

    pub fn is_on_final_step(&self) -> bool {
        self.current_step == self.total_steps
    }

    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    /// `1 <= current_step <= highest_reached <= total_steps`.
    pub fn upholds_cursor_invariants(&self) -> bool {
        1 <= self.current_step
            && self.current_step <= self.highest_reached
            && self.highest_reached <= self.total_steps
    }
}
