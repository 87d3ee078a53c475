//! Render-ready projection of a flow for the step sidebar, header and footer.
//!
//! Every flag here is derived from the same predicates the controller
//! enforces, so a UI that follows the view never issues a rejected command.

use serde::Serialize;

use super::controller::FlowController;
use super::domain::{
    BusinessCategory, EntityId, FieldMap, FlowKind, FlowMode, StepId, SubmissionStatus,
};
use super::step::ValidationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    Current,
    Visited,
    Locked,
}

impl IndicatorState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Visited => "Visited",
            Self::Locked => "Locked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepIndicator {
    pub id: StepId,
    pub key: &'static str,
    pub title: String,
    pub icon: &'static str,
    pub state: IndicatorState,
    /// Clicking the indicator maps to `jump_to(id)` and will be accepted.
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub can_go_back: bool,
    pub can_continue: bool,
    pub continue_label: &'static str,
    pub submitting: bool,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowView {
    pub kind: FlowKind,
    pub kind_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<BusinessCategory>,
    pub mode: FlowMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    pub current_step: StepId,
    pub highest_reached: StepId,
    pub total_steps: StepId,
    pub status: SubmissionStatus,
    pub status_label: &'static str,
    pub header: String,
    pub steps: Vec<StepIndicator>,
    pub navigation: Navigation,
    pub data: FieldMap,
}

impl FlowView {
    pub fn from_controller(controller: &FlowController) -> Self {
        let config = controller.configuration();
        let session = controller.session();
        let submitting = session.is_submitting();

        let steps = config
            .steps()
            .iter()
            .map(|step| {
                let state = if step.id == session.current_step() {
                    IndicatorState::Current
                } else if step.id <= session.highest_reached() {
                    IndicatorState::Visited
                } else {
                    IndicatorState::Locked
                };
                StepIndicator {
                    id: step.id,
                    key: step.key,
                    title: step.title.clone(),
                    icon: step.icon,
                    state,
                    selectable: state == IndicatorState::Visited && !submitting,
                }
            })
            .collect();

        let title = config
            .step(session.current_step())
            .map(|step| step.title.as_str())
            .unwrap_or_default();
        let header = format!(
            "{} · Step {} of {}: {}",
            config.kind().label(),
            session.current_step(),
            session.total_steps(),
            title
        );

        let navigation = Navigation {
            can_go_back: session.current_step() > 1 && !submitting,
            can_continue: controller.can_continue(),
            continue_label: continue_label(
                session.is_on_final_step(),
                session.status(),
                session.mode(),
            ),
            submitting,
            report: controller.current_report(),
        };

        Self {
            kind: config.kind(),
            kind_label: config.kind().label(),
            category: config.category(),
            mode: session.mode(),
            entity_id: session.entity_id().cloned(),
            current_step: session.current_step(),
            highest_reached: session.highest_reached(),
            total_steps: session.total_steps(),
            status: session.status(),
            status_label: session.status().label(),
            header,
            steps,
            navigation,
            data: session.data().clone(),
        }
    }
}

fn continue_label(final_step: bool, status: SubmissionStatus, mode: FlowMode) -> &'static str {
    match (final_step, status, mode) {
        (true, SubmissionStatus::Submitting, _) => "Saving…",
        (true, SubmissionStatus::Failed, _) => "Retry",
        (true, _, FlowMode::Edit) => "Save changes",
        (true, _, FlowMode::Create) => "Submit",
        (false, _, _) => "Continue",
    }
}
