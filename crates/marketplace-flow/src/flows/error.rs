use super::domain::{BusinessCategory, FlowKind, StepId};
use super::gateway::GatewayError;
use super::step::ValidationReport;

/// Errors raised by the flow controller, the prelude and the launcher.
///
/// Everything except `Blocked` and `Persistence` is a contract violation: the
/// caller asked for something its own view should have disabled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("step {} has unmet requirements: {}", .0.step, .0.unmet_fields().join(", "))]
    Blocked(ValidationReport),
    #[error("cannot {operation} while a submission is in flight")]
    SubmissionInFlight { operation: &'static str },
    #[error("step {requested} is out of reach (highest reached is {highest_reached})")]
    StepNotReached {
        requested: StepId,
        highest_reached: StepId,
    },
    #[error("submit is only available on the final step ({current} of {total})")]
    NotOnFinalStep { current: StepId, total: StepId },
    #[error("entity is missing required fields: {}", .missing.join(", "))]
    IncompleteEntity { missing: Vec<&'static str> },
    #[error("submission ticket {ticket} does not match the pending submission")]
    StaleSubmission { ticket: u64 },
    #[error("flow already completed")]
    Finished,
    #[error("flow was closed")]
    Closed,
    #[error("editing a {} requires initial data", .0.label())]
    MissingInitialData(FlowKind),
    #[error("expected a {} entity but received a {}", .expected.label(), .found.label())]
    KindMismatch { expected: FlowKind, found: FlowKind },
    #[error("category is fixed to {} for this flow", .0.label())]
    CategoryLocked(BusinessCategory),
    #[error("{} entity has no recognised category", .0.label())]
    UnknownCategory(FlowKind),
    #[error("prelude is {found}, expected {expected}")]
    PreludeState {
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Persistence(#[from] GatewayError),
}
