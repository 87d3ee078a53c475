//! Stepped data-collection flows: business cards, profile cards, listings and
//! seller onboarding all run through one controller.

pub mod accumulator;
pub mod blueprint;
pub mod controller;
pub mod domain;
pub mod draft;
pub mod error;
pub mod gateway;
pub mod indicator;
pub mod launcher;
pub mod prelude;
pub mod router;
pub mod service;
pub mod session;
pub mod step;

#[cfg(test)]
mod tests;

pub use accumulator::DataAccumulator;
pub use blueprint::{ConfigurationError, FlowConfiguration, RequiredFieldSet};
pub use controller::{Advance, Completion, FlowController, FlowListener, Progress, SubmissionTicket};
pub use domain::{
    BusinessCategory, CompletedEntity, EntityId, EntityRecord, FieldMap, FlowKind, FlowMode,
    StepId, SubmissionStatus,
};
pub use draft::{DraftError, DraftKeys, DraftMirror, DraftStore, MirroredGateway};
pub use error::FlowError;
pub use gateway::{GatewayError, PersistenceGateway};
pub use indicator::{FlowView, IndicatorState, Navigation, StepIndicator};
pub use launcher::{open_flow, route_prelude, FlowEntry, FlowStart};
pub use prelude::{PreludeRouter, PreludeState, PreludeView};
pub use router::flow_router;
pub use service::{FlowProgress, FlowServiceError, FlowSessionService, FlowSessionView, SessionId};
pub use session::FlowSession;
pub use step::{FieldIssue, FieldRequirement, FieldRule, IssueKind, StepDescriptor, ValidationReport};
