use std::fmt;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::blueprint::FlowConfiguration;
use super::domain::{
    CompletedEntity, EntityRecord, FieldMap, StepId, SubmissionStatus, CATEGORY_FIELD,
};
use super::error::FlowError;
use super::gateway::{GatewayError, PersistenceGateway};
use super::indicator::FlowView;
use super::session::FlowSession;
use super::step::ValidationReport;

/// Caller hooks fired by the controller.
///
/// `on_complete` fires exactly once per flow, `on_close` only on cancellation.
pub trait FlowListener: Send + Sync {
    fn on_complete(&self, completion: &Completion);
    fn on_close(&self);
}

/// Result of a `next()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { from: StepId, to: StepId },
    Blocked(ValidationReport),
    /// `next()` on the final step started a submission.
    Submit(SubmissionTicket),
}

/// Result of `proceed()`, which awaits the submission `next()` may start.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Moved { from: StepId, to: StepId },
    Blocked(ValidationReport),
    Completed(Completion),
}

/// Proof that a submission was started; required to settle it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    id: u64,
    entity: CompletedEntity,
}

impl SubmissionTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn entity(&self) -> &CompletedEntity {
        &self.entity
    }
}

/// What a successful submit hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub entity: CompletedEntity,
    pub record: EntityRecord,
}

/// State machine driving one [`FlowSession`] through a [`FlowConfiguration`].
pub struct FlowController {
    config: FlowConfiguration,
    session: FlowSession,
    listener: Option<Box<dyn FlowListener>>,
    pending_ticket: Option<u64>,
    tickets_issued: u64,
    closed: bool,
}

impl fmt::Debug for FlowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowController")
            .field("kind", &self.config.kind())
            .field("session", &self.session)
            .field("pending_ticket", &self.pending_ticket)
            .field("closed", &self.closed)
            .finish()
    }
}

impl FlowController {
    /// Fresh create-mode flow. The configuration's category, if any, is
    /// recorded into the data so the finished entity carries it.
    pub fn create(config: FlowConfiguration) -> Self {
        let mut seed = FieldMap::new();
        if let Some(category) = config.category() {
            seed.insert(
                CATEGORY_FIELD.to_string(),
                Value::String(category.key().to_string()),
            );
        }
        let session = FlowSession::create(config.total_steps(), seed);
        Self::with_session(config, session)
    }

    /// Edit-mode flow over an existing entity, opened at the first service step.
    pub fn edit(config: FlowConfiguration, initial: EntityRecord) -> Self {
        let mut fields = initial.fields;
        if let Some(category) = config.category() {
            fields.insert(
                CATEGORY_FIELD.to_string(),
                Value::String(category.key().to_string()),
            );
        }
        let session = FlowSession::edit(
            config.total_steps(),
            initial.id,
            fields,
            config.first_service_step(),
        );
        Self::with_session(config, session)
    }

    fn with_session(config: FlowConfiguration, session: FlowSession) -> Self {
        debug!(
            kind = ?config.kind(),
            mode = ?session.mode(),
            total_steps = config.total_steps(),
            "flow session opened"
        );
        Self {
            config,
            session,
            listener: None,
            pending_ticket: None,
            tickets_issued: 0,
            closed: false,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn FlowListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn session(&self) -> &FlowSession {
        &self.session
    }

    pub fn configuration(&self) -> &FlowConfiguration {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Report for the current step; the same predicate `next()` uses.
    pub fn current_report(&self) -> ValidationReport {
        self.config
            .report(self.session.current_step, self.session.data())
            .unwrap_or(ValidationReport {
                step: self.session.current_step,
                issues: Vec::new(),
            })
    }

    pub fn can_continue(&self) -> bool {
        !self.session.is_submitting()
            && self
                .config
                .validate(self.session.current_step, self.session.data())
    }

    pub fn view(&self) -> FlowView {
        FlowView::from_controller(self)
    }

    /// Merge a partial update. The routed category is owned by the
    /// configuration; any write that would change it is refused whole.
    pub fn update_step_data(&mut self, partial: FieldMap) -> Result<(), FlowError> {
        self.guard_mutable("update step data")?;
        if let (Some(category), Some(value)) = (self.config.category(), partial.get(CATEGORY_FIELD))
        {
            if value.as_str() != Some(category.key()) {
                warn!(
                    category = category.key(),
                    attempted = %value,
                    "rejected write to the routed category"
                );
                return Err(FlowError::CategoryLocked(category));
            }
        }
        let changed = self.session.data.merge(partial);
        if changed > 0 {
            debug!(
                step = self.session.current_step,
                changed, "merged step data"
            );
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<Advance, FlowError> {
        self.guard_mutable("advance")?;

        let report = self.current_report();
        if !report.is_satisfied() {
            debug!(
                step = report.step,
                unmet = ?report.unmet_fields(),
                "step gate blocked advance"
            );
            return Ok(Advance::Blocked(report));
        }

        let from = self.session.current_step;
        if from < self.session.total_steps {
            let to = from + 1;
            self.session.current_step = to;
            self.session.highest_reached = self.session.highest_reached.max(to);
            debug!(from, to, "advanced to next step");
            return Ok(Advance::Moved { from, to });
        }

        self.begin_submit().map(Advance::Submit)
    }

    /// Steps back one; a no-op on the first step.
    pub fn previous(&mut self) -> Result<StepId, FlowError> {
        self.guard_mutable("go back")?;
        if self.session.current_step > 1 {
            self.session.current_step -= 1;
            debug!(to = self.session.current_step, "moved to previous step");
        }
        Ok(self.session.current_step)
    }

    pub fn jump_to(&mut self, step: StepId) -> Result<StepId, FlowError> {
        self.guard_mutable("jump")?;
        if step < 1 || step > self.session.highest_reached {
            warn!(
                requested = step,
                highest_reached = self.session.highest_reached,
                "rejected jump beyond progress"
            );
            return Err(FlowError::StepNotReached {
                requested: step,
                highest_reached: self.session.highest_reached,
            });
        }
        self.session.current_step = step;
        debug!(to = step, "jumped to step");
        Ok(step)
    }

    /// Enter `Submitting` and hand out the snapshot to persist.
    ///
    /// Fails without touching the session when not on the final step, when
    /// the final gate is unmet, or when the terminal schema check fails.
    pub fn begin_submit(&mut self) -> Result<SubmissionTicket, FlowError> {
        self.guard_mutable("submit")?;

        if !self.session.is_on_final_step() {
            return Err(FlowError::NotOnFinalStep {
                current: self.session.current_step,
                total: self.session.total_steps,
            });
        }

        let report = self.current_report();
        if !report.is_satisfied() {
            return Err(FlowError::Blocked(report));
        }

        let missing = self.config.schema().missing(self.session.data());
        if !missing.is_empty() {
            error!(
                kind = ?self.config.kind(),
                missing = ?missing,
                "terminal check failed on a flow whose step gates passed"
            );
            return Err(FlowError::IncompleteEntity { missing });
        }

        self.tickets_issued += 1;
        let id = self.tickets_issued;
        self.pending_ticket = Some(id);
        self.session.status = SubmissionStatus::Submitting;
        self.session.submit_attempts += 1;

        let entity = CompletedEntity::new(
            self.config.kind(),
            self.session.entity_id.clone(),
            self.session.data.snapshot(),
        );
        debug!(
            ticket = id,
            attempt = self.session.submit_attempts,
            "submission started"
        );
        Ok(SubmissionTicket { id, entity })
    }

    /// Record the gateway's answer for a ticket from `begin_submit`.
    pub fn settle_submit(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<EntityRecord, GatewayError>,
    ) -> Result<Completion, FlowError> {
        if self.pending_ticket != Some(ticket.id) {
            warn!(ticket = ticket.id, "ignored settlement for stale ticket");
            return Err(FlowError::StaleSubmission { ticket: ticket.id });
        }
        self.pending_ticket = None;

        match outcome {
            Ok(record) => {
                self.session.status = SubmissionStatus::Completed;
                let completion = Completion {
                    entity: ticket.entity,
                    record,
                };
                info!(
                    kind = ?self.config.kind(),
                    entity_id = %completion.record.id,
                    attempts = self.session.submit_attempts,
                    "flow completed"
                );
                if let Some(listener) = &self.listener {
                    listener.on_complete(&completion);
                }
                Ok(completion)
            }
            Err(err) => {
                self.session.status = SubmissionStatus::Failed;
                warn!(
                    kind = ?self.config.kind(),
                    error = %err,
                    "submission failed; data kept for retry"
                );
                Err(FlowError::Persistence(err))
            }
        }
    }

    /// Submit from the final step and await the gateway.
    pub async fn submit<G>(&mut self, gateway: &G) -> Result<Completion, FlowError>
    where
        G: PersistenceGateway + ?Sized,
    {
        let ticket = self.begin_submit()?;
        let outcome = gateway.save(ticket.entity()).await;
        self.settle_submit(ticket, outcome)
    }

    /// `next()`, awaiting the submission it starts on the final step.
    pub async fn proceed<G>(&mut self, gateway: &G) -> Result<Progress, FlowError>
    where
        G: PersistenceGateway + ?Sized,
    {
        match self.next()? {
            Advance::Moved { from, to } => Ok(Progress::Moved { from, to }),
            Advance::Blocked(report) => Ok(Progress::Blocked(report)),
            Advance::Submit(ticket) => {
                let outcome = gateway.save(ticket.entity()).await;
                self.settle_submit(ticket, outcome).map(Progress::Completed)
            }
        }
    }

    /// Cancel the flow. Refused while a submission is in flight.
    pub fn close(&mut self) -> Result<(), FlowError> {
        self.guard_mutable("close")?;
        self.closed = true;
        debug!(kind = ?self.config.kind(), "flow closed");
        if let Some(listener) = &self.listener {
            listener.on_close();
        }
        Ok(())
    }

    fn guard_mutable(&self, operation: &'static str) -> Result<(), FlowError> {
        if self.closed {
            return Err(FlowError::Closed);
        }
        match self.session.status {
            SubmissionStatus::Submitting => {
                warn!(operation, "rejected operation during submission");
                Err(FlowError::SubmissionInFlight { operation })
            }
            SubmissionStatus::Completed => Err(FlowError::Finished),
            SubmissionStatus::Idle | SubmissionStatus::Failed => Ok(()),
        }
    }
}
