use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::controller::{Advance, FlowController, SubmissionTicket};
use super::domain::{BusinessCategory, EntityId, EntityRecord, FieldMap, FlowKind, StepId};
use super::error::FlowError;
use super::gateway::{GatewayError, PersistenceGateway};
use super::indicator::FlowView;
use super::launcher::{open_flow, route_prelude, FlowEntry, FlowStart};
use super::prelude::{PreludeRouter, PreludeView};
use super::step::ValidationReport;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("flow-{id:06}"))
}

#[derive(Debug)]
enum OpenFlow {
    Prelude(PreludeRouter),
    Steps(FlowController),
}

/// Serializable snapshot of an open flow, in whichever phase it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSessionView {
    pub session_id: SessionId,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prelude: Option<PreludeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowView>,
}

impl FlowSessionView {
    fn of(session_id: &SessionId, open: &OpenFlow) -> Self {
        match open {
            OpenFlow::Prelude(prelude) => Self {
                session_id: session_id.clone(),
                phase: "prelude",
                prelude: Some(prelude.view()),
                flow: None,
            },
            OpenFlow::Steps(controller) => Self {
                session_id: session_id.clone(),
                phase: "steps",
                prelude: None,
                flow: Some(controller.view()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlowProgress {
    Active(FlowSessionView),
    Completed {
        session_id: SessionId,
        entity: EntityRecord,
    },
}

/// Owns every open flow and routes commands to it.
///
/// Submissions are split around the gateway call: the session is marked
/// `Submitting` under the lock, the lock is released for `save`, and the
/// outcome is settled afterwards. Requests arriving in between see the
/// in-flight status and are rejected by the controller.
pub struct FlowSessionService<G> {
    gateway: Arc<G>,
    sessions: Mutex<HashMap<SessionId, OpenFlow>>,
    max_open: usize,
}

impl<G> FlowSessionService<G>
where
    G: PersistenceGateway + 'static,
{
    pub fn new(gateway: Arc<G>, max_open: usize) -> Self {
        Self {
            gateway,
            sessions: Mutex::new(HashMap::new()),
            max_open,
        }
    }

    pub fn open_sessions(&self) -> Result<usize, FlowServiceError> {
        Ok(self.lock()?.len())
    }

    pub fn open(&self, entry: FlowEntry) -> Result<FlowSessionView, FlowServiceError> {
        let kind = entry.kind;
        let mode = if entry.is_editing { "edit" } else { "create" };
        let open = match open_flow(entry)? {
            FlowStart::Prelude(prelude) => OpenFlow::Prelude(prelude),
            FlowStart::Steps(controller) => OpenFlow::Steps(controller),
        };

        let mut sessions = self.lock()?;
        if sessions.len() >= self.max_open {
            return Err(FlowServiceError::CapacityReached {
                limit: self.max_open,
            });
        }
        let session_id = next_session_id();
        let view = FlowSessionView::of(&session_id, &open);
        sessions.insert(session_id.clone(), open);
        info!(session = %session_id, kind = ?kind, mode, "flow opened");
        Ok(view)
    }

    pub fn open_create(&self, kind: FlowKind) -> Result<FlowSessionView, FlowServiceError> {
        self.open(FlowEntry::create(kind))
    }

    /// Load an entity through the gateway and open an edit flow over it.
    pub async fn open_edit(
        &self,
        kind: FlowKind,
        entity_id: &EntityId,
    ) -> Result<FlowSessionView, FlowServiceError> {
        let record = self.gateway.load(kind, entity_id).await?;
        self.open(FlowEntry {
            kind,
            is_editing: true,
            initial_data: Some(record),
        })
    }

    pub fn view(&self, id: &SessionId) -> Result<FlowSessionView, FlowServiceError> {
        let sessions = self.lock()?;
        let open = sessions
            .get(id)
            .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
        Ok(FlowSessionView::of(id, open))
    }

    pub fn select_category(
        &self,
        id: &SessionId,
        category: BusinessCategory,
    ) -> Result<FlowSessionView, FlowServiceError> {
        self.with_prelude(id, |prelude| prelude.select(category))
    }

    pub fn reselect(&self, id: &SessionId) -> Result<FlowSessionView, FlowServiceError> {
        self.with_prelude(id, PreludeRouter::reselect)
    }

    /// "Get Started": replace the prelude with the controller it routes to.
    pub fn get_started(&self, id: &SessionId) -> Result<FlowSessionView, FlowServiceError> {
        let mut sessions = self.lock()?;
        let open = sessions
            .get_mut(id)
            .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
        let controller = match open {
            OpenFlow::Prelude(prelude) => route_prelude(prelude)?,
            OpenFlow::Steps(_) => {
                return Err(FlowServiceError::WrongPhase {
                    session: id.clone(),
                    expected: "prelude",
                })
            }
        };
        *open = OpenFlow::Steps(controller);
        debug!(session = %id, "prelude routed to steps");
        Ok(FlowSessionView::of(id, open))
    }

    pub fn update_data(
        &self,
        id: &SessionId,
        fields: FieldMap,
    ) -> Result<FlowSessionView, FlowServiceError> {
        self.with_controller(id, |controller| controller.update_step_data(fields))
    }

    pub fn previous(&self, id: &SessionId) -> Result<FlowSessionView, FlowServiceError> {
        self.with_controller(id, |controller| controller.previous().map(|_| ()))
    }

    pub fn jump(&self, id: &SessionId, step: StepId) -> Result<FlowSessionView, FlowServiceError> {
        self.with_controller(id, |controller| controller.jump_to(step).map(|_| ()))
    }

    /// Advance, or submit when on the final step.
    pub async fn next(&self, id: &SessionId) -> Result<FlowProgress, FlowServiceError> {
        let ticket = {
            let mut sessions = self.lock()?;
            let open = sessions
                .get_mut(id)
                .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
            let controller = steps_of(id, open)?;
            match controller.next()? {
                Advance::Moved { .. } => {
                    return Ok(FlowProgress::Active(FlowSessionView::of(id, open)))
                }
                Advance::Blocked(report) => return Err(FlowServiceError::Validation(report)),
                Advance::Submit(ticket) => ticket,
            }
        };
        self.settle(id, ticket).await
    }

    pub async fn submit(&self, id: &SessionId) -> Result<FlowProgress, FlowServiceError> {
        let ticket = {
            let mut sessions = self.lock()?;
            let open = sessions
                .get_mut(id)
                .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
            steps_of(id, open)?.begin_submit()?
        };
        self.settle(id, ticket).await
    }

    /// Cancel and discard a flow. Refused while its submission is in flight.
    pub fn close(&self, id: &SessionId) -> Result<(), FlowServiceError> {
        let mut sessions = self.lock()?;
        let open = sessions
            .get_mut(id)
            .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
        if let OpenFlow::Steps(controller) = open {
            controller.close()?;
        }
        sessions.remove(id);
        info!(session = %id, "flow closed");
        Ok(())
    }

    async fn settle(
        &self,
        id: &SessionId,
        ticket: SubmissionTicket,
    ) -> Result<FlowProgress, FlowServiceError> {
        let outcome = self.gateway.save(ticket.entity()).await;

        let mut sessions = self.lock()?;
        let open = sessions
            .get_mut(id)
            .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
        let completion = steps_of(id, open)?.settle_submit(ticket, outcome)?;
        sessions.remove(id);

        Ok(FlowProgress::Completed {
            session_id: id.clone(),
            entity: completion.record,
        })
    }

    fn with_prelude<F>(&self, id: &SessionId, op: F) -> Result<FlowSessionView, FlowServiceError>
    where
        F: FnOnce(&mut PreludeRouter) -> Result<(), FlowError>,
    {
        let mut sessions = self.lock()?;
        let open = sessions
            .get_mut(id)
            .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
        match open {
            OpenFlow::Prelude(prelude) => op(prelude)?,
            OpenFlow::Steps(_) => {
                return Err(FlowServiceError::WrongPhase {
                    session: id.clone(),
                    expected: "prelude",
                })
            }
        }
        Ok(FlowSessionView::of(id, open))
    }

    fn with_controller<F>(&self, id: &SessionId, op: F) -> Result<FlowSessionView, FlowServiceError>
    where
        F: FnOnce(&mut FlowController) -> Result<(), FlowError>,
    {
        let mut sessions = self.lock()?;
        let open = sessions
            .get_mut(id)
            .ok_or_else(|| FlowServiceError::NotFound(id.clone()))?;
        op(steps_of(id, open)?)?;
        Ok(FlowSessionView::of(id, open))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, OpenFlow>>, FlowServiceError> {
        self.sessions
            .lock()
            .map_err(|_| FlowServiceError::Unavailable("session store poisoned".to_string()))
    }
}

fn steps_of<'a>(
    id: &SessionId,
    open: &'a mut OpenFlow,
) -> Result<&'a mut FlowController, FlowServiceError> {
    match open {
        OpenFlow::Steps(controller) => Ok(controller),
        OpenFlow::Prelude(_) => Err(FlowServiceError::WrongPhase {
            session: id.clone(),
            expected: "steps",
        }),
    }
}

/// Error raised by the flow session service.
#[derive(Debug, thiserror::Error)]
pub enum FlowServiceError {
    #[error("flow session {0} not found")]
    NotFound(SessionId),
    #[error("step {} has unmet requirements", .0.step)]
    Validation(ValidationReport),
    #[error("flow session {session} is not in the {expected} phase")]
    WrongPhase {
        session: SessionId,
        expected: &'static str,
    },
    #[error("too many open flows (limit {limit})")]
    CapacityReached { limit: usize },
    #[error("flow service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
