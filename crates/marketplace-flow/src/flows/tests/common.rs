use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::flows::controller::{Completion, FlowController, FlowListener};
use crate::flows::domain::{
    BusinessCategory, CompletedEntity, EntityId, EntityRecord, FieldMap, FlowKind,
};
use crate::flows::draft::{DraftError, DraftStore};
use crate::flows::gateway::{GatewayError, PersistenceGateway};
use crate::flows::{FlowConfiguration, FlowSessionService};

pub(super) fn fields(value: Value) -> FieldMap {
    value.as_object().cloned().expect("object literal")
}

pub(super) fn years_data() -> FieldMap {
    fields(json!({ "yearsInBusiness": 5, "foundedYear": 2019 }))
}

pub(super) fn info_data() -> FieldMap {
    fields(json!({
        "name": "Acme Catering",
        "location": "Brussels",
        "description": "Seasonal catering for offices and weddings.",
        "teamSize": "1-5",
    }))
}

pub(super) fn business_config() -> FlowConfiguration {
    FlowConfiguration::standard(FlowKind::BusinessCard, Some(BusinessCategory::Catering))
}

/// Controller parked on the review step with every field filled in.
pub(super) fn controller_on_review() -> FlowController {
    let mut controller = FlowController::create(business_config());
    controller.update_step_data(years_data()).expect("merge years");
    controller.next().expect("advance to info");
    controller.update_step_data(info_data()).expect("merge info");
    controller.next().expect("advance to review");
    assert_eq!(controller.session().current_step(), 3);
    controller
}

pub(super) fn existing_business() -> EntityRecord {
    let mut data = years_data();
    data.extend(info_data());
    data.insert("category".to_string(), json!("catering"));
    EntityRecord {
        id: EntityId("biz-42".to_string()),
        kind: FlowKind::BusinessCard,
        fields: data,
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
pub(super) struct MemoryGateway {
    records: Mutex<HashMap<EntityId, EntityRecord>>,
    saved: Mutex<Vec<CompletedEntity>>,
    failures_remaining: AtomicUsize,
    sequence: AtomicU64,
}

impl MemoryGateway {
    pub(super) fn with_record(record: EntityRecord) -> Self {
        let gateway = Self::default();
        gateway
            .records
            .lock()
            .expect("records mutex poisoned")
            .insert(record.id.clone(), record);
        gateway
    }

    pub(super) fn failing(times: usize) -> Self {
        let gateway = Self::default();
        gateway.failures_remaining.store(times, Ordering::SeqCst);
        gateway
    }

    pub(super) fn saved(&self) -> Vec<CompletedEntity> {
        self.saved.lock().expect("saved mutex poisoned").clone()
    }

    pub(super) fn save_calls(&self) -> usize {
        self.saved().len()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn save(&self, entity: &CompletedEntity) -> Result<EntityRecord, GatewayError> {
        self.saved
            .lock()
            .expect("saved mutex poisoned")
            .push(entity.clone());

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(GatewayError::Unavailable("upstream timed out".to_string()));
        }

        let id = match entity.id() {
            Some(id) => id.clone(),
            None => EntityId(format!(
                "ent-{}",
                self.sequence.fetch_add(1, Ordering::SeqCst) + 1
            )),
        };
        let record = EntityRecord {
            id: id.clone(),
            kind: entity.kind(),
            fields: entity.fields().clone(),
            updated_at: Utc::now(),
        };
        self.records
            .lock()
            .expect("records mutex poisoned")
            .insert(id, record.clone());
        Ok(record)
    }

    async fn load(&self, kind: FlowKind, id: &EntityId) -> Result<EntityRecord, GatewayError> {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .get(id)
            .filter(|record| record.kind == kind)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }
}

/// Gateway whose `save` parks until the test releases it.
#[derive(Default)]
pub(super) struct GatedGateway {
    pub(super) entered: Notify,
    pub(super) release: Notify,
    inner: MemoryGateway,
}

#[async_trait]
impl PersistenceGateway for GatedGateway {
    async fn save(&self, entity: &CompletedEntity) -> Result<EntityRecord, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.save(entity).await
    }

    async fn load(&self, kind: FlowKind, id: &EntityId) -> Result<EntityRecord, GatewayError> {
        self.inner.load(kind, id).await
    }
}

#[derive(Default)]
pub(super) struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: bool,
}

impl MemoryDraftStore {
    pub(super) fn rejecting() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    pub(super) fn entry(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("draft mutex poisoned")
            .get(key)
            .cloned()
    }

    pub(super) fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("draft mutex poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entry(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), DraftError> {
        if self.reject_writes {
            return Err(DraftError::Unavailable("quota exceeded".to_string()));
        }
        self.entries
            .lock()
            .expect("draft mutex poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftError> {
        self.entries
            .lock()
            .expect("draft mutex poisoned")
            .remove(key);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingListener {
    pub(super) completions: Arc<Mutex<Vec<Completion>>>,
    pub(super) closes: Arc<AtomicUsize>,
}

impl RecordingListener {
    pub(super) fn completion_count(&self) -> usize {
        self.completions.lock().expect("listener mutex poisoned").len()
    }

    pub(super) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl FlowListener for RecordingListener {
    fn on_complete(&self, completion: &Completion) {
        self.completions
            .lock()
            .expect("listener mutex poisoned")
            .push(completion.clone());
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub(super) fn build_service() -> (Arc<FlowSessionService<MemoryGateway>>, Arc<MemoryGateway>) {
    let gateway = Arc::new(MemoryGateway::with_record(existing_business()));
    let service = Arc::new(FlowSessionService::new(gateway.clone(), 16));
    (service, gateway)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
