use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field name to value mapping accumulated across steps.
pub type FieldMap = Map<String, Value>;

/// One-based, dense step identifier.
pub type StepId = usize;

/// Field under which the prelude records the chosen business category.
pub const CATEGORY_FIELD: &str = "category";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    BusinessCard,
    ProfileCard,
    Listing,
    SellerOnboarding,
}

impl FlowKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::BusinessCard,
            Self::ProfileCard,
            Self::Listing,
            Self::SellerOnboarding,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BusinessCard => "Business Card",
            Self::ProfileCard => "Profile Card",
            Self::Listing => "Business Listing",
            Self::SellerOnboarding => "Seller Onboarding",
        }
    }

    /// Lower camel-case stem used to build draft store keys.
    pub const fn draft_stem(self) -> &'static str {
        match self {
            Self::BusinessCard => "business",
            Self::ProfileCard => "profile",
            Self::Listing => "listing",
            Self::SellerOnboarding => "seller",
        }
    }

    /// Whether a create-mode flow of this kind opens with the category prelude.
    pub const fn uses_prelude(self) -> bool {
        !matches!(self, Self::ProfileCard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    Catering,
    Retail,
    Technology,
    Hospitality,
    ProfessionalServices,
    Manufacturing,
    HealthAndWellness,
    Construction,
}

impl BusinessCategory {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Catering,
            Self::Retail,
            Self::Technology,
            Self::Hospitality,
            Self::ProfessionalServices,
            Self::Manufacturing,
            Self::HealthAndWellness,
            Self::Construction,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Catering => "Catering",
            Self::Retail => "Retail",
            Self::Technology => "Technology",
            Self::Hospitality => "Hospitality",
            Self::ProfessionalServices => "Professional Services",
            Self::Manufacturing => "Manufacturing",
            Self::HealthAndWellness => "Health & Wellness",
            Self::Construction => "Construction",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Catering => "catering",
            Self::Retail => "retail",
            Self::Technology => "technology",
            Self::Hospitality => "hospitality",
            Self::ProfessionalServices => "professional_services",
            Self::Manufacturing => "manufacturing",
            Self::HealthAndWellness => "health_and_wellness",
            Self::Construction => "construction",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|category| category.key() == normalized)
    }

    /// Reads the category recorded on an entity, if any.
    pub fn recorded_in(fields: &FieldMap) -> Option<Self> {
        fields
            .get(CATEGORY_FIELD)
            .and_then(Value::as_str)
            .and_then(Self::from_key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Completed,
    Failed,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Submitting => "Submitting",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted entity as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: FlowKind,
    pub fields: FieldMap,
    pub updated_at: DateTime<Utc>,
}

impl EntityRecord {
    pub fn category(&self) -> Option<BusinessCategory> {
        BusinessCategory::recorded_in(&self.fields)
    }
}

/// Snapshot of a session's data that passed the terminal validity check.
///
/// Only the controller constructs these, at submit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedEntity {
    kind: FlowKind,
    id: Option<EntityId>,
    fields: FieldMap,
}

impl CompletedEntity {
    pub(crate) fn new(kind: FlowKind, id: Option<EntityId>, fields: FieldMap) -> Self {
        Self { kind, id, fields }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Identifier of the entity being edited; `None` for newly created entities.
    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn category(&self) -> Option<BusinessCategory> {
        BusinessCategory::recorded_in(&self.fields)
    }
}

/// Whether a value counts as filled in for presence checks.
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}
