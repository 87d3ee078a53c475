use serde::Serialize;
use serde_json::Value;

use super::domain::{is_filled, BusinessCategory, FieldMap, FlowKind, StepId, CATEGORY_FIELD};
use super::step::{FieldRequirement, StepDescriptor, ValidationReport};

const TEAM_SIZES: &[&str] = &["1-5", "6-20", "21-50", "51-200", "200+"];
const SELLING_TIMELINES: &[&str] = &["immediately", "3-6 months", "6-12 months", "exploring"];

/// Fields an entity must carry before it can be handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredFieldSet {
    fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<BusinessCategory>,
}

impl RequiredFieldSet {
    /// Union of every step's field names, in step order, without duplicates.
    pub fn from_steps(steps: &[StepDescriptor]) -> Self {
        let mut fields: Vec<&'static str> = Vec::new();
        for name in steps.iter().flat_map(StepDescriptor::field_names) {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        Self {
            fields,
            category: None,
        }
    }

    /// Also require `category` to hold exactly the routed category's key.
    pub fn pinned_to(mut self, category: Option<BusinessCategory>) -> Self {
        if category.is_some() && !self.fields.contains(&CATEGORY_FIELD) {
            self.fields.push(CATEGORY_FIELD);
        }
        self.category = category;
        self
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn missing(&self, data: &FieldMap) -> Vec<&'static str> {
        self.fields
            .iter()
            .copied()
            .filter(|name| !self.holds(name, data))
            .collect()
    }

    fn holds(&self, name: &str, data: &FieldMap) -> bool {
        match self.category {
            Some(category) if name == CATEGORY_FIELD => {
                data.get(name).and_then(Value::as_str) == Some(category.key())
            }
            _ => data.get(name).is_some_and(is_filled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("a flow needs at least one step")]
    Empty,
    #[error("step at position {position} has id {id} but ids must run 1..=n")]
    NonContiguous { position: usize, id: StepId },
}

/// Ordered steps plus the schema derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfiguration {
    kind: FlowKind,
    category: Option<BusinessCategory>,
    steps: Vec<StepDescriptor>,
    schema: RequiredFieldSet,
}

impl FlowConfiguration {
    pub fn new(
        kind: FlowKind,
        category: Option<BusinessCategory>,
        steps: Vec<StepDescriptor>,
    ) -> Result<Self, ConfigurationError> {
        if steps.is_empty() {
            return Err(ConfigurationError::Empty);
        }
        for (position, step) in steps.iter().enumerate() {
            if step.id != position + 1 {
                return Err(ConfigurationError::NonContiguous {
                    position,
                    id: step.id,
                });
            }
        }

        let schema = RequiredFieldSet::from_steps(&steps).pinned_to(category);
        Ok(Self {
            kind,
            category,
            steps,
            schema,
        })
    }

    /// The shared three-step shape: quantitative, descriptive, review.
    pub fn standard(kind: FlowKind, category: Option<BusinessCategory>) -> Self {
        let (quantitative, descriptive) = standard_step_templates(kind, category);
        let steps: Vec<StepDescriptor> = [quantitative, descriptive, review_template()]
            .into_iter()
            .enumerate()
            .map(|(index, template)| template.into_descriptor(index + 1))
            .collect();
        let schema = RequiredFieldSet::from_steps(&steps).pinned_to(category);

        Self {
            kind,
            category,
            steps,
            schema,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn category(&self) -> Option<BusinessCategory> {
        self.category
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn schema(&self) -> &RequiredFieldSet {
        &self.schema
    }

    pub fn total_steps(&self) -> StepId {
        self.steps.len()
    }

    /// First step after any prelude; where edit sessions open.
    pub const fn first_service_step(&self) -> StepId {
        1
    }

    pub fn step(&self, id: StepId) -> Option<&StepDescriptor> {
        id.checked_sub(1).and_then(|index| self.steps.get(index))
    }

    /// Gate for `step`; unknown steps never pass.
    pub fn validate(&self, step: StepId, data: &FieldMap) -> bool {
        self.step(step).is_some_and(|descriptor| descriptor.validate(data))
    }

    pub fn report(&self, step: StepId, data: &FieldMap) -> Option<ValidationReport> {
        self.step(step).map(|descriptor| descriptor.report(data))
    }
}

struct StepTemplate {
    key: &'static str,
    title: String,
    icon: &'static str,
    requirements: Vec<FieldRequirement>,
}

impl StepTemplate {
    fn into_descriptor(self, id: StepId) -> StepDescriptor {
        StepDescriptor {
            id,
            key: self.key,
            title: self.title,
            icon: self.icon,
            requirements: self.requirements,
        }
    }
}

fn review_template() -> StepTemplate {
    StepTemplate {
        key: "review",
        title: "Review & submit".to_string(),
        icon: "check-circle",
        requirements: Vec::new(),
    }
}

fn about_title(category: Option<BusinessCategory>, fallback: &str) -> String {
    match category {
        Some(category) => format!("About your {} business", category.label().to_lowercase()),
        None => fallback.to_string(),
    }
}

fn standard_step_templates(
    kind: FlowKind,
    category: Option<BusinessCategory>,
) -> (StepTemplate, StepTemplate) {
    match kind {
        FlowKind::BusinessCard => (
            StepTemplate {
                key: "years",
                title: "Years in business".to_string(),
                icon: "calendar",
                requirements: vec![
                    FieldRequirement::number("yearsInBusiness", "Years in business", 0.0),
                    FieldRequirement::number("foundedYear", "Founded year", 1800.0),
                ],
            },
            StepTemplate {
                key: "info",
                title: about_title(category, "Business info"),
                icon: "building",
                requirements: vec![
                    FieldRequirement::text("name", "Business name"),
                    FieldRequirement::text("location", "Location"),
                    FieldRequirement::text("description", "Description"),
                    FieldRequirement::choice("teamSize", "Team size", TEAM_SIZES),
                ],
            },
        ),
        FlowKind::ProfileCard => (
            StepTemplate {
                key: "experience",
                title: "Experience".to_string(),
                icon: "briefcase",
                requirements: vec![
                    FieldRequirement::number("yearsOfExperience", "Years of experience", 0.0),
                    FieldRequirement::number("dealsCompleted", "Deals completed", 0.0),
                ],
            },
            StepTemplate {
                key: "about",
                title: "About you".to_string(),
                icon: "user",
                requirements: vec![
                    FieldRequirement::text("fullName", "Full name"),
                    FieldRequirement::text("headline", "Headline"),
                    FieldRequirement::text("location", "Location"),
                    FieldRequirement::text("bio", "Bio"),
                ],
            },
        ),
        FlowKind::Listing => (
            StepTemplate {
                key: "financials",
                title: "Financials".to_string(),
                icon: "chart",
                requirements: vec![
                    FieldRequirement::number("askingPrice", "Asking price", 0.0),
                    FieldRequirement::number("annualRevenue", "Annual revenue", 0.0),
                ],
            },
            StepTemplate {
                key: "details",
                title: about_title(category, "Listing details"),
                icon: "file-text",
                requirements: vec![
                    FieldRequirement::text("title", "Listing title"),
                    FieldRequirement::text("location", "Location"),
                    FieldRequirement::text("description", "Description"),
                    FieldRequirement::text("reasonForSelling", "Reason for selling"),
                ],
            },
        ),
        FlowKind::SellerOnboarding => (
            StepTemplate {
                key: "company_size",
                title: "Company size".to_string(),
                icon: "users",
                requirements: vec![
                    FieldRequirement::number("employeeCount", "Employee count", 0.0),
                    FieldRequirement::number("yearsOperating", "Years operating", 0.0),
                ],
            },
            StepTemplate {
                key: "company",
                title: about_title(category, "Company details"),
                icon: "building",
                requirements: vec![
                    FieldRequirement::text("companyName", "Company name"),
                    FieldRequirement::text("contactEmail", "Contact email"),
                    FieldRequirement::text("location", "Location"),
                    FieldRequirement::choice(
                        "sellingTimeline",
                        "Selling timeline",
                        SELLING_TIMELINES,
                    ),
                ],
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_shares_the_three_step_shape() {
        for kind in FlowKind::ordered() {
            let config = FlowConfiguration::standard(kind, Some(BusinessCategory::Retail));
            let ids: Vec<StepId> = config.steps().iter().map(|step| step.id).collect();
            assert_eq!(ids, vec![1, 2, 3], "{kind:?} should have dense ids");
            assert!(config.steps()[2].is_review());
            assert!(!config.steps()[0].is_review());
        }
    }

    #[test]
    fn schema_is_the_union_of_step_fields() {
        let config = FlowConfiguration::standard(FlowKind::BusinessCard, None);
        assert_eq!(
            config.schema().fields(),
            &[
                "yearsInBusiness",
                "foundedYear",
                "name",
                "location",
                "description",
                "teamSize"
            ]
        );
    }

    #[test]
    fn routed_category_joins_the_schema_as_an_exact_value() {
        let config =
            FlowConfiguration::standard(FlowKind::BusinessCard, Some(BusinessCategory::Retail));
        assert_eq!(config.schema().fields().last(), Some(&"category"));

        let mut data = json!({
            "yearsInBusiness": 3,
            "foundedYear": 2021,
            "name": "Corner Books",
            "location": "Mechelen",
            "description": "Independent bookshop.",
            "teamSize": "1-5",
            "category": "retail",
        })
        .as_object()
        .cloned()
        .expect("object");
        assert!(config.schema().missing(&data).is_empty());

        data.insert("category".to_string(), json!("catering"));
        assert_eq!(config.schema().missing(&data), vec!["category"]);
        data.insert("category".to_string(), Value::Null);
        assert_eq!(config.schema().missing(&data), vec!["category"]);
    }

    #[test]
    fn category_specialises_the_descriptive_title() {
        let config =
            FlowConfiguration::standard(FlowKind::BusinessCard, Some(BusinessCategory::Catering));
        assert_eq!(config.steps()[1].title, "About your catering business");

        let plain = FlowConfiguration::standard(FlowKind::BusinessCard, None);
        assert_eq!(plain.steps()[1].title, "Business info");
    }

    #[test]
    fn new_rejects_gaps_and_empty_step_lists() {
        let config = FlowConfiguration::standard(FlowKind::Listing, None);
        let mut steps = config.steps().to_vec();
        steps[1].id = 5;

        assert_eq!(
            FlowConfiguration::new(FlowKind::Listing, None, steps),
            Err(ConfigurationError::NonContiguous { position: 1, id: 5 })
        );
        assert_eq!(
            FlowConfiguration::new(FlowKind::Listing, None, Vec::new()),
            Err(ConfigurationError::Empty)
        );
    }

    #[test]
    fn unknown_steps_never_validate() {
        let config = FlowConfiguration::standard(FlowKind::ProfileCard, None);
        let data = json!({}).as_object().cloned().expect("object");
        assert!(!config.validate(0, &data));
        assert!(!config.validate(4, &data));
        assert!(config.validate(3, &data));
    }
}
