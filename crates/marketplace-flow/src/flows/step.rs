use serde::Serialize;
use serde_json::Value;

use super::domain::{is_filled, FieldMap, StepId};

/// Constraint a single field must meet before its step can be left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    /// Non-blank string.
    Text,
    /// Number (or numeric string) no smaller than `min`.
    Number { min: f64 },
    /// One of a closed set of string options.
    Choice(&'static [&'static str]),
    /// Non-empty array.
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRequirement {
    pub name: &'static str,
    pub label: &'static str,
    pub rule: FieldRule,
}

impl FieldRequirement {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            rule: FieldRule::Text,
        }
    }

    pub const fn number(name: &'static str, label: &'static str, min: f64) -> Self {
        Self {
            name,
            label,
            rule: FieldRule::Number { min },
        }
    }

    pub const fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            label,
            rule: FieldRule::Choice(options),
        }
    }

    pub const fn list(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            rule: FieldRule::List,
        }
    }

    pub fn check(&self, data: &FieldMap) -> Option<FieldIssue> {
        let value = match data.get(self.name) {
            Some(value) if is_filled(value) => value,
            _ => return Some(self.issue(IssueKind::Missing, format!("{} is required", self.label))),
        };

        let problem = match self.rule {
            FieldRule::Text => match value {
                Value::String(_) => None,
                _ => Some(format!("{} must be text", self.label)),
            },
            FieldRule::Number { min } => match as_number(value) {
                Some(number) if number >= min => None,
                Some(_) => Some(format!("{} must be at least {}", self.label, min)),
                None => Some(format!("{} must be a number", self.label)),
            },
            FieldRule::Choice(options) => match value.as_str() {
                Some(choice) if options.contains(&choice) => None,
                _ => Some(format!("{} must be one of: {}", self.label, options.join(", "))),
            },
            FieldRule::List => match value {
                Value::Array(_) => None,
                _ => Some(format!("{} must be a list", self.label)),
            },
        };

        problem.map(|message| self.issue(IssueKind::Invalid, message))
    }

    fn issue(&self, kind: IssueKind, message: String) -> FieldIssue {
        FieldIssue {
            field: self.name.to_string(),
            label: self.label.to_string(),
            kind,
            message,
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    Invalid,
}

/// One unmet requirement, phrased for display next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub label: String,
    pub kind: IssueKind,
    pub message: String,
}

/// Outcome of running a step's gate against the accumulated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub step: StepId,
    pub issues: Vec<FieldIssue>,
}

impl ValidationReport {
    pub fn is_satisfied(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn unmet_fields(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.field.as_str()).collect()
    }
}

/// Static description of one step in a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    pub id: StepId,
    pub key: &'static str,
    pub title: String,
    /// Icon name shown in the step indicator sidebar.
    pub icon: &'static str,
    pub requirements: Vec<FieldRequirement>,
}

impl StepDescriptor {
    /// Pure gate: true when every requirement owned by this step is met.
    pub fn validate(&self, data: &FieldMap) -> bool {
        self.requirements
            .iter()
            .all(|requirement| requirement.check(data).is_none())
    }

    pub fn report(&self, data: &FieldMap) -> ValidationReport {
        ValidationReport {
            step: self.id,
            issues: self
                .requirements
                .iter()
                .filter_map(|requirement| requirement.check(data))
                .collect(),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.requirements.iter().map(|requirement| requirement.name)
    }

    /// Review steps carry no requirements and always pass.
    pub fn is_review(&self) -> bool {
        self.requirements.is_empty()
    }
}
