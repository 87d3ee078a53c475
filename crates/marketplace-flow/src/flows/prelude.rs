use serde::Serialize;
use tracing::debug;

use super::blueprint::FlowConfiguration;
use super::domain::{BusinessCategory, FlowKind};
use super::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "category", rename_all = "snake_case")]
pub enum PreludeState {
    Selecting,
    Confirming(BusinessCategory),
    Routed(BusinessCategory),
}

impl PreludeState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Selecting => "selecting",
            Self::Confirming(_) => "confirming",
            Self::Routed(_) => "routed",
        }
    }
}

/// Category selection and confirmation that precede a create-mode flow.
#[derive(Debug, Clone)]
pub struct PreludeRouter {
    kind: FlowKind,
    state: PreludeState,
}

impl PreludeRouter {
    pub fn new(kind: FlowKind) -> Self {
        Self {
            kind,
            state: PreludeState::Selecting,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn state(&self) -> PreludeState {
        self.state
    }

    pub const fn options() -> [BusinessCategory; 8] {
        BusinessCategory::ordered()
    }

    pub fn select(&mut self, category: BusinessCategory) -> Result<(), FlowError> {
        self.expect_state("selecting")?;
        debug!(kind = ?self.kind, category = category.key(), "prelude category selected");
        self.state = PreludeState::Confirming(category);
        Ok(())
    }

    /// Back from confirmation to pick a different category.
    pub fn reselect(&mut self) -> Result<(), FlowError> {
        self.expect_state("confirming")?;
        self.state = PreludeState::Selecting;
        Ok(())
    }

    /// The explicit "Get Started" acknowledgement. Resolves the configuration
    /// for the confirmed category; the router cannot be used afterwards.
    pub fn get_started(&mut self) -> Result<FlowConfiguration, FlowError> {
        let category = match self.state {
            PreludeState::Confirming(category) => category,
            other => {
                return Err(FlowError::PreludeState {
                    expected: "confirming",
                    found: other.label(),
                })
            }
        };
        self.state = PreludeState::Routed(category);
        debug!(kind = ?self.kind, category = category.key(), "prelude routed");
        Ok(FlowConfiguration::standard(self.kind, Some(category)))
    }

    pub fn view(&self) -> PreludeView {
        let selected = match self.state {
            PreludeState::Confirming(category) | PreludeState::Routed(category) => Some(category),
            PreludeState::Selecting => None,
        };
        PreludeView {
            kind: self.kind,
            kind_label: self.kind.label(),
            state: self.state,
            options: Self::options()
                .into_iter()
                .map(|category| CategoryOption {
                    category,
                    label: category.label(),
                    selected: selected == Some(category),
                })
                .collect(),
            confirmation: selected.map(|category| {
                format!(
                    "You're creating a {} for a {} business.",
                    self.kind.label().to_lowercase(),
                    category.label().to_lowercase()
                )
            }),
            can_get_started: matches!(self.state, PreludeState::Confirming(_)),
        }
    }

    fn expect_state(&self, expected: &'static str) -> Result<(), FlowError> {
        let found = self.state.label();
        if found == expected {
            Ok(())
        } else {
            Err(FlowError::PreludeState { expected, found })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub category: BusinessCategory,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreludeView {
    pub kind: FlowKind,
    pub kind_label: &'static str,
    pub state: PreludeState,
    pub options: Vec<CategoryOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    pub can_get_started: bool,
}
