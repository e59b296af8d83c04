//! Per-session control state and the reducer that applies control events.
//!
//! `apply` is the only mutation path: `(SelectionState, ControlEvent) ->
//! Affected`. Changing the forest color factor resets the checkbox set to
//! every category of the new factor, discarding earlier de-selections.

use crate::data::{Dataset, Factor, Framework, Predictor};
use crate::view::available_categories;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("unknown control: {0}")]
    UnknownControl(String),

    #[error("invalid value for {control}: {detail}")]
    InvalidValue { control: &'static str, detail: String },
}

/// Framework selector; `Any` applies no filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameworkFilter {
    #[default]
    Any,
    Frequentist,
    Bayesian,
}

impl FrameworkFilter {
    pub const ALL: [FrameworkFilter; 3] = [
        FrameworkFilter::Any,
        FrameworkFilter::Frequentist,
        FrameworkFilter::Bayesian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameworkFilter::Any => "Any",
            FrameworkFilter::Frequentist => "Frequentist",
            FrameworkFilter::Bayesian => "Bayesian",
        }
    }

    pub fn admits(&self, framework: Framework) -> bool {
        match self {
            FrameworkFilter::Any => true,
            FrameworkFilter::Frequentist => framework == Framework::Frequentist,
            FrameworkFilter::Bayesian => framework == Framework::Bayesian,
        }
    }
}

impl FromStr for FrameworkFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FrameworkFilter::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown framework filter: {:?}", s))
    }
}

/// Scatterplot y variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterY {
    #[default]
    PostMean,
    Estimate,
}

impl ScatterY {
    pub const ALL: [ScatterY; 2] = [ScatterY::PostMean, ScatterY::Estimate];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScatterY::PostMean => "post_mean",
            ScatterY::Estimate => "estimate",
        }
    }
}

impl FromStr for ScatterY {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScatterY::ALL
            .iter()
            .copied()
            .find(|y| y.as_str() == s)
            .ok_or_else(|| format!("unknown y variable: {:?}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub color_factor: Factor,
    pub framework: FrameworkFilter,
    pub include_submitted: bool,
    pub hide_intervals: bool,
    pub active_categories: BTreeSet<String>,
    pub scatter_y_var: ScatterY,
    pub scatter_x_var: Predictor,
    pub scatter_color_factor: Option<Factor>,
    pub standardize_x: bool,
    pub add_regression: bool,
}

impl SelectionState {
    /// Session-start defaults; every category of the default factor is checked.
    pub fn new(dataset: &Dataset) -> Self {
        let color_factor = Factor::Outcome;
        Self {
            color_factor,
            framework: FrameworkFilter::Any,
            include_submitted: true,
            hide_intervals: false,
            active_categories: available_categories(dataset, color_factor),
            scatter_y_var: ScatterY::PostMean,
            scatter_x_var: Predictor::YearsFromPhd,
            scatter_color_factor: None,
            standardize_x: false,
            add_regression: false,
        }
    }

    pub fn hash(&self) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.color_factor.hash(&mut h);
        self.framework.hash(&mut h);
        self.include_submitted.hash(&mut h);
        self.hide_intervals.hash(&mut h);
        self.active_categories.hash(&mut h);
        self.scatter_y_var.hash(&mut h);
        self.scatter_x_var.hash(&mut h);
        self.scatter_color_factor.hash(&mut h);
        self.standardize_x.hash(&mut h);
        self.add_regression.hash(&mut h);
        h.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Color,
    Framework,
    IncludeSubmitted,
    HideIntervals,
    Checkbox,
    SpYVar,
    SpXVar,
    SpColorVar,
    StdVars,
    AddRegression,
}

impl ControlId {
    pub const ALL: [ControlId; 10] = [
        ControlId::Color,
        ControlId::Framework,
        ControlId::IncludeSubmitted,
        ControlId::HideIntervals,
        ControlId::Checkbox,
        ControlId::SpYVar,
        ControlId::SpXVar,
        ControlId::SpColorVar,
        ControlId::StdVars,
        ControlId::AddRegression,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlId::Color => "color",
            ControlId::Framework => "framework",
            ControlId::IncludeSubmitted => "include_submitted",
            ControlId::HideIntervals => "hide_intervals",
            ControlId::Checkbox => "checkbox",
            ControlId::SpYVar => "sp_y_var",
            ControlId::SpXVar => "sp_x_var",
            ControlId::SpColorVar => "sp_color_var",
            ControlId::StdVars => "std_vars",
            ControlId::AddRegression => "add_regression",
        }
    }
}

impl FromStr for ControlId {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlId::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ControlError::UnknownControl(s.to_string()))
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Color(Factor),
    Framework(FrameworkFilter),
    IncludeSubmitted(bool),
    HideIntervals(bool),
    Checkbox(BTreeSet<String>),
    SpYVar(ScatterY),
    SpXVar(Predictor),
    SpColorVar(Option<Factor>),
    StdVars(bool),
    AddRegression(bool),
}

impl ControlEvent {
    /// Decode a `(controlId, newValue)` pair from the presentation shell.
    pub fn parse(control: &str, value: &Value) -> Result<Self, ControlError> {
        let id: ControlId = control.parse()?;
        let invalid = |detail: String| ControlError::InvalidValue {
            control: id.as_str(),
            detail,
        };
        let flag = || value.as_bool().ok_or_else(|| invalid(format!("expected bool, got {}", value)));
        let text = || value.as_str().ok_or_else(|| invalid(format!("expected string, got {}", value)));

        let event = match id {
            ControlId::Color => ControlEvent::Color(text()?.parse().map_err(invalid)?),
            ControlId::Framework => ControlEvent::Framework(text()?.parse().map_err(invalid)?),
            ControlId::IncludeSubmitted => ControlEvent::IncludeSubmitted(flag()?),
            ControlId::HideIntervals => ControlEvent::HideIntervals(flag()?),
            ControlId::Checkbox => {
                let items = value
                    .as_array()
                    .ok_or_else(|| invalid(format!("expected array, got {}", value)))?;
                let set = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid(format!("expected string item, got {}", v)))
                    })
                    .collect::<Result<BTreeSet<_>, _>>()?;
                ControlEvent::Checkbox(set)
            }
            ControlId::SpYVar => ControlEvent::SpYVar(text()?.parse().map_err(invalid)?),
            ControlId::SpXVar => ControlEvent::SpXVar(text()?.parse().map_err(invalid)?),
            ControlId::SpColorVar => {
                let raw = text()?;
                if raw == "none" {
                    ControlEvent::SpColorVar(None)
                } else {
                    ControlEvent::SpColorVar(Some(raw.parse().map_err(invalid)?))
                }
            }
            ControlId::StdVars => ControlEvent::StdVars(flag()?),
            ControlId::AddRegression => ControlEvent::AddRegression(flag()?),
        };
        Ok(event)
    }

    pub fn control(&self) -> ControlId {
        match self {
            ControlEvent::Color(_) => ControlId::Color,
            ControlEvent::Framework(_) => ControlId::Framework,
            ControlEvent::IncludeSubmitted(_) => ControlId::IncludeSubmitted,
            ControlEvent::HideIntervals(_) => ControlId::HideIntervals,
            ControlEvent::Checkbox(_) => ControlId::Checkbox,
            ControlEvent::SpYVar(_) => ControlId::SpYVar,
            ControlEvent::SpXVar(_) => ControlId::SpXVar,
            ControlEvent::SpColorVar(_) => ControlId::SpColorVar,
            ControlEvent::StdVars(_) => ControlId::StdVars,
            ControlEvent::AddRegression(_) => ControlId::AddRegression,
        }
    }
}

/// Which outputs an event invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Affected {
    pub post_plot: bool,
    pub scatter_plot: bool,
}

impl Affected {
    const FOREST: Affected = Affected { post_plot: true, scatter_plot: false };
    const SCATTER: Affected = Affected { post_plot: false, scatter_plot: true };
}

pub fn apply(state: &mut SelectionState, event: ControlEvent, dataset: &Dataset) -> Affected {
    match event {
        ControlEvent::Color(factor) => {
            state.color_factor = factor;
            state.active_categories = available_categories(dataset, factor);
            Affected::FOREST
        }
        ControlEvent::Framework(f) => {
            state.framework = f;
            Affected::FOREST
        }
        ControlEvent::IncludeSubmitted(v) => {
            state.include_submitted = v;
            Affected::FOREST
        }
        ControlEvent::HideIntervals(v) => {
            state.hide_intervals = v;
            Affected::FOREST
        }
        ControlEvent::Checkbox(set) => {
            // Only categories the active factor actually has.
            let choices = available_categories(dataset, state.color_factor);
            state.active_categories = set.into_iter().filter(|c| choices.contains(c)).collect();
            Affected::FOREST
        }
        ControlEvent::SpYVar(y) => {
            state.scatter_y_var = y;
            Affected::SCATTER
        }
        ControlEvent::SpXVar(x) => {
            state.scatter_x_var = x;
            Affected::SCATTER
        }
        ControlEvent::SpColorVar(c) => {
            state.scatter_color_factor = c;
            Affected::SCATTER
        }
        ControlEvent::StdVars(v) => {
            state.standardize_x = v;
            Affected::SCATTER
        }
        ControlEvent::AddRegression(v) => {
            state.add_regression = v;
            Affected::SCATTER
        }
    }
}
