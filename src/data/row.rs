use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inferential paradigm of the team's original analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[serde(alias = "Frequentist")]
    Frequentist,
    #[serde(alias = "Bayesian")]
    Bayesian,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Frequentist => "frequentist",
            Framework::Bayesian => "bayesian",
        }
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "frequentist" => Ok(Framework::Frequentist),
            "bayesian" => Ok(Framework::Bayesian),
            other => Err(format!("unknown framework: {:?}", other)),
        }
    }
}

/// Categorical covariates that can color/group the plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Outcome,
    TemporalWindow,
    Operationalisation,
    Typicality,
    FoundEffect,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Outcome,
        Factor::TemporalWindow,
        Factor::Operationalisation,
        Factor::Typicality,
        Factor::FoundEffect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Outcome => "outcome",
            Factor::TemporalWindow => "temporal_window",
            Factor::Operationalisation => "operationalisation",
            Factor::Typicality => "typicality",
            Factor::FoundEffect => "found_effect",
        }
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown factor: {:?}", s))
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Continuous covariates available on the scatterplot x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predictor {
    YearsFromPhd,
    PriorBelief,
    PhonRating,
    StatRating,
    AllRating,
}

impl Predictor {
    pub const ALL: [Predictor; 5] = [
        Predictor::YearsFromPhd,
        Predictor::PriorBelief,
        Predictor::PhonRating,
        Predictor::StatRating,
        Predictor::AllRating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Predictor::YearsFromPhd => "years_from_phd",
            Predictor::PriorBelief => "prior_belief",
            Predictor::PhonRating => "phon_rating",
            Predictor::StatRating => "stat_rating",
            Predictor::AllRating => "all_rating",
        }
    }
}

impl FromStr for Predictor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predictor::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown predictor: {:?}", s))
    }
}

/// Every column of the serialized dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    ModelId,
    Framework,
    PostMean,
    Estimate,
    Se,
    Lower95,
    Higher95,
    Outcome,
    TemporalWindow,
    Operationalisation,
    Typicality,
    FoundEffect,
    Compelling,
    YearsFromPhd,
    PriorBelief,
    PhonRating,
    StatRating,
    AllRating,
}

impl Column {
    pub const ALL: [Column; 18] = [
        Column::ModelId,
        Column::Framework,
        Column::PostMean,
        Column::Estimate,
        Column::Se,
        Column::Lower95,
        Column::Higher95,
        Column::Outcome,
        Column::TemporalWindow,
        Column::Operationalisation,
        Column::Typicality,
        Column::FoundEffect,
        Column::Compelling,
        Column::YearsFromPhd,
        Column::PriorBelief,
        Column::PhonRating,
        Column::StatRating,
        Column::AllRating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::ModelId => "model_id",
            Column::Framework => "framework",
            Column::PostMean => "post_mean",
            Column::Estimate => "estimate",
            Column::Se => "se",
            Column::Lower95 => "lower95",
            Column::Higher95 => "higher95",
            Column::Outcome => "outcome",
            Column::TemporalWindow => "temporal_window",
            Column::Operationalisation => "operationalisation",
            Column::Typicality => "typicality",
            Column::FoundEffect => "found_effect",
            Column::Compelling => "compelling",
            Column::YearsFromPhd => "years_from_phd",
            Column::PriorBelief => "prior_belief",
            Column::PhonRating => "phon_rating",
            Column::StatRating => "stat_rating",
            Column::AllRating => "all_rating",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

impl From<Factor> for Column {
    fn from(f: Factor) -> Self {
        match f {
            Factor::Outcome => Column::Outcome,
            Factor::TemporalWindow => Column::TemporalWindow,
            Factor::Operationalisation => Column::Operationalisation,
            Factor::Typicality => Column::Typicality,
            Factor::FoundEffect => Column::FoundEffect,
        }
    }
}

impl From<Predictor> for Column {
    fn from(p: Predictor) -> Self {
        match p {
            Predictor::YearsFromPhd => Column::YearsFromPhd,
            Predictor::PriorBelief => Column::PriorBelief,
            Predictor::PhonRating => Column::PhonRating,
            Predictor::StatRating => Column::StatRating,
            Predictor::AllRating => Column::AllRating,
        }
    }
}

/// A projected value. Missing serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    fn num(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Missing)
    }

    fn text(v: Option<&str>) -> Self {
        v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Missing)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// Blank or `NA` text is a missing value in every input format.
pub fn is_missing_text(v: &str) -> bool {
    let v = v.trim();
    v.is_empty() || v == "NA"
}

/// One analysis-team model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub model_id: String,
    pub framework: Framework,
    pub post_mean: f64,
    #[serde(default)]
    pub estimate: Option<f64>,
    #[serde(default)]
    pub se: Option<f64>,
    #[serde(default)]
    pub lower95: Option<f64>,
    #[serde(default)]
    pub higher95: Option<f64>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub temporal_window: Option<String>,
    #[serde(default)]
    pub operationalisation: Option<String>,
    #[serde(default)]
    pub typicality: Option<String>,
    #[serde(default)]
    pub found_effect: Option<String>,
    #[serde(default)]
    pub compelling: Option<String>,
    #[serde(default)]
    pub years_from_phd: Option<f64>,
    #[serde(default)]
    pub prior_belief: Option<f64>,
    #[serde(default)]
    pub phon_rating: Option<f64>,
    #[serde(default)]
    pub stat_rating: Option<f64>,
    #[serde(default)]
    pub all_rating: Option<f64>,
}

impl DatasetRow {
    /// Minimal row with every optional field missing.
    pub fn new(model_id: &str, framework: Framework, post_mean: f64) -> Self {
        Self {
            model_id: model_id.to_string(),
            framework,
            post_mean,
            estimate: None,
            se: None,
            lower95: None,
            higher95: None,
            outcome: None,
            temporal_window: None,
            operationalisation: None,
            typicality: None,
            found_effect: None,
            compelling: None,
            years_from_phd: None,
            prior_belief: None,
            phon_rating: None,
            stat_rating: None,
            all_rating: None,
        }
    }

    /// Clear text covariates that hold blank or `NA`.
    pub fn normalize_missing(&mut self) {
        for field in [
            &mut self.outcome,
            &mut self.temporal_window,
            &mut self.operationalisation,
            &mut self.typicality,
            &mut self.found_effect,
            &mut self.compelling,
        ] {
            if field.as_deref().is_some_and(is_missing_text) {
                *field = None;
            }
        }
    }

    pub fn factor(&self, factor: Factor) -> Option<&str> {
        let v = match factor {
            Factor::Outcome => &self.outcome,
            Factor::TemporalWindow => &self.temporal_window,
            Factor::Operationalisation => &self.operationalisation,
            Factor::Typicality => &self.typicality,
            Factor::FoundEffect => &self.found_effect,
        };
        v.as_deref()
    }

    pub fn predictor(&self, predictor: Predictor) -> Option<f64> {
        match predictor {
            Predictor::YearsFromPhd => self.years_from_phd,
            Predictor::PriorBelief => self.prior_belief,
            Predictor::PhonRating => self.phon_rating,
            Predictor::StatRating => self.stat_rating,
            Predictor::AllRating => self.all_rating,
        }
    }

    pub fn cell(&self, column: Column) -> Cell {
        match column {
            Column::ModelId => Cell::Text(self.model_id.clone()),
            Column::Framework => Cell::Text(self.framework.as_str().to_string()),
            Column::PostMean => Cell::Number(self.post_mean),
            Column::Estimate => Cell::num(self.estimate),
            Column::Se => Cell::num(self.se),
            Column::Lower95 => Cell::num(self.lower95),
            Column::Higher95 => Cell::num(self.higher95),
            Column::Outcome => Cell::text(self.factor(Factor::Outcome)),
            Column::TemporalWindow => Cell::text(self.factor(Factor::TemporalWindow)),
            Column::Operationalisation => Cell::text(self.factor(Factor::Operationalisation)),
            Column::Typicality => Cell::text(self.factor(Factor::Typicality)),
            Column::FoundEffect => Cell::text(self.factor(Factor::FoundEffect)),
            Column::Compelling => Cell::text(self.compelling.as_deref()),
            Column::YearsFromPhd => Cell::num(self.years_from_phd),
            Column::PriorBelief => Cell::num(self.prior_belief),
            Column::PhonRating => Cell::num(self.phon_rating),
            Column::StatRating => Cell::num(self.stat_rating),
            Column::AllRating => Cell::num(self.all_rating),
        }
    }
}
