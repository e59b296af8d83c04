//! Display strings for axes, legends and captions.

use crate::data::{Factor, Predictor};
use crate::selection::{FrameworkFilter, ScatterY};

pub const FOREST_CAPTION: &str = "Posterior estimates from meta-analytic model (color),\nand raw estimates extracted from teams' models (grey)\n";

pub const FOREST_VALUE_LABEL: &str = "Effect size";

pub fn x_label(framework: FrameworkFilter) -> &'static str {
    match framework {
        FrameworkFilter::Any => "All models",
        FrameworkFilter::Frequentist => "Frequentist models",
        FrameworkFilter::Bayesian => "Bayesian models",
    }
}

pub fn scatter_y_label(y: ScatterY) -> &'static str {
    match y {
        ScatterY::PostMean => "Meta-analytic effect",
        ScatterY::Estimate => "Submitted effect",
    }
}

pub fn scatter_x_label(x: Predictor) -> &'static str {
    match x {
        Predictor::YearsFromPhd => "Years after PhD",
        Predictor::PriorBelief => "Prior belief",
        Predictor::PhonRating => "Peer rating\n(acoustic analysis)",
        Predictor::StatRating => "Peer rating\n(statistical analysis)",
        Predictor::AllRating => "Peer rating\n(overall)",
    }
}

/// Legend title for a color factor.
pub fn factor_label(factor: Factor) -> &'static str {
    match factor {
        Factor::Outcome => "Outcome",
        Factor::TemporalWindow => "Temporal window",
        Factor::Operationalisation => "Operationalisation",
        Factor::Typicality => "Typicality",
        Factor::FoundEffect => "Found effect",
    }
}

pub fn forest_caption(include_submitted: bool) -> Option<&'static str> {
    include_submitted.then_some(FOREST_CAPTION)
}
