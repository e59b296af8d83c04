//! Chart spec assembly.
//!
//! Each plot has four variants keyed by two toggles. A variant is resolved
//! by indexing a table with the toggle bits, and the table row lists the
//! layers to draw. Builders only arrange display instructions; the rows
//! arrive already filtered from [`crate::view`].

use crate::labels;
use crate::view::{ForestRow, ForestView, ScatterRow, ScatterView, VisualParams};
use serde::Serialize;
use std::collections::BTreeSet;

pub const POST_PLOT: &str = "postPlot";
pub const SCATTER_PLOT: &str = "scatterPlot";

const SUBMITTED_GREY: &str = "#999999";
const REFERENCE_COLOR: &str = "#4d4d4d";
const UNCOLORED: &str = "#333333";
const COLOR_FIELD: &str = "color_var";
const LEGEND_COLUMNS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    ReferenceLine,
    ErrorSegments,
    SubmittedMarkers,
    PrimaryMarkers,
    RegressionLine,
}

// =============================================================================
// Variant tables
// =============================================================================

/// Discriminants index [`FOREST_TABLE`]: `include_submitted << 1 | hide_intervals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForestVariant {
    PosteriorWithIntervals = 0,
    PosteriorOnly = 1,
    SubmittedWithIntervals = 2,
    SubmittedNoIntervals = 3,
}

struct ForestEntry {
    variant: ForestVariant,
    layers: &'static [LayerKind],
}

const FOREST_TABLE: [ForestEntry; 4] = [
    ForestEntry {
        variant: ForestVariant::PosteriorWithIntervals,
        layers: &[LayerKind::ReferenceLine, LayerKind::ErrorSegments, LayerKind::PrimaryMarkers],
    },
    ForestEntry {
        variant: ForestVariant::PosteriorOnly,
        layers: &[LayerKind::ReferenceLine, LayerKind::PrimaryMarkers],
    },
    ForestEntry {
        variant: ForestVariant::SubmittedWithIntervals,
        layers: &[
            LayerKind::ReferenceLine,
            LayerKind::ErrorSegments,
            LayerKind::SubmittedMarkers,
            LayerKind::PrimaryMarkers,
        ],
    },
    ForestEntry {
        variant: ForestVariant::SubmittedNoIntervals,
        layers: &[
            LayerKind::ReferenceLine,
            LayerKind::SubmittedMarkers,
            LayerKind::PrimaryMarkers,
        ],
    },
];

impl ForestVariant {
    pub const ALL: [ForestVariant; 4] = [
        ForestVariant::PosteriorWithIntervals,
        ForestVariant::PosteriorOnly,
        ForestVariant::SubmittedWithIntervals,
        ForestVariant::SubmittedNoIntervals,
    ];

    pub fn resolve(include_submitted: bool, hide_intervals: bool) -> Self {
        FOREST_TABLE[(usize::from(include_submitted) << 1) | usize::from(hide_intervals)].variant
    }

    pub fn layers(self) -> &'static [LayerKind] {
        FOREST_TABLE[self as usize].layers
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ForestVariant::PosteriorWithIntervals => "posterior_with_intervals",
            ForestVariant::PosteriorOnly => "posterior_only",
            ForestVariant::SubmittedWithIntervals => "submitted_with_intervals",
            ForestVariant::SubmittedNoIntervals => "submitted_no_intervals",
        }
    }
}

/// Discriminants index [`SCATTER_TABLE`]: `add_regression << 1 | colored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterVariant {
    Points = 0,
    ColoredPoints = 1,
    PointsWithFit = 2,
    ColoredPointsWithFit = 3,
}

struct ScatterEntry {
    variant: ScatterVariant,
    colored: bool,
    layers: &'static [LayerKind],
}

const SCATTER_TABLE: [ScatterEntry; 4] = [
    ScatterEntry {
        variant: ScatterVariant::Points,
        colored: false,
        layers: &[LayerKind::ReferenceLine, LayerKind::PrimaryMarkers],
    },
    ScatterEntry {
        variant: ScatterVariant::ColoredPoints,
        colored: true,
        layers: &[LayerKind::ReferenceLine, LayerKind::PrimaryMarkers],
    },
    ScatterEntry {
        variant: ScatterVariant::PointsWithFit,
        colored: false,
        layers: &[
            LayerKind::ReferenceLine,
            LayerKind::PrimaryMarkers,
            LayerKind::RegressionLine,
        ],
    },
    ScatterEntry {
        variant: ScatterVariant::ColoredPointsWithFit,
        colored: true,
        layers: &[
            LayerKind::ReferenceLine,
            LayerKind::PrimaryMarkers,
            LayerKind::RegressionLine,
        ],
    },
];

impl ScatterVariant {
    pub const ALL: [ScatterVariant; 4] = [
        ScatterVariant::Points,
        ScatterVariant::ColoredPoints,
        ScatterVariant::PointsWithFit,
        ScatterVariant::ColoredPointsWithFit,
    ];

    pub fn resolve(add_regression: bool, colored: bool) -> Self {
        SCATTER_TABLE[(usize::from(add_regression) << 1) | usize::from(colored)].variant
    }

    pub fn layers(self) -> &'static [LayerKind] {
        SCATTER_TABLE[self as usize].layers
    }

    pub fn colored(self) -> bool {
        SCATTER_TABLE[self as usize].colored
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScatterVariant::Points => "points",
            ScatterVariant::ColoredPoints => "colored_points",
            ScatterVariant::PointsWithFit => "points_with_fit",
            ScatterVariant::ColoredPointsWithFit => "colored_points_with_fit",
        }
    }
}

// =============================================================================
// Spec types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    Fixed(&'static str),
    Field(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRole {
    Primary,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    ReferenceLine {
        y: f64,
        color: &'static str,
        dashed: bool,
    },
    ErrorSegments {
        at: &'static str,
        from: &'static str,
        to: &'static str,
        width: f64,
        color: Paint,
    },
    Markers {
        role: MarkerRole,
        x: &'static str,
        y: &'static str,
        size: f64,
        stroke: f64,
        fill: Paint,
    },
    Regression {
        x: &'static str,
        y: &'static str,
        method: &'static str,
        width: f64,
        color: Paint,
        /// One fit per color group.
        grouped: bool,
    },
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::ReferenceLine { .. } => LayerKind::ReferenceLine,
            Layer::ErrorSegments { .. } => LayerKind::ErrorSegments,
            Layer::Markers { role: MarkerRole::Submitted, .. } => LayerKind::SubmittedMarkers,
            Layer::Markers { role: MarkerRole::Primary, .. } => LayerKind::PrimaryMarkers,
            Layer::Regression { .. } => LayerKind::RegressionLine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scale {
    Linear,
    Categorical { domain: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: &'static str,
    pub field: &'static str,
    pub scale: Scale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: &'static str,
    pub field: &'static str,
    pub columns: u8,
    pub position: &'static str,
    pub entries: Vec<String>,
}

/// Presentation hint; the core never sizes pixels itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Canvas {
    pub width: &'static str,
    pub height_px: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: "100%",
            height_px: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Forest(ForestVariant),
    Scatter(ScatterVariant),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Forest(Vec<ForestRow>),
    Scatter(Vec<ScatterRow>),
}

impl ChartData {
    pub fn len(&self) -> usize {
        match self {
            ChartData::Forest(rows) => rows.len(),
            ChartData::Scatter(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub output: &'static str,
    pub variant: Variant,
    pub data: ChartData,
    pub layers: Vec<Layer>,
    pub params: VisualParams,
    pub x_axis: Axis,
    pub y_axis: Axis,
    /// Swap axes when drawing (models run down the vertical axis).
    pub flip_axes: bool,
    pub caption: Option<&'static str>,
    pub legend: Option<Legend>,
    pub canvas: Canvas,
}

impl ChartSpec {
    pub fn layer_kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(Layer::kind).collect()
    }
}

// =============================================================================
// Builders
// =============================================================================

fn reference_line() -> Layer {
    Layer::ReferenceLine {
        y: 0.0,
        color: REFERENCE_COLOR,
        dashed: true,
    }
}

fn color_legend(title: &'static str, entries: BTreeSet<String>) -> Legend {
    Legend {
        title,
        field: COLOR_FIELD,
        columns: LEGEND_COLUMNS,
        position: "bottom",
        entries: entries.into_iter().collect(),
    }
}

fn forest_layer(kind: LayerKind, p: &VisualParams) -> Option<Layer> {
    let layer = match kind {
        LayerKind::ReferenceLine => reference_line(),
        LayerKind::ErrorSegments => Layer::ErrorSegments {
            at: "model_id",
            from: "lower95",
            to: "higher95",
            width: p.line_size,
            color: Paint::Field(COLOR_FIELD),
        },
        LayerKind::SubmittedMarkers => Layer::Markers {
            role: MarkerRole::Submitted,
            x: "model_id",
            y: "estimate",
            size: p.point_size,
            stroke: p.stroke_size,
            fill: Paint::Fixed(SUBMITTED_GREY),
        },
        LayerKind::PrimaryMarkers => Layer::Markers {
            role: MarkerRole::Primary,
            x: "model_id",
            y: "post_mean",
            size: p.point_size,
            stroke: p.stroke_size,
            fill: Paint::Field(COLOR_FIELD),
        },
        LayerKind::RegressionLine => return None,
    };
    Some(layer)
}

fn scatter_layer(kind: LayerKind, p: &VisualParams, colored: bool) -> Option<Layer> {
    let paint = if colored {
        Paint::Field(COLOR_FIELD)
    } else {
        Paint::Fixed(UNCOLORED)
    };
    let layer = match kind {
        LayerKind::ReferenceLine => reference_line(),
        LayerKind::PrimaryMarkers => Layer::Markers {
            role: MarkerRole::Primary,
            x: "x",
            y: "y",
            size: p.point_size,
            stroke: p.stroke_size,
            fill: paint,
        },
        LayerKind::RegressionLine => Layer::Regression {
            x: "x",
            y: "y",
            method: "lm",
            width: p.line_size,
            color: paint,
            grouped: colored,
        },
        LayerKind::ErrorSegments | LayerKind::SubmittedMarkers => return None,
    };
    Some(layer)
}

pub fn build_forest(
    view: ForestView,
    include_submitted: bool,
    hide_intervals: bool,
    canvas: Canvas,
) -> ChartSpec {
    let variant = ForestVariant::resolve(include_submitted, hide_intervals);
    let layers = variant
        .layers()
        .iter()
        .filter_map(|k| forest_layer(*k, &view.params))
        .collect();
    let domain = view.rows.iter().map(|r| r.model_id.clone()).collect();
    let entries = view.rows.iter().map(|r| r.color_var.clone()).collect();

    ChartSpec {
        output: POST_PLOT,
        variant: Variant::Forest(variant),
        layers,
        params: view.params,
        x_axis: Axis {
            title: view.model_label,
            field: "model_id",
            scale: Scale::Categorical { domain },
        },
        y_axis: Axis {
            title: labels::FOREST_VALUE_LABEL,
            field: "post_mean",
            scale: Scale::Linear,
        },
        flip_axes: true,
        caption: view.caption,
        legend: Some(color_legend(labels::factor_label(view.factor), entries)),
        canvas,
        data: ChartData::Forest(view.rows),
    }
}

pub fn build_scatter(view: ScatterView, add_regression: bool, canvas: Canvas) -> ChartSpec {
    let variant = ScatterVariant::resolve(add_regression, view.color_factor.is_some());
    let colored = variant.colored();
    let layers = variant
        .layers()
        .iter()
        .filter_map(|k| scatter_layer(*k, &view.params, colored))
        .collect();
    let legend = view.color_factor.map(|f| {
        let entries = view.rows.iter().filter_map(|r| r.color_var.clone()).collect();
        color_legend(labels::factor_label(f), entries)
    });

    ChartSpec {
        output: SCATTER_PLOT,
        variant: Variant::Scatter(variant),
        layers,
        params: view.params,
        x_axis: Axis {
            title: view.x_label,
            field: "x",
            scale: Scale::Linear,
        },
        y_axis: Axis {
            title: view.y_label,
            field: "y",
            scale: Scale::Linear,
        },
        flip_axes: false,
        caption: None,
        legend,
        canvas,
        data: ChartData::Scatter(view.rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forest_resolution_table() {
        assert_eq!(ForestVariant::resolve(true, false), ForestVariant::SubmittedWithIntervals);
        assert_eq!(ForestVariant::resolve(true, true), ForestVariant::SubmittedNoIntervals);
        assert_eq!(ForestVariant::resolve(false, false), ForestVariant::PosteriorWithIntervals);
        assert_eq!(ForestVariant::resolve(false, true), ForestVariant::PosteriorOnly);
    }

    #[test]
    fn scatter_resolution_table() {
        assert_eq!(ScatterVariant::resolve(false, false), ScatterVariant::Points);
        assert_eq!(ScatterVariant::resolve(false, true), ScatterVariant::ColoredPoints);
        assert_eq!(ScatterVariant::resolve(true, false), ScatterVariant::PointsWithFit);
        assert_eq!(ScatterVariant::resolve(true, true), ScatterVariant::ColoredPointsWithFit);
    }

    #[test]
    fn table_rows_match_discriminants() {
        for v in ForestVariant::ALL {
            assert_eq!(FOREST_TABLE[v as usize].variant, v);
        }
        for v in ScatterVariant::ALL {
            assert_eq!(SCATTER_TABLE[v as usize].variant, v);
        }
    }

    #[test]
    fn every_variant_starts_with_reference_line() {
        for v in ForestVariant::ALL {
            assert_eq!(v.layers()[0], LayerKind::ReferenceLine);
        }
        for v in ScatterVariant::ALL {
            assert_eq!(v.layers()[0], LayerKind::ReferenceLine);
        }
    }

    #[test]
    fn scatter_builder_never_emits_forest_layers() {
        let p = crate::view::visual_params(0);
        assert!(scatter_layer(LayerKind::ErrorSegments, &p, true).is_none());
        assert!(forest_layer(LayerKind::RegressionLine, &p).is_none());
    }

    #[test]
    fn variant_serializes_tagged() {
        let v = serde_json::to_value(Variant::Forest(ForestVariant::PosteriorOnly)).unwrap();
        assert_eq!(v, serde_json::json!({"forest": "posterior_only"}));
    }
}
