use effectdash::chart::{
    build_forest, build_scatter, Canvas, ChartData, ForestVariant, Layer, LayerKind, Paint, Scale,
    ScatterVariant, Variant,
};
use effectdash::data::{Dataset, DatasetRow, Factor, Framework, Predictor};
use effectdash::labels::FOREST_CAPTION;
use effectdash::selection::{FrameworkFilter, ScatterY, SelectionState};
use effectdash::view::{derive_forest, derive_scatter};
use LayerKind::*;

fn dataset() -> Dataset {
    let specs = [
        ("t01", Framework::Frequentist, -0.2, "f0", Some(3.0)),
        ("t02", Framework::Bayesian, 0.1, "duration", Some(8.0)),
        ("t03", Framework::Bayesian, 0.4, "f0", None),
        ("t04", Framework::Frequentist, 0.6, "intensity", Some(12.0)),
    ];
    let rows = specs
        .iter()
        .map(|(id, fw, pm, outcome, years)| {
            let mut r = DatasetRow::new(id, *fw, *pm);
            r.outcome = Some(outcome.to_string());
            r.estimate = Some(pm * 1.5);
            r.se = Some(0.1);
            r.lower95 = Some(pm - 0.2);
            r.higher95 = Some(pm + 0.2);
            r.years_from_phd = *years;
            r
        })
        .collect();
    Dataset::from_rows(rows).unwrap()
}

fn forest(sel: &SelectionState, ds: &Dataset) -> effectdash::chart::ChartSpec {
    build_forest(derive_forest(ds, sel), sel.include_submitted, sel.hide_intervals, Canvas::default())
}

fn scatter(sel: &SelectionState, ds: &Dataset) -> effectdash::chart::ChartSpec {
    build_scatter(derive_scatter(ds, sel), sel.add_regression, Canvas::default())
}

#[test]
fn forest_variants_select_layers() {
    let ds = dataset();
    let cases = [
        (false, false, ForestVariant::PosteriorWithIntervals, vec![ReferenceLine, ErrorSegments, PrimaryMarkers]),
        (false, true, ForestVariant::PosteriorOnly, vec![ReferenceLine, PrimaryMarkers]),
        (
            true,
            false,
            ForestVariant::SubmittedWithIntervals,
            vec![ReferenceLine, ErrorSegments, SubmittedMarkers, PrimaryMarkers],
        ),
        (true, true, ForestVariant::SubmittedNoIntervals, vec![ReferenceLine, SubmittedMarkers, PrimaryMarkers]),
    ];
    for (include_submitted, hide_intervals, variant, kinds) in cases {
        let mut sel = SelectionState::new(&ds);
        sel.include_submitted = include_submitted;
        sel.hide_intervals = hide_intervals;
        let spec = forest(&sel, &ds);
        assert_eq!(spec.variant, Variant::Forest(variant));
        assert_eq!(spec.layer_kinds(), kinds, "{:?}", variant);
        assert_eq!(spec.caption.is_some(), include_submitted);
        assert!(spec.flip_axes);
    }
}

#[test]
fn scatter_variants_select_layers() {
    let ds = dataset();
    let cases = [
        (false, None, ScatterVariant::Points, vec![ReferenceLine, PrimaryMarkers]),
        (false, Some(Factor::Outcome), ScatterVariant::ColoredPoints, vec![ReferenceLine, PrimaryMarkers]),
        (true, None, ScatterVariant::PointsWithFit, vec![ReferenceLine, PrimaryMarkers, RegressionLine]),
        (
            true,
            Some(Factor::Outcome),
            ScatterVariant::ColoredPointsWithFit,
            vec![ReferenceLine, PrimaryMarkers, RegressionLine],
        ),
    ];
    for (add_regression, color, variant, kinds) in cases {
        let mut sel = SelectionState::new(&ds);
        sel.add_regression = add_regression;
        sel.scatter_color_factor = color;
        let spec = scatter(&sel, &ds);
        assert_eq!(spec.variant, Variant::Scatter(variant));
        assert_eq!(spec.layer_kinds(), kinds, "{:?}", variant);
        assert_eq!(spec.legend.is_some(), color.is_some());
        assert!(!spec.flip_axes);
        assert!(spec.caption.is_none());
    }
}

#[test]
fn forest_caption_and_axis_labels() {
    let ds = dataset();
    let mut sel = SelectionState::new(&ds);
    let spec = forest(&sel, &ds);
    assert_eq!(spec.caption, Some(FOREST_CAPTION));
    assert_eq!(spec.x_axis.title, "All models");
    assert_eq!(spec.y_axis.title, "Effect size");

    sel.framework = FrameworkFilter::Bayesian;
    let spec = forest(&sel, &ds);
    assert_eq!(spec.x_axis.title, "Bayesian models");
    assert_eq!(spec.data.len(), 2);
    match &spec.x_axis.scale {
        Scale::Categorical { domain } => assert_eq!(domain, &vec!["t02".to_string(), "t03".to_string()]),
        other => panic!("unexpected scale {:?}", other),
    }
}

#[test]
fn forest_legend_lists_present_categories() {
    let ds = dataset();
    let mut sel = SelectionState::new(&ds);
    sel.active_categories = ["f0".to_string()].into_iter().collect();
    let spec = forest(&sel, &ds);
    let legend = spec.legend.expect("forest always has a legend");
    assert_eq!(legend.title, "Outcome");
    assert_eq!(legend.columns, 4);
    assert_eq!(legend.position, "bottom");
    assert_eq!(legend.entries, vec!["f0".to_string()]);
}

#[test]
fn scatter_axis_labels_follow_selection() {
    let ds = dataset();
    let mut sel = SelectionState::new(&ds);
    let spec = scatter(&sel, &ds);
    assert_eq!(spec.x_axis.title, "Years after PhD");
    assert_eq!(spec.y_axis.title, "Meta-analytic effect");

    sel.scatter_y_var = ScatterY::Estimate;
    sel.scatter_x_var = Predictor::PhonRating;
    let spec = scatter(&sel, &ds);
    assert_eq!(spec.x_axis.title, "Peer rating\n(acoustic analysis)");
    assert_eq!(spec.y_axis.title, "Submitted effect");
    assert!(spec.data.is_empty());
}

#[test]
fn colored_regression_is_grouped() {
    let ds = dataset();
    let mut sel = SelectionState::new(&ds);
    sel.add_regression = true;
    sel.scatter_color_factor = Some(Factor::Outcome);
    let spec = scatter(&sel, &ds);
    let fit = spec
        .layers
        .iter()
        .find(|l| l.kind() == RegressionLine)
        .expect("regression layer");
    match fit {
        Layer::Regression { method, grouped, color, .. } => {
            assert_eq!(*method, "lm");
            assert!(*grouped);
            assert!(matches!(color, Paint::Field("color_var")));
        }
        other => panic!("unexpected layer {:?}", other),
    }
}

#[test]
fn empty_view_still_builds_valid_spec() {
    let ds = dataset();
    let mut sel = SelectionState::new(&ds);
    sel.active_categories.clear();
    let spec = forest(&sel, &ds);
    assert!(spec.data.is_empty());
    assert_eq!(spec.layer_kinds().len(), 4);
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["output"], "postPlot");
    assert_eq!(json["data"], serde_json::json!([]));
    assert_eq!(json["params"]["point_size"], 2.9);
}

#[test]
fn degenerate_standardization_serializes_null() {
    let ds = dataset();
    let mut sel = SelectionState::new(&ds);
    // The framework filter applies to the forest plot only.
    sel.framework = FrameworkFilter::Bayesian;
    sel.scatter_color_factor = Some(Factor::Outcome);
    sel.scatter_x_var = Predictor::YearsFromPhd;
    sel.standardize_x = true;
    let spec = scatter(&sel, &ds);
    assert_eq!(spec.data.len(), 3);
    let ChartData::Scatter(rows) = &spec.data else {
        panic!("scatter data expected");
    };
    assert!(rows.iter().all(|r| r.x.is_finite()));

    let one = Dataset::from_rows(vec![{
        let mut r = DatasetRow::new("solo", Framework::Bayesian, 0.3);
        r.years_from_phd = Some(4.0);
        r
    }])
    .unwrap();
    let mut sel = SelectionState::new(&one);
    sel.standardize_x = true;
    let json = serde_json::to_value(scatter(&sel, &one)).unwrap();
    assert!(json["data"][0]["x"].is_null());
    assert_eq!(json["canvas"]["height_px"], 500);
}
