//! View derivation: pure functions from `(&Dataset, selection)` to row sets.
//!
//! Nothing here caches. Every call recomputes from the dataset, and row
//! order always follows the dataset's `post_mean` order.

use crate::data::{Dataset, Factor, Predictor};
use crate::labels;
use crate::logging::ProfileScope;
use crate::selection::{FrameworkFilter, ScatterY, SelectionState};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestRow {
    pub post_mean: f64,
    pub model_id: String,
    pub estimate: Option<f64>,
    pub se: Option<f64>,
    pub lower95: Option<f64>,
    pub higher95: Option<f64>,
    pub color_var: String,
}

/// `x` may be non-finite after standardizing a degenerate set; it then
/// serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterRow {
    pub y: f64,
    pub x: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_var: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualParams {
    pub point_size: f64,
    pub line_size: f64,
    pub stroke_size: f64,
}

/// Marker and line sizes shrink with the number of plotted rows. Results
/// may go negative for very large views; clamping is the renderer's call.
pub fn visual_params(row_count: usize) -> VisualParams {
    let shrink = row_count as f64 / 100.0;
    VisualParams {
        point_size: 2.90 - shrink,
        line_size: 2.75 - shrink,
        stroke_size: 2.50 - shrink,
    }
}

/// Distinct non-missing values of `factor`, ascending.
pub fn available_categories(dataset: &Dataset, factor: Factor) -> BTreeSet<String> {
    dataset
        .rows()
        .iter()
        .filter_map(|r| r.factor(factor))
        .map(str::to_string)
        .collect()
}

pub fn forest_view(
    dataset: &Dataset,
    framework: FrameworkFilter,
    color_factor: Factor,
    active_categories: &BTreeSet<String>,
) -> Vec<ForestRow> {
    dataset
        .filter(|r| framework.admits(r.framework))
        .into_iter()
        .filter_map(|r| {
            let color = r.factor(color_factor)?;
            if !active_categories.contains(color) {
                return None;
            }
            Some(ForestRow {
                post_mean: r.post_mean,
                model_id: r.model_id.clone(),
                estimate: r.estimate,
                se: r.se,
                lower95: r.lower95,
                higher95: r.higher95,
                color_var: color.to_string(),
            })
        })
        .collect()
}

pub fn scatter_view(
    dataset: &Dataset,
    y_var: ScatterY,
    x_var: Predictor,
    color_factor: Option<Factor>,
    standardize: bool,
) -> Vec<ScatterRow> {
    let mut rows: Vec<ScatterRow> = dataset
        .rows()
        .iter()
        .filter_map(|r| {
            let color_var = match color_factor {
                Some(f) => Some(r.factor(f)?.to_string()),
                None => None,
            };
            let y = match y_var {
                ScatterY::PostMean => Some(r.post_mean),
                ScatterY::Estimate => r.estimate,
            }?;
            let x = r.predictor(x_var)?;
            Some(ScatterRow { y, x, color_var })
        })
        .collect();

    if standardize {
        let mut xs: Vec<f64> = rows.iter().map(|r| r.x).collect();
        standardize_in_place(&mut xs);
        for (row, x) in rows.iter_mut().zip(xs) {
            row.x = x;
        }
    }
    rows
}

/// z-score with the sample standard deviation (n - 1).
///
/// One value, or all-equal values, gives 0/0: the results are NaN and are
/// left that way.
pub fn standardize_in_place(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    let sd = (ss / (n - 1.0)).sqrt();
    for v in values.iter_mut() {
        *v = (*v - mean) / sd;
    }
}

// =============================================================================
// Derived views (rows + visual parameters + labels)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestView {
    pub rows: Vec<ForestRow>,
    pub params: VisualParams,
    pub factor: Factor,
    pub model_label: &'static str,
    pub caption: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterView {
    pub rows: Vec<ScatterRow>,
    pub params: VisualParams,
    pub color_factor: Option<Factor>,
    pub x_label: &'static str,
    pub y_label: &'static str,
}

pub fn derive_forest(dataset: &Dataset, sel: &SelectionState) -> ForestView {
    let _scope = ProfileScope::with_context("derive_forest", &[("factor", json!(sel.color_factor.as_str()))]);
    let rows = forest_view(dataset, sel.framework, sel.color_factor, &sel.active_categories);
    ForestView {
        params: visual_params(rows.len()),
        rows,
        factor: sel.color_factor,
        model_label: labels::x_label(sel.framework),
        caption: labels::forest_caption(sel.include_submitted),
    }
}

pub fn derive_scatter(dataset: &Dataset, sel: &SelectionState) -> ScatterView {
    let _scope = ProfileScope::new("derive_scatter");
    let rows = scatter_view(
        dataset,
        sel.scatter_y_var,
        sel.scatter_x_var,
        sel.scatter_color_factor,
        sel.standardize_x,
    );
    ScatterView {
        params: visual_params(rows.len()),
        rows,
        color_factor: sel.scatter_color_factor,
        x_label: labels::scatter_x_label(sel.scatter_x_var),
        y_label: labels::scatter_y_label(sel.scatter_y_var),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetRow, Framework};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn models() -> Dataset {
        let mut rows = Vec::new();
        for (i, (outcome, fw)) in [
            (Some("f0"), Framework::Frequentist),
            (Some("duration"), Framework::Bayesian),
            (Some("f0"), Framework::Bayesian),
            (None, Framework::Frequentist),
        ]
        .into_iter()
        .enumerate()
        {
            let mut r = DatasetRow::new(&format!("m{}", i), fw, i as f64 * 0.1);
            r.outcome = outcome.map(str::to_string);
            r.estimate = Some(i as f64 * 0.2);
            r.years_from_phd = Some(i as f64 + 1.0);
            rows.push(r);
        }
        Dataset::from_rows(rows).unwrap()
    }

    #[test]
    fn visual_params_at_zero_and_150() {
        let p0 = visual_params(0);
        assert!(close(p0.point_size, 2.90) && close(p0.line_size, 2.75) && close(p0.stroke_size, 2.50));
        let p = visual_params(150);
        assert!(close(p.point_size, 1.40));
        assert!(close(p.line_size, 1.25));
        assert!(close(p.stroke_size, 1.00));
    }

    #[test]
    fn visual_params_not_clamped() {
        assert!(visual_params(400).stroke_size < 0.0);
    }

    #[test]
    fn forest_keeps_only_active_non_missing() {
        let ds = models();
        let active = BTreeSet::from(["f0".to_string()]);
        let rows = forest_view(&ds, FrameworkFilter::Any, Factor::Outcome, &active);
        let ids: Vec<&str> = rows.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m2"]);
        assert!(rows.iter().all(|r| r.color_var == "f0"));
    }

    #[test]
    fn forest_framework_filter() {
        let ds = models();
        let all = available_categories(&ds, Factor::Outcome);
        let rows = forest_view(&ds, FrameworkFilter::Bayesian, Factor::Outcome, &all);
        let ids: Vec<&str> = rows.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn forest_empty_selection_is_empty() {
        let ds = models();
        assert!(forest_view(&ds, FrameworkFilter::Any, Factor::Outcome, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn categories_skip_missing() {
        let ds = models();
        let cats: Vec<String> = available_categories(&ds, Factor::Outcome).into_iter().collect();
        assert_eq!(cats, vec!["duration".to_string(), "f0".to_string()]);
        assert!(available_categories(&ds, Factor::Typicality).is_empty());
    }

    #[test]
    fn scatter_drops_missing_color_when_colored() {
        let ds = models();
        let plain = scatter_view(&ds, ScatterY::PostMean, Predictor::YearsFromPhd, None, false);
        assert_eq!(plain.len(), 4);
        assert!(plain.iter().all(|r| r.color_var.is_none()));
        let colored = scatter_view(
            &ds,
            ScatterY::PostMean,
            Predictor::YearsFromPhd,
            Some(Factor::Outcome),
            false,
        );
        assert_eq!(colored.len(), 3);
    }

    #[test]
    fn scatter_drops_missing_x() {
        let ds = models();
        assert!(scatter_view(&ds, ScatterY::Estimate, Predictor::PriorBelief, None, false).is_empty());
    }

    #[test]
    fn standardize_one_two_three() {
        let mut xs = vec![1.0, 2.0, 3.0];
        standardize_in_place(&mut xs);
        assert!(close(xs[0], -1.0) && close(xs[1], 0.0) && close(xs[2], 1.0));
    }

    #[test]
    fn standardize_single_value_is_nan() {
        let mut xs = vec![4.0];
        standardize_in_place(&mut xs);
        assert!(xs[0].is_nan());
    }

    #[test]
    fn standardize_uses_filtered_rows() {
        // Colored by outcome, m3 (x = 4) drops out; remaining x = 1, 2, 3.
        let ds = models();
        let rows = scatter_view(
            &ds,
            ScatterY::PostMean,
            Predictor::YearsFromPhd,
            Some(Factor::Outcome),
            true,
        );
        let xs: Vec<f64> = rows.iter().map(|r| r.x).collect();
        assert!(close(xs[0], -1.0) && close(xs[1], 0.0) && close(xs[2], 1.0));
    }

    #[test]
    fn derive_forest_uses_row_count() {
        let ds = models();
        let sel = SelectionState::new(&ds);
        let v = derive_forest(&ds, &sel);
        assert_eq!(v.rows.len(), 3);
        assert_eq!(v.params, visual_params(3));
        assert_eq!(v.model_label, "All models");
        assert!(v.caption.is_some());
    }
}
