//! Sessions: one `SelectionState` each, over a shared read-only dataset.

use crate::chart::{build_forest, build_scatter, Canvas, ChartSpec, Variant};
use crate::data::Dataset;
use crate::logging::{log_chart, log_control, log_control_rejected};
use crate::selection::{apply, Affected, ControlError, ControlEvent, SelectionState};
use crate::view::{available_categories, derive_forest, derive_scatter};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The two named chart outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outputs {
    #[serde(rename = "postPlot")]
    pub post_plot: ChartSpec,
    #[serde(rename = "scatterPlot")]
    pub scatter_plot: ChartSpec,
}

#[derive(Debug)]
pub struct Session {
    id: u64,
    dataset: Arc<Dataset>,
    selection: SelectionState,
    canvas: Canvas,
}

impl Session {
    pub fn new(id: u64, dataset: Arc<Dataset>, canvas: Canvas) -> Self {
        let selection = SelectionState::new(&dataset);
        Self {
            id,
            dataset,
            selection,
            canvas,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Checkbox choices for the active forest factor.
    pub fn choices(&self) -> BTreeSet<String> {
        available_categories(&self.dataset, self.selection.color_factor)
    }

    /// Decode and apply one control event. A rejected event leaves the
    /// selection untouched.
    pub fn handle(&mut self, control: &str, value: &Value) -> Result<Affected, ControlError> {
        let event = ControlEvent::parse(control, value).map_err(|err| {
            log_control_rejected(self.id, control, &err.to_string());
            err
        })?;
        Ok(self.apply(event, value))
    }

    fn apply(&mut self, event: ControlEvent, raw: &Value) -> Affected {
        let control = event.control();
        let affected = apply(&mut self.selection, event, &self.dataset);
        log_control(self.id, control.as_str(), raw, self.selection.hash());
        affected
    }

    pub fn post_plot(&self) -> ChartSpec {
        let sel = &self.selection;
        let view = derive_forest(&self.dataset, sel);
        let spec = build_forest(view, sel.include_submitted, sel.hide_intervals, self.canvas);
        log_built(&spec);
        spec
    }

    pub fn scatter_plot(&self) -> ChartSpec {
        let sel = &self.selection;
        let view = derive_scatter(&self.dataset, sel);
        let spec = build_scatter(view, sel.add_regression, self.canvas);
        log_built(&spec);
        spec
    }

    pub fn render(&self) -> Outputs {
        Outputs {
            post_plot: self.post_plot(),
            scatter_plot: self.scatter_plot(),
        }
    }
}

fn log_built(spec: &ChartSpec) {
    let variant = match spec.variant {
        Variant::Forest(v) => v.as_str(),
        Variant::Scatter(v) => v.as_str(),
    };
    log_chart(spec.output, variant, spec.data.len());
}

/// Live sessions keyed by a monotonically increasing id; the oldest is
/// evicted once `max_sessions` is reached.
#[derive(Debug)]
pub struct SessionRegistry {
    dataset: Arc<Dataset>,
    canvas: Canvas,
    sessions: BTreeMap<u64, Session>,
    next_id: u64,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(dataset: Arc<Dataset>, canvas: Canvas, max_sessions: usize) -> Self {
        Self {
            dataset,
            canvas,
            sessions: BTreeMap::new(),
            next_id: 1,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn open(&mut self) -> &mut Session {
        while self.sessions.len() >= self.max_sessions {
            let Some(oldest) = self.sessions.keys().next().copied() else {
                break;
            };
            self.sessions.remove(&oldest);
        }
        let id = self.next_id;
        self.next_id += 1;
        let session = Session::new(id, Arc::clone(&self.dataset), self.canvas);
        self.sessions.entry(id).or_insert(session)
    }

    pub fn get(&self, id: u64) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn close(&mut self, id: u64) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
