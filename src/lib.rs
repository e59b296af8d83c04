//! Reactive filtering and chart-spec engine for a meta-analysis dashboard.
//!
//! ```text
//! control event ──► selection::apply ──► SelectionState
//!                                             │
//!            Dataset (Arc, read-only) ──► view::derive_* ──► chart::build_* ──► ChartSpec
//! ```

pub mod chart;
pub mod config;
pub mod data;
pub mod labels;
pub mod logging;
pub mod selection;
pub mod server;
pub mod session;
pub mod view;
