//! Binding and simulation engine.
//!
//! The engine takes a parsed [`Program`](crate::syntax::ast::Program) and
//! turns it into series:
//!
//! ```text
//! Program ── bind (binder.rs) ──▶ CompiledScript ── simulate (simulate.rs) ──▶ GraphData
//!              │                    ├ initial State     (state.rs)
//!              │                    ├ named dates
//!              │                    ├ CompiledRule[]    (closures from compile.rs)
//!              │                    └ GraphOptions      (options.rs)
//!              └──▶ DiagnosticLog
//! ```
//!
//! ## Responsibilities by module
//!
//! - `state.rs`: the slot-addressed variable snapshot cloned once per day.
//! - `compile.rs`: number, condition and action nodes to boxed closures.
//! - `options.rs`: property lists (var props, options block) to typed values.
//! - `binder.rs`: the two-phase semantic pass producing a `CompiledScript`.
//! - `simulate.rs`: the day loop, tracked-series extraction and value range.
//! - `metrics.rs`: stage timings for verbose runs.
//!
//! ## Debugging
//!
//! Binding and simulation summaries are emitted through `tracing` at `debug`
//! and `trace` level; the binary shows them with `TRENDSCRIPT_LOG=debug`.

#[path = "engine/binder.rs"]
mod binder;
#[path = "engine/compile.rs"]
mod compile;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/options.rs"]
mod options;
#[path = "engine/simulate.rs"]
mod simulate;
#[path = "engine/state.rs"]
mod state;


pub(crate) use binder::bind;
pub use binder::{CompiledRule, CompiledScript};
pub(crate) use metrics::timed;
pub(crate) use options::{check_days, check_horizon};
pub use metrics::EvaluationMetrics;
pub use options::{ChartType, GraphOptions, Legend, OptionError, StateKeyProps};
pub use simulate::{GraphData, SimulationError};
pub use state::State;
