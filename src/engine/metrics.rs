//! Per-stage timings for verbose runs.
//!
//! Collected by [`evaluate_verbose_with`](crate::evaluate_verbose_with) and
//! printed by the binary's report. Stages that did not run (binding after a
//! syntax error, simulation after any diagnostic) stay at zero.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EvaluationMetrics {
    /// Wall time of the whole call.
    pub total: Duration,
    /// Tokenizing and parsing.
    pub parse: Duration,
    /// Semantic binding, including options resolution.
    pub bind: Duration,
    /// Day-by-day simulation and series extraction.
    pub simulate: Duration,
}

/// Run `f` and return its result with the elapsed time.
pub(crate) fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}
