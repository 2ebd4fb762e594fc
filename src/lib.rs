//! Trend script: a tiny declarative language for forecasting numeric state.
//!
//! A script declares named numeric variables, named recurring date patterns and
//! rules that mutate the variables on matching days:
//!
//! ```text
//! var account = 10000 { label: "Checking account" }
//! var salary = 5000
//!
//! date endOfMonth = *-*--1
//!
//! at endOfMonth, account += salary
//!
//! options {
//!   startDate: "2024-01-01"
//!   duration: "2y"
//! }
//! ```
//!
//! [`evaluate`] runs the whole pipeline (parse, bind, simulate) and returns
//! either positioned [`Diagnostic`]s or a [`GraphData`] with one series per
//! tracked variable.
//!
//! ```
//! use trendscript::evaluate;
//!
//! let out = evaluate("var a = 1\nat *-*-*, a += 1").unwrap();
//! assert!(out.diagnostics.is_empty());
//! assert!(out.graph.is_some());
//! ```

#[macro_use]
mod macros;
mod api;
mod date_pattern;
mod diagnostics;
mod engine;
mod syntax;

pub use api::{
    Compilation, Evaluation, EvaluationDetails, EvaluationVerbose, EvaluateOptions, compile, evaluate, evaluate_verbose_with,
    evaluate_with,
};
pub use date_pattern::{DatePart, DatePattern, DatePatternError};
pub use diagnostics::{Diagnostic, line_start_offset};
pub use engine::{
    ChartType, CompiledRule, CompiledScript, EvaluationMetrics, GraphData, GraphOptions, Legend, OptionError, SimulationError, State,
    StateKeyProps,
};

// --- Internal types ---------------------------------------------------------

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Span {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span { start: self.start.min(other.start), end: self.end.max(other.end) }
    }
}
