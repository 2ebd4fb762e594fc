use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::engine::{self, CompiledScript, EvaluationMetrics, GraphData, SimulationError, State};
use crate::{Span, syntax};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::time::Instant;

/// Call-level settings.
///
/// `start_date` and `days`, when set, override the script's `options` block,
/// which in turn overrides the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluateOptions {
    /// "Today": the default start date and the anchor for relative
    /// `startDate` values such as `"next monday"`.
    pub reference_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub days: Option<u32>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        let reference_date = if cfg!(test) {
            NaiveDate::from_ymd_opt(2000, 2, 2).unwrap_or_default()
        } else {
            Local::now().date_naive()
        };
        Self { reference_date, start_date: None, days: None }
    }
}

/// Result of [`evaluate`] and [`evaluate_with`].
///
/// Exactly one of the two is meaningful: a non-empty `diagnostics` means the
/// script was not simulated and `graph` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub diagnostics: Vec<Diagnostic>,
    pub graph: Option<GraphData>,
}

/// Result of [`compile`].
#[derive(Debug)]
pub struct Compilation {
    /// The bound script; `None` whenever `diagnostics` is non-empty.
    pub script: Option<CompiledScript>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Additional details returned by [`evaluate_verbose_with`].
#[derive(Debug, Clone, Default)]
pub struct EvaluationDetails {
    pub metrics: EvaluationMetrics,
    /// State after the last simulated day.
    pub final_state: Option<State>,
    /// Variables plotted, in declaration order.
    pub tracked_keys: Vec<String>,
    /// Declared date names, in declaration order.
    pub date_names: Vec<String>,
}

/// Result of [`evaluate_verbose_with`].
#[derive(Debug, Clone)]
pub struct EvaluationVerbose {
    pub evaluation: Evaluation,
    pub details: EvaluationDetails,
}

/// Parse and bind `source` without simulating it.
///
/// Binding is skipped when parsing produced diagnostics; the script is only
/// returned when neither stage reported anything.
pub fn compile(source: &str, options: &EvaluateOptions) -> Compilation {
    compile_timed(source, options, &mut EvaluationMetrics::default())
}

fn compile_timed(source: &str, options: &EvaluateOptions, metrics: &mut EvaluationMetrics) -> Compilation {
    let mut log = DiagnosticLog::new(source);

    let (program, parse_time) = engine::timed(|| syntax::parse(source, &mut log));
    metrics.parse = parse_time;
    if !log.is_empty() {
        tracing::debug!(diagnostics = log.len(), "syntax errors; skipping binding");
        return Compilation { script: None, diagnostics: log.into_diagnostics() };
    }

    let (mut script, bind_time) = engine::timed(|| engine::bind(&program, options.reference_date, &mut log));
    metrics.bind = bind_time;
    if !log.is_empty() {
        tracing::debug!(diagnostics = log.len(), "semantic errors; not simulating");
        return Compilation { script: None, diagnostics: log.into_diagnostics() };
    }

    if let Some(start) = options.start_date {
        script.options.start_date = start;
    }
    if let Some(days) = options.days {
        script.options.nr_days = days;
    }
    // Call-level overrides have no source position; they are reported at 1:1.
    let horizon = engine::check_days(script.options.nr_days).and_then(|days| engine::check_horizon(script.options.start_date, days));
    if let Err(err) = horizon {
        log.report(Span::new(0, 0), err.to_string());
        return Compilation { script: None, diagnostics: log.into_diagnostics() };
    }
    Compilation { script: Some(script), diagnostics: Vec::new() }
}

/// Evaluate `source` with a default [`EvaluateOptions`] (today as reference).
///
/// # Example
/// ```
/// use trendscript::evaluate;
///
/// let out = evaluate("var a = 1\nat *-*-*, a += 1\noptions { duration: \"3d\" }").unwrap();
/// assert_eq!(out.graph.unwrap().data, vec![vec![2.0, 3.0, 4.0]]);
/// ```
pub fn evaluate(source: &str) -> Result<Evaluation, SimulationError> {
    evaluate_with(source, &EvaluateOptions::default())
}

/// Parse, bind and simulate `source`.
///
/// User mistakes, including a horizon that runs off the end of the calendar,
/// come back as `Ok` with diagnostics. The `Err` case is unreachable for
/// horizons checked at compile time.
pub fn evaluate_with(source: &str, options: &EvaluateOptions) -> Result<Evaluation, SimulationError> {
    let compilation = compile(source, options);
    let graph = match &compilation.script {
        Some(script) => Some(script.graph_data()?),
        None => None,
    };
    Ok(Evaluation { diagnostics: compilation.diagnostics, graph })
}

/// Like [`evaluate_with`], plus stage timings and the final state.
pub fn evaluate_verbose_with(source: &str, options: &EvaluateOptions) -> Result<EvaluationVerbose, SimulationError> {
    let started = Instant::now();
    let mut details = EvaluationDetails::default();
    let compilation = compile_timed(source, options, &mut details.metrics);

    let graph = match &compilation.script {
        Some(script) => {
            details.tracked_keys = script.options().state_keys_props.iter().map(|p| p.key.clone()).collect();
            details.date_names = script.dates().iter().map(|(name, _)| name.clone()).collect();

            let (result, simulate_time) = engine::timed(|| script.simulate_graph());
            details.metrics.simulate = simulate_time;
            let (graph, last) = result?;
            details.final_state = Some(last);
            Some(graph)
        }
        None => None,
    };

    details.metrics.total = started.elapsed();
    Ok(EvaluationVerbose { evaluation: Evaluation { diagnostics: compilation.diagnostics, graph }, details })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(days: u32) -> EvaluateOptions {
        EvaluateOptions { days: Some(days), ..EvaluateOptions::default() }
    }

    #[test]
    fn default_reference_is_fixed_under_test() {
        assert_eq!(EvaluateOptions::default().reference_date, NaiveDate::from_ymd_opt(2000, 2, 2).unwrap());
    }

    #[test]
    fn explicit_options_override_the_script() {
        let source = "var a = 0\nat *-*-*, a += 1\noptions { startDate: \"2020-01-01\", duration: \"1y\" }";
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let out = evaluate_with(source, &EvaluateOptions { start_date: Some(start), ..options(4) }).unwrap();

        let graph = out.graph.unwrap();
        assert_eq!(graph.options.start_date, start);
        assert_eq!(graph.options.nr_days, 4);
        assert_eq!(graph.data[0].len(), 4);
    }

    #[test]
    fn oversized_overrides_are_diagnostics() {
        let out = evaluate_with("var a = 1", &options(u32::MAX)).unwrap();
        assert_eq!(out.diagnostics, vec![Diagnostic::new(1, 1, "duration \"4294967295d\" exceeds the maximum of 36600 days")]);
        assert!(out.graph.is_none());

        let start = NaiveDate::MAX;
        let out = evaluate_with("var a = 1", &EvaluateOptions { start_date: Some(start), ..options(2) }).unwrap();
        assert_eq!(out.diagnostics, vec![Diagnostic::new(1, 1, format!("2 days from {start} run past the last supported date"))]);
    }

    #[test]
    fn diagnostics_suppress_the_graph() {
        let out = evaluate_with("var a = b", &options(3)).unwrap();
        assert_eq!(out.diagnostics, vec![Diagnostic::new(1, 9, "var `b` not found")]);
        assert!(out.graph.is_none());
    }

    #[test]
    fn syntax_errors_skip_binding() {
        // `ghost` would be a binding error, but the parse error comes first.
        let compilation = compile("var a = ghost\nvar", &options(3));
        assert!(compilation.script.is_none());
        assert_eq!(compilation.diagnostics.len(), 1);
        assert!(compilation.diagnostics[0].message.starts_with("mismatched input '<EOF>'"));
    }

    #[test]
    fn compile_exposes_the_bound_script() {
        let compilation = compile("var a = 2\ndate d = *-*--1\nat d, a *= 2", &options(10));
        let script = compilation.script.unwrap();
        assert_eq!(script.initial_state().get("a"), Some(2.0));
        assert_eq!(script.dates()[0].0, "d");
        assert_eq!(script.rules().len(), 1);
        assert_eq!(script.options().nr_days, 10);
    }

    #[test]
    fn verbose_reports_details() {
        let source = "var a = 1\nvar h = 0 { color: \"hidden\" }\ndate every = *-*-*\nat every, { a += 1; h -= 1 }";
        let out = evaluate_verbose_with(source, &options(3)).unwrap();

        assert!(out.evaluation.diagnostics.is_empty());
        assert_eq!(out.evaluation.graph.unwrap().data, vec![vec![2.0, 3.0, 4.0]]);
        assert_eq!(out.details.tracked_keys, vec!["a"]);
        assert_eq!(out.details.date_names, vec!["every"]);

        let last = out.details.final_state.unwrap();
        assert_eq!(last.get("h"), Some(-3.0));
        assert!(out.details.metrics.parse <= out.details.metrics.total);
        assert!(out.details.metrics.simulate <= out.details.metrics.total);
    }

    #[test]
    fn evaluation_serializes_for_the_renderer() {
        let out = evaluate_with("var a = 1", &options(2)).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["diagnostics"], serde_json::json!([]));
        assert_eq!(json["graph"]["data"], serde_json::json!([[1.0, 1.0]]));
        assert_eq!(json["graph"]["range"], serde_json::json!([0.0, 1.0]));
        assert_eq!(json["graph"]["options"]["stateKeysProps"][0]["key"], "a");
    }
}
