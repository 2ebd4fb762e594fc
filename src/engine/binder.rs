//! Semantic binding: syntax tree to [`CompiledScript`].
//!
//! Binding runs in two phases:
//!
//! 1. Every `date` declaration is collected into the named-date table, so
//!    rules may refer to dates declared anywhere in the script.
//! 2. Declarations are walked in source order. Variables are evaluated
//!    against the state built so far (a variable sees only earlier ones),
//!    rules are compiled into closures, and finally the options block is
//!    resolved.
//!
//! Problems are reported into the [`DiagnosticLog`] and replaced by neutral
//! values so that one pass surfaces as many of them as possible.

use super::compile::{ActionFn, Compiler};
use super::options::{self, GraphOptions, HIDDEN_COLOR, StateKeyProps};
use super::state::State;
use crate::Span;
use crate::date_pattern::{DatePart, DatePattern, DatePatternError};
use crate::diagnostics::DiagnosticLog;
use crate::syntax::ast::{DatePatternExpr, DatePatternLit, Declaration, PartLit, Program};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Applies one rule to a day's snapshot.
pub(crate) type RuleFn = Box<dyn Fn(&mut State, NaiveDate, usize) + Send + Sync>;

/// A rule ready to run: `(state, date, day index) -> ()`.
pub struct CompiledRule {
    /// Human-readable origin, e.g. `at *-*--1` or `at payday`.
    pub description: String,
    apply: RuleFn,
}

impl CompiledRule {
    pub(crate) fn new(description: impl Into<String>, apply: RuleFn) -> Self {
        CompiledRule { description: description.into(), apply }
    }

    /// Run `action` on every date matched by `pattern`.
    pub(crate) fn on(description: impl Into<String>, pattern: DatePattern, action: ActionFn) -> Self {
        Self::new(description, Box::new(move |state, date, _day| {
            if pattern.matches(date) {
                action(state)
            }
        }))
    }

    pub(crate) fn apply(&self, state: &mut State, date: NaiveDate, day: usize) {
        (self.apply)(state, date, day)
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule").field("description", &self.description).field("apply", &"<function>").finish()
    }
}

/// A bound script: initial state, named dates, compiled rules and options.
///
/// Produced by [`compile`](crate::compile) only when the script has no
/// diagnostics. Running it is a pure function of its start date and horizon.
#[derive(Debug)]
pub struct CompiledScript {
    pub(crate) initial_state: State,
    pub(crate) dates: Vec<(String, DatePattern)>,
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) options: GraphOptions,
}

impl CompiledScript {
    /// Variable values before any rule has run.
    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Named dates in declaration order.
    pub fn dates(&self) -> &[(String, DatePattern)] {
        &self.dates
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }
}

// --- Binding -----------------------------------------------------------------

/// Bind `program`, resolving relative option values against `reference`.
pub(crate) fn bind(program: &Program, reference: NaiveDate, log: &mut DiagnosticLog<'_>) -> CompiledScript {
    // Phase 1: named dates. The first declaration of a name wins; an invalid
    // pattern is kept as `never` so references to it do not cascade.
    let built: Vec<Option<Result<DatePattern, (Span, DatePatternError)>>> = program
        .declarations
        .iter()
        .map(|decl| match decl {
            Declaration::Date { pattern, .. } => Some(build_pattern(pattern)),
            _ => None,
        })
        .collect();

    let mut table: HashMap<&str, DatePattern> = HashMap::new();
    for (decl, pattern) in program.declarations.iter().zip(&built) {
        if let (Declaration::Date { name, .. }, Some(pattern)) = (decl, pattern) {
            table.entry(name.name.as_str()).or_insert_with(|| pattern.as_ref().ok().copied().unwrap_or_else(DatePattern::never));
        }
    }

    // Phase 2: source order.
    let mut state = State::default();
    let mut keys: Vec<StateKeyProps> = Vec::new();
    let mut dates: Vec<(String, DatePattern)> = Vec::new();
    let mut declared: HashSet<&str> = HashSet::new();
    let mut rules: Vec<CompiledRule> = Vec::new();

    for (decl, pattern) in program.declarations.iter().zip(&built) {
        match decl {
            Declaration::Var { name, init, props } => {
                let duplicate = state.slot_of(&name.name).is_some();
                if duplicate {
                    log.report(name.span, format!("var `{}` already exists", name.name));
                }

                let init = Compiler::new(&state, log).number(init);
                let value = init(&state);
                let props = options::resolve_var_props(&name.name, props.as_ref(), log);
                if duplicate {
                    continue;
                }

                state.declare(&name.name, value);
                if props.color.as_deref() == Some(HIDDEN_COLOR) {
                    tracing::trace!(var = %name.name, "hidden from graph");
                } else {
                    keys.push(props);
                }
            }
            Declaration::Date { name, .. } => {
                if let Some(Err((span, err))) = pattern {
                    log.report(*span, err.to_string());
                }
                if !declared.insert(name.name.as_str()) {
                    log.report(name.span, format!("date `{}` already exists", name.name));
                    continue;
                }
                if let Some(resolved) = table.get(name.name.as_str()) {
                    dates.push((name.name.clone(), *resolved));
                }
            }
            Declaration::Rule { when, action } => {
                let (description, pattern) = match when {
                    DatePatternExpr::Literal(lit) => {
                        let pattern = build_pattern(lit).unwrap_or_else(|(span, err)| {
                            log.report(span, err.to_string());
                            DatePattern::never()
                        });
                        (format!("at {pattern}"), pattern)
                    }
                    DatePatternExpr::Named(ident) => {
                        let pattern = table.get(ident.name.as_str()).copied().unwrap_or_else(|| {
                            log.report(ident.span, format!("date `{}` not found", ident.name));
                            DatePattern::never()
                        });
                        (format!("at {}", ident.name), pattern)
                    }
                };
                let action = Compiler::new(&state, log).action(action);
                rules.push(CompiledRule::on(description, pattern, action));
            }
        }
    }

    let options = options::resolve_graph_options(program.options.as_ref(), keys, reference, log);
    tracing::debug!(vars = state.len(), dates = dates.len(), rules = rules.len(), "bound script");

    CompiledScript { initial_state: state, dates, rules, options }
}

fn build_pattern(lit: &DatePatternLit) -> Result<DatePattern, (Span, DatePatternError)> {
    fn part(lit: PartLit) -> DatePart {
        match lit.value {
            None => DatePart::Any,
            Some(v) => DatePart::Exact(v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
        }
    }

    DatePattern::new(part(lit.year), part(lit.month), part(lit.day)).map_err(|err| {
        let span = match err {
            DatePatternError::NegativeYear(_) => lit.year.span,
            DatePatternError::MonthOutOfRange(_) => lit.month.span,
            DatePatternError::DayOutOfRange(_) => lit.day.span,
        };
        (span, err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Diagnostic;
    use crate::syntax::parse;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 2, 2).unwrap()
    }

    fn bind_source(source: &str) -> (CompiledScript, Vec<Diagnostic>) {
        let mut log = DiagnosticLog::new(source);
        let program = parse(source, &mut log);
        assert!(log.is_empty(), "syntax errors: {:?}", log.into_diagnostics());
        let script = bind(&program, reference(), &mut log);
        (script, log.into_diagnostics())
    }

    #[test]
    fn variables_see_only_earlier_variables() {
        let (script, diags) = bind_source("var a = 2\nvar b = a * 3\nvar c = d + 1\nvar d = 1");
        assert_eq!(diags, vec![Diagnostic::new(3, 9, "var `d` not found")]);

        let state = script.initial_state();
        assert_eq!(state.get("b"), Some(6.0));
        assert!(state.get("c").unwrap().is_nan());
        assert_eq!(state.get("d"), Some(1.0));
    }

    #[test]
    fn self_reference_is_not_found() {
        let (_, diags) = bind_source("var a = a + 1");
        assert_eq!(diags, vec![Diagnostic::new(1, 9, "var `a` not found")]);
    }

    #[test]
    fn duplicate_var_keeps_first_and_is_still_analyzed() {
        let (script, diags) = bind_source("var a = 1 { label: \"first\" }\nvar a = 5 + ghost { label: \"second\" }");
        assert_eq!(
            diags,
            vec![Diagnostic::new(2, 5, "var `a` already exists"), Diagnostic::new(2, 13, "var `ghost` not found")]
        );
        assert_eq!(script.initial_state().get("a"), Some(1.0));
        assert_eq!(script.initial_state().len(), 1);
        assert_eq!(script.options().state_keys_props[0].label, "first");
    }

    #[test]
    fn dates_resolve_forward_and_duplicates_keep_first() {
        let (script, diags) = bind_source("at later, a += 1\nvar a = 0\ndate later = *-*-1\ndate later = *-*-2");
        // The rule compiled before `a` was declared.
        assert_eq!(
            diags,
            vec![Diagnostic::new(1, 11, "var `a` not found"), Diagnostic::new(4, 6, "date `later` already exists")]
        );
        assert_eq!(script.dates().len(), 1);
        assert_eq!(script.dates()[0].1.to_string(), "*-*-1");
        assert_eq!(script.rules()[0].description, "at later");
    }

    #[test]
    fn unknown_date_never_fires() {
        let (script, diags) = bind_source("var a = 0\nat payday, a += 1");
        assert_eq!(diags, vec![Diagnostic::new(2, 4, "date `payday` not found")]);

        let mut state = script.initial_state().clone();
        script.rules()[0].apply(&mut state, reference(), 0);
        assert_eq!(state.get("a"), Some(0.0));
    }

    #[test]
    fn invalid_pattern_parts_are_reported_at_the_part() {
        let (script, diags) = bind_source("date bad = *-13-1\nvar a = 0\nat bad, a += 1\nat *-*-0, a += 1");
        assert_eq!(
            diags,
            vec![
                Diagnostic::new(1, 14, "month 13 is out of range 1..=12"),
                Diagnostic::new(4, 8, "day 0 is out of range (1..=31, or -31..=-1 counting back from the end of the month)"),
            ]
        );
        assert_eq!(script.rules().len(), 2);
    }

    #[test]
    fn hidden_variables_are_simulated_but_not_tracked() {
        let (script, diags) = bind_source(
            r#"var rate = 0.01 { color: "hidden" }
               var account = 100 { label: "Checking account", color: "blue" }"#,
        );
        assert!(diags.is_empty());
        assert_eq!(script.initial_state().len(), 2);
        assert_eq!(
            script.options().state_keys_props,
            vec![StateKeyProps { key: "account".into(), label: "Checking account".into(), color: Some("blue".into()) }]
        );
    }

    #[test]
    fn options_block_is_resolved_last() {
        let (script, diags) = bind_source("var a = 1\noptions { duration: \"4w\", height: 90 }");
        assert!(diags.is_empty());
        assert_eq!(script.options().nr_days, 28);
        assert_eq!(script.options().height_px, 90);
        assert_eq!(script.options().start_date, reference());
    }

    #[test]
    fn rule_closure_sees_date_and_applies_action() {
        let (script, _) = bind_source("var a = 0\nat *-*--1, a += 1");
        let rule = &script.rules()[0];
        assert_eq!(rule.description, "at *-*--1");

        let mut state = script.initial_state().clone();
        rule.apply(&mut state, NaiveDate::from_ymd_opt(2000, 2, 28).unwrap(), 0);
        assert_eq!(state.get("a"), Some(0.0));
        rule.apply(&mut state, NaiveDate::from_ymd_opt(2000, 2, 29).unwrap(), 1);
        assert_eq!(state.get("a"), Some(1.0));
        assert_eq!(format!("{rule:?}"), r#"CompiledRule { description: "at *-*--1", apply: "<function>" }"#);
    }
}
