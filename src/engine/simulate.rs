//! Day-by-day simulation.
//!
//! Each day clones the previous day's state, applies every rule in
//! declaration order and emits the result, so the first sample is the state
//! *after* the start date's rules ran. The run is a pure function of the
//! compiled script, the start date and the number of days.

use super::binder::{CompiledRule, CompiledScript};
use super::options::GraphOptions;
use super::state::State;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The horizon runs past the last date chrono can represent.
    #[error("day {day} after {start} is outside the supported calendar range")]
    DateOutOfRange { start: NaiveDate, day: usize },
}

/// Samples for the chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphData {
    /// One series per tracked variable (same order as
    /// `options.state_keys_props`), each `options.nr_days` long. Non-finite
    /// values serialize as `null`.
    pub data: Vec<Vec<f64>>,
    /// `(min, max)` over all samples, always including zero.
    pub range: (f64, f64),
    pub options: GraphOptions,
}

/// Run `rules` over `days` days starting at `start`, calling `visit` with each
/// day's post-rule snapshot. Returns the last snapshot (or `initial` when
/// `days` is zero).
pub(crate) fn for_each_day(
    initial: &State,
    rules: &[CompiledRule],
    start: NaiveDate,
    days: usize,
    mut visit: impl FnMut(usize, NaiveDate, &State),
) -> Result<State, SimulationError> {
    let mut state = initial.clone();
    let mut date = start;

    for day in 0..days {
        if day > 0 {
            date = date.succ_opt().ok_or(SimulationError::DateOutOfRange { start, day })?;
        }
        let mut next = state.clone();
        for rule in rules {
            rule.apply(&mut next, date, day);
        }
        visit(day, date, &next);
        state = next;
    }

    Ok(state)
}

impl CompiledScript {
    /// All `days` post-rule snapshots starting at `start`.
    pub fn run(&self, start: NaiveDate, days: usize) -> Result<Vec<State>, SimulationError> {
        let mut snapshots = Vec::with_capacity(days);
        for_each_day(&self.initial_state, &self.rules, start, days, |_, _, state| snapshots.push(state.clone()))?;
        Ok(snapshots)
    }

    /// Only the state after the last simulated day.
    pub fn final_state(&self, start: NaiveDate, days: usize) -> Result<State, SimulationError> {
        for_each_day(&self.initial_state, &self.rules, start, days, |_, _, _| {})
    }

    /// Simulate the script's own horizon and extract the tracked series.
    pub fn graph_data(&self) -> Result<GraphData, SimulationError> {
        self.simulate_graph().map(|(graph, _)| graph)
    }

    pub(crate) fn simulate_graph(&self) -> Result<(GraphData, State), SimulationError> {
        let options = &self.options;
        let days = options.nr_days as usize;
        let slots: Vec<Option<usize>> =
            options.state_keys_props.iter().map(|props| self.initial_state.slot_of(&props.key)).collect();

        let mut data: Vec<Vec<f64>> = slots.iter().map(|_| Vec::with_capacity(days)).collect();
        let mut range = (0.0_f64, 0.0_f64);

        let last = for_each_day(&self.initial_state, &self.rules, options.start_date, days, |_, _, state| {
            for (series, slot) in data.iter_mut().zip(&slots) {
                let value = slot.map_or(f64::NAN, |slot| state.slot(slot));
                range = (range.0.min(value), range.1.max(value));
                series.push(value);
            }
        })?;

        tracing::debug!(days, series = data.len(), min = range.0, max = range.1, "simulated");
        Ok((GraphData { data, range, options: options.clone() }, last))
    }
}
