//! Simulation state: one `f64` per declared variable.
//!
//! Variables are addressed by slot (their declaration index) once a script is
//! bound, so compiled expressions never hash names at run time. The name table
//! is shared between all daily snapshots; cloning a `State` copies only the
//! values.

use std::fmt;
use std::sync::Arc;

#[derive(Clone, PartialEq, Default)]
pub struct State {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl State {
    /// Current value of `name`, if it was declared.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| n == name).map(|idx| self.values[idx])
    }

    /// `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Variable names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Declare `name` with an initial value and return its slot.
    pub(crate) fn declare(&mut self, name: &str, value: f64) -> usize {
        let mut names = self.names.to_vec();
        names.push(name.to_string());
        self.names = names.into();
        self.values.push(value);
        self.values.len() - 1
    }

    /// Value in `slot`; NaN for a slot that does not exist.
    pub(crate) fn slot(&self, slot: usize) -> f64 {
        self.values.get(slot).copied().unwrap_or(f64::NAN)
    }

    pub(crate) fn slot_mut(&mut self, slot: usize) -> Option<&mut f64> {
        self.values.get_mut(slot)
    }

    /// Slot of `name`, if declared.
    pub(crate) fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_read_back() {
        let mut state = State::default();
        assert!(state.is_empty());
        assert_eq!(state.declare("a", 1.0), 0);
        assert_eq!(state.declare("b", 2.5), 1);

        assert_eq!(state.len(), 2);
        assert_eq!(state.get("b"), Some(2.5));
        assert_eq!(state.get("missing"), None);
        assert_eq!(state.slot_of("a"), Some(0));
        assert!(state.slot(7).is_nan());
        assert_eq!(state.iter().collect::<Vec<_>>(), vec![("a", 1.0), ("b", 2.5)]);
    }

    #[test]
    fn clones_share_names_but_not_values() {
        let mut day0 = State::default();
        day0.declare("a", 1.0);
        let mut day1 = day0.clone();
        *day1.slot_mut(0).unwrap() += 1.0;

        assert_eq!(day0.get("a"), Some(1.0));
        assert_eq!(day1.get("a"), Some(2.0));
        assert!(Arc::ptr_eq(&day0.names, &day1.names));
    }

    #[test]
    fn debug_prints_as_map() {
        let mut state = State::default();
        state.declare("account", 10.0);
        assert_eq!(format!("{state:?}"), r#"{"account": 10.0}"#);
    }
}
