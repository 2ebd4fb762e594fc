//! Expression and action compilation.
//!
//! Every AST node becomes a boxed closure over [`State`]. Name references are
//! resolved to slots here, once, against the variables declared so far; an
//! unknown name is reported and replaced by a neutral closure (NaN for numbers,
//! a no-op for assignments) so the rest of the script is still analyzed.

use super::state::State;
use crate::diagnostics::DiagnosticLog;
use crate::syntax::ast::{Action, BoolExpr, Ident, NumberExpr};

pub(crate) type NumberFn = Box<dyn Fn(&State) -> f64 + Send + Sync>;
pub(crate) type ConditionFn = Box<dyn Fn(&State) -> bool + Send + Sync>;
pub(crate) type ActionFn = Box<dyn Fn(&mut State) + Send + Sync>;

pub(crate) struct Compiler<'a, 'log, 'src> {
    scope: &'a State,
    log: &'log mut DiagnosticLog<'src>,
}

impl<'a, 'log, 'src> Compiler<'a, 'log, 'src> {
    /// Compile against the variables declared in `scope`.
    pub fn new(scope: &'a State, log: &'log mut DiagnosticLog<'src>) -> Self {
        Compiler { scope, log }
    }

    fn resolve(&mut self, ident: &Ident) -> Option<usize> {
        let slot = self.scope.slot_of(&ident.name);
        if slot.is_none() {
            self.log.report(ident.span, format!("var `{}` not found", ident.name));
        }
        slot
    }

    pub fn number(&mut self, expr: &NumberExpr) -> NumberFn {
        match expr {
            NumberExpr::Literal { value, .. } => {
                let value = *value;
                Box::new(move |_| value)
            }
            NumberExpr::Reference(ident) => match self.resolve(ident) {
                Some(slot) => Box::new(move |state| state.slot(slot)),
                None => Box::new(|_| f64::NAN),
            },
            NumberExpr::Negate(inner) => {
                let inner = self.number(inner);
                Box::new(move |state| -inner(state))
            }
            NumberExpr::Binary { op, lhs, rhs } => {
                let op = *op;
                let lhs = self.number(lhs);
                let rhs = self.number(rhs);
                Box::new(move |state| op.apply(lhs(state), rhs(state)))
            }
        }
    }

    pub fn condition(&mut self, expr: &BoolExpr) -> ConditionFn {
        match expr {
            BoolExpr::Compare { op, lhs, rhs } => {
                let op = *op;
                let lhs = self.number(lhs);
                let rhs = self.number(rhs);
                Box::new(move |state| op.apply(lhs(state), rhs(state)))
            }
            BoolExpr::And(a, b) => {
                let a = self.condition(a);
                let b = self.condition(b);
                Box::new(move |state| a(state) && b(state))
            }
            BoolExpr::Or(a, b) => {
                let a = self.condition(a);
                let b = self.condition(b);
                Box::new(move |state| a(state) || b(state))
            }
        }
    }

    pub fn action(&mut self, action: &Action) -> ActionFn {
        match action {
            Action::Assign { target, op, value } => {
                let slot = self.resolve(target);
                let op = *op;
                let value = self.number(value);
                match slot {
                    Some(slot) => Box::new(move |state| {
                        let rhs = value(state);
                        if let Some(current) = state.slot_mut(slot) {
                            *current = op.apply(*current, rhs);
                        }
                    }),
                    None => Box::new(|_| {}),
                }
            }
            Action::Conditional { condition, then_action, else_action } => {
                let condition = self.condition(condition);
                let then_action = self.action(then_action);
                match else_action {
                    Some(else_action) => {
                        let else_action = self.action(else_action);
                        Box::new(move |state| {
                            if condition(state) { then_action(state) } else { else_action(state) }
                        })
                    }
                    None => Box::new(move |state| {
                        if condition(state) {
                            then_action(state)
                        }
                    }),
                }
            }
            Action::Block(actions) => {
                let actions: Vec<ActionFn> = actions.iter().map(|a| self.action(a)).collect();
                match actions.len() {
                    0 => Box::new(|_| {}),
                    _ => Box::new(move |state| {
                        for action in &actions {
                            action(state);
                        }
                    }),
                }
            }
        }
    }
}
