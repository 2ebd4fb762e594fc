//! Syntax tree.
//!
//! Each grammar production is one closed enum, so every consumer (the binder
//! and the evaluator) handles all node kinds through exhaustive `match`es.
//! Nodes keep the byte spans the binder needs for positioned diagnostics.

use crate::Span;

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Program {
    pub declarations: Vec<Declaration>,
    /// The single trailing `options { ... }` block, if any.
    pub options: Option<PropertyList>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Declaration {
    /// `var <name> = <expr> [{ props }]`
    Var { name: Ident, init: NumberExpr, props: Option<PropertyList> },
    /// `date <name> = <pattern>`
    Date { name: Ident, pattern: DatePatternLit },
    /// `at <pattern-expr>, <action>`
    Rule { when: DatePatternExpr, action: Action },
}

/// One `Y-M-D` part as written; `None` is the `*` wildcard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PartLit {
    pub value: Option<i64>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DatePatternLit {
    pub year: PartLit,
    pub month: PartLit,
    pub day: PartLit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DatePatternExpr {
    Literal(DatePatternLit),
    Named(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    /// `name (= | += | -= | *= | /=) expr`
    Assign { target: Ident, op: AssignOp, value: NumberExpr },
    /// `if (cond) { ... } [else { ... } | else if ...]`
    Conditional { condition: BoolExpr, then_action: Box<Action>, else_action: Option<Box<Action>> },
    /// `{ action* }`
    Block(Vec<Action>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NumberExpr {
    Literal { value: f64, span: Span },
    Reference(Ident),
    Negate(Box<NumberExpr>),
    Binary { op: ArithOp, lhs: Box<NumberExpr>, rhs: Box<NumberExpr> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoolExpr {
    Compare { op: CompareOp, lhs: NumberExpr, rhs: NumberExpr },
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    /// IEEE-754 semantics: division by zero yields ±inf or NaN.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

impl CompareOp {
    /// Native float comparison: anything involving NaN is false.
    #[allow(clippy::float_cmp)]
    pub fn apply(self, a: f64, b: f64) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
            CompareOp::GtEq => a >= b,
            CompareOp::LtEq => a <= b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// New value of a variable currently holding `current`.
    pub fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            AssignOp::Set => value,
            AssignOp::Add => current + value,
            AssignOp::Sub => current - value,
            AssignOp::Mul => current * value,
            AssignOp::Div => current / value,
        }
    }
}

/// `{ key: value ... }`, used both for inline variable properties and for the
/// trailing options block.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct PropertyList {
    pub entries: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Property {
    pub key: Ident,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PropertyValue {
    Str { value: String, span: Span },
    Number { value: f64, span: Span },
    /// A bare identifier, e.g. `chartType: area`.
    Name(Ident),
}

impl PropertyValue {
    pub fn span(&self) -> Span {
        match self {
            PropertyValue::Str { span, .. } | PropertyValue::Number { span, .. } => *span,
            PropertyValue::Name(ident) => ident.span,
        }
    }
}
