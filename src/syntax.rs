//! Source text to syntax tree.
//!
//! ```text
//! source ── tokenize (lexer.rs) ──▶ Vec<Token> ── Parser (parser.rs) ──▶ Program (ast.rs)
//!                 │                                    │
//!                 └──── DiagnosticLog ◀────────────────┘
//! ```
//!
//! Neither stage ever fails: malformed input is reported into the
//! [`DiagnosticLog`](crate::diagnostics::DiagnosticLog) with its exact
//! position, and the parser resynchronizes at the next declaration keyword so
//! one run can surface several syntax errors. Recovery details (skipped tokens)
//! go to `tracing` only.
//!
//! - `lexer.rs`: logos-generated tokenizer; comments and whitespace are skipped.
//! - `expected.rs`: bit sets of token kinds used to phrase "expecting ..."
//!   messages.
//! - `ast.rs`: the closed syntax tree (one enum per grammar production).
//! - `parser.rs`: hand-written recursive descent over the token vector.

#[path = "syntax/ast.rs"]
pub(crate) mod ast;
#[path = "syntax/expected.rs"]
mod expected;
#[path = "syntax/lexer.rs"]
mod lexer;
#[path = "syntax/parser.rs"]
mod parser;

pub(crate) use parser::parse;
