//! Recursive descent parser.
//!
//! Grammar (whitespace and `;` separators omitted):
//!
//! ```text
//! program      := declaration* options? EOF
//! declaration  := 'var' Name '=' number props?
//!               | 'date' Name '=' pattern
//!               | 'at' (Name | pattern) ',' action
//! options      := 'options' props
//! props        := '{' (Name ':' value ','?)* '}'
//! pattern      := part sep part sep part          sep  := '-' | '/'
//! part         := '*' | '-'? Number
//! action       := Name assign-op number
//!               | 'if' '(' condition ')' block ('else' (block | action-if))?
//!               | block
//! block        := '{' action* '}'
//! condition    := and ('||' and)*
//! and          := comparison ('&&' comparison)*
//! comparison   := number ('==' | '>' | '<' | '>=' | '<=') number
//! number       := term (('+' | '-') term)*
//! term         := unary (('*' | '/') unary)*
//! unary        := '-' unary | Number | Name | '(' number ')'
//! ```
//!
//! Errors are reported once, at the offending token, and unwind to the
//! enclosing declaration via [`Reported`]. The parser then skips to the next
//! declaration keyword and carries on, so independent mistakes are all
//! surfaced in one run.

use super::ast::{
    Action, ArithOp, AssignOp, BoolExpr, CompareOp, DatePatternExpr, DatePatternLit, Declaration, Ident, NumberExpr,
    PartLit, Program, Property, PropertyList, PropertyValue,
};
use super::expected::Expected;
use super::lexer::{Token, TokenKind, tokenize};
use crate::Span;
use crate::diagnostics::DiagnosticLog;

/// Marker: a diagnostic has already been logged for this failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reported;

type PResult<T> = Result<T, Reported>;

/// Tokenize and parse `source`, logging every lexical and syntax error.
///
/// Always returns a (possibly partial) program; callers must check the log
/// before trusting it.
pub(crate) fn parse(source: &str, log: &mut DiagnosticLog<'_>) -> Program {
    let tokens = tokenize(source, log);
    let mut parser = Parser { tokens, pos: 0, eof: Span::new(source.len(), source.len()), log };
    parser.program()
}

struct Parser<'src, 'log, 'a> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    eof: Span,
    log: &'log mut DiagnosticLog<'a>,
}

impl<'src> Parser<'src, '_, '_> {
    // --- Token stream -------------------------------------------------------

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.check(kind) { self.advance() } else { None }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token<'src>> {
        match self.eat(kind) {
            Some(token) => Ok(token),
            None => Err(self.mismatch(Expected::of(kind))),
        }
    }

    fn current_span(&self) -> Span {
        self.peek().map_or(self.eof, |t| t.span)
    }

    fn current_text(&self) -> &'src str {
        self.peek().map_or("<EOF>", |t| t.text)
    }

    /// Log `mismatched input '<tok>' expecting <set>` at the current token.
    fn mismatch(&mut self, expected: Expected) -> Reported {
        let message = format!("mismatched input '{}' expecting {}", self.current_text(), expected.render());
        self.log.report(self.current_span(), message);
        Reported
    }

    fn skip_semicolons(&mut self) {
        while self.eat(TokenKind::Semicolon).is_some() {}
    }

    /// Skip ahead to the next declaration keyword (or EOF).
    fn synchronize(&mut self) {
        let from = self.pos;
        while let Some(kind) = self.peek_kind() {
            if matches!(kind, TokenKind::Var | TokenKind::Date | TokenKind::At | TokenKind::Options) {
                break;
            }
            self.pos += 1;
        }
        tracing::debug!(skipped = self.pos - from, at = self.current_span().start, "parser resynchronized");
    }

    // --- Program ------------------------------------------------------------

    fn program(&mut self) -> Program {
        let mut program = Program::default();

        loop {
            self.skip_semicolons();
            match self.peek_kind() {
                None => break,
                Some(TokenKind::Var | TokenKind::Date | TokenKind::At) => match self.declaration() {
                    Ok(decl) => program.declarations.push(decl),
                    Err(Reported) => self.synchronize(),
                },
                Some(TokenKind::Options) => {
                    self.advance();
                    match self.property_list() {
                        Ok(props) => program.options = Some(props),
                        Err(Reported) => self.synchronize(),
                    }
                    self.trailing_input();
                    break;
                }
                Some(_) => {
                    self.extraneous();
                    self.advance();
                    self.synchronize();
                }
            }
        }

        program
    }

    /// Nothing but separators may follow the options block.
    fn trailing_input(&mut self) {
        self.skip_semicolons();
        if self.peek().is_some() {
            self.extraneous();
            let skipped = self.tokens.len() - self.pos;
            self.pos = self.tokens.len();
            tracing::debug!(skipped, "ignoring input after options block");
        }
    }

    fn extraneous(&mut self) {
        let message = format!("extraneous input '{}' expecting {}", self.current_text(), Expected::EOF.render());
        self.log.report(self.current_span(), message);
    }

    // --- Declarations -------------------------------------------------------

    fn declaration(&mut self) -> PResult<Declaration> {
        let Some(keyword) = self.advance() else {
            return Err(self.mismatch(Expected::VAR | Expected::DATE | Expected::AT));
        };
        match keyword.kind {
            TokenKind::Var => {
                let name = self.ident()?;
                self.expect(TokenKind::Assign)?;
                let init = self.number()?;
                let props = if self.check(TokenKind::LBrace) { Some(self.property_list()?) } else { None };
                Ok(Declaration::Var { name, init, props })
            }
            TokenKind::Date => {
                let name = self.ident()?;
                self.expect(TokenKind::Assign)?;
                let pattern = self.date_pattern()?;
                Ok(Declaration::Date { name, pattern })
            }
            _ => {
                let when = if self.check(TokenKind::Name) {
                    DatePatternExpr::Named(self.ident()?)
                } else {
                    DatePatternExpr::Literal(self.date_pattern()?)
                };
                self.expect(TokenKind::Comma)?;
                let action = self.action()?;
                Ok(Declaration::Rule { when, action })
            }
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        let token = self.expect(TokenKind::Name)?;
        Ok(Ident { name: token.text.to_string(), span: token.span })
    }

    fn property_list(&mut self) -> PResult<PropertyList> {
        self.expect(TokenKind::LBrace)?;
        let mut list = PropertyList::default();

        loop {
            while self.eat(TokenKind::Comma).is_some() || self.eat(TokenKind::Semicolon).is_some() {}
            if self.eat(TokenKind::RBrace).is_some() {
                return Ok(list);
            }
            if !self.check(TokenKind::Name) {
                return Err(self.mismatch(Expected::NAME | Expected::RBRACE));
            }
            let key = self.ident()?;
            self.expect(TokenKind::Colon)?;
            let value = self.property_value()?;
            list.entries.push(Property { key, value });
        }
    }

    fn property_value(&mut self) -> PResult<PropertyValue> {
        match self.peek_kind() {
            Some(TokenKind::Str) => {
                let token = self.advance().ok_or(Reported)?;
                Ok(PropertyValue::Str { value: unquote(token.text), span: token.span })
            }
            Some(TokenKind::Name) => Ok(PropertyValue::Name(self.ident()?)),
            Some(TokenKind::Number | TokenKind::Minus) => {
                let start = self.current_span();
                let negative = self.eat(TokenKind::Minus).is_some();
                let token = self.expect(TokenKind::Number)?;
                let value = self.number_value(token)?;
                Ok(PropertyValue::Number { value: if negative { -value } else { value }, span: start.to(token.span) })
            }
            _ => Err(self.mismatch(Expected::PROPERTY_VALUE)),
        }
    }

    // --- Date patterns ------------------------------------------------------

    fn date_pattern(&mut self) -> PResult<DatePatternLit> {
        let year = self.date_part()?;
        self.date_separator()?;
        let month = self.date_part()?;
        self.date_separator()?;
        let day = self.date_part()?;
        Ok(DatePatternLit { year, month, day })
    }

    fn date_separator(&mut self) -> PResult<()> {
        match self.peek_kind() {
            Some(kind) if Expected::DATE_SEPARATOR.accepts(kind) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.mismatch(Expected::DATE_SEPARATOR)),
        }
    }

    fn date_part(&mut self) -> PResult<PartLit> {
        if let Some(star) = self.eat(TokenKind::Star) {
            return Ok(PartLit { value: None, span: star.span });
        }
        if !matches!(self.peek_kind(), Some(TokenKind::Number | TokenKind::Minus)) {
            return Err(self.mismatch(Expected::DATE_PART));
        }

        let start = self.current_span();
        let negative = self.eat(TokenKind::Minus).is_some();
        let token = self.expect(TokenKind::Number)?;
        let span = start.to(token.span);
        let magnitude: i64 = match token.text.parse() {
            Ok(v) => v,
            Err(_) => {
                self.log.report(token.span, format!("invalid date part '{}', expected an integer or '*'", token.text));
                return Err(Reported);
            }
        };
        Ok(PartLit { value: Some(if negative { -magnitude } else { magnitude }), span })
    }

    // --- Actions ------------------------------------------------------------

    fn action(&mut self) -> PResult<Action> {
        match self.peek_kind() {
            Some(TokenKind::Name) => {
                let target = self.ident()?;
                let op = match self.peek_kind() {
                    Some(TokenKind::Assign) => AssignOp::Set,
                    Some(TokenKind::PlusAssign) => AssignOp::Add,
                    Some(TokenKind::MinusAssign) => AssignOp::Sub,
                    Some(TokenKind::StarAssign) => AssignOp::Mul,
                    Some(TokenKind::SlashAssign) => AssignOp::Div,
                    _ => return Err(self.mismatch(Expected::ASSIGN_OPS)),
                };
                self.advance();
                let value = self.number()?;
                Ok(Action::Assign { target, op, value })
            }
            Some(TokenKind::If) => self.conditional(),
            Some(TokenKind::LBrace) => self.block(),
            _ => Err(self.mismatch(Expected::ACTION_START)),
        }
    }

    fn conditional(&mut self) -> PResult<Action> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.condition()?;
        self.expect(TokenKind::RParen)?;
        let then_action = Box::new(self.block()?);

        let else_action = if self.eat(TokenKind::Else).is_some() {
            match self.peek_kind() {
                Some(TokenKind::If) => Some(Box::new(self.conditional()?)),
                Some(TokenKind::LBrace) => Some(Box::new(self.block()?)),
                _ => return Err(self.mismatch(Expected::IF | Expected::LBRACE)),
            }
        } else {
            None
        };

        Ok(Action::Conditional { condition, then_action, else_action })
    }

    fn block(&mut self) -> PResult<Action> {
        self.expect(TokenKind::LBrace)?;
        let mut actions = Vec::new();

        loop {
            self.skip_semicolons();
            if self.eat(TokenKind::RBrace).is_some() {
                return Ok(Action::Block(actions));
            }
            if self.peek().is_none() {
                return Err(self.mismatch(Expected::ACTION_START | Expected::RBRACE));
            }
            actions.push(self.action()?);
        }
    }

    // --- Expressions --------------------------------------------------------

    fn condition(&mut self) -> PResult<BoolExpr> {
        let mut lhs = self.conjunction()?;
        while self.eat(TokenKind::OrOr).is_some() {
            let rhs = self.conjunction()?;
            lhs = BoolExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> PResult<BoolExpr> {
        let mut lhs = self.comparison()?;
        while self.eat(TokenKind::AndAnd).is_some() {
            let rhs = self.comparison()?;
            lhs = BoolExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> PResult<BoolExpr> {
        let lhs = self.number()?;
        let op = match self.peek_kind() {
            Some(TokenKind::EqEq) => CompareOp::Eq,
            Some(TokenKind::Gt) => CompareOp::Gt,
            Some(TokenKind::Lt) => CompareOp::Lt,
            Some(TokenKind::GtEq) => CompareOp::GtEq,
            Some(TokenKind::LtEq) => CompareOp::LtEq,
            _ => return Err(self.mismatch(Expected::COMPARISON_OPS | Expected::PLUS | Expected::MINUS | Expected::STAR | Expected::SLASH)),
        };
        self.advance();
        let rhs = self.number()?;
        Ok(BoolExpr::Compare { op, lhs, rhs })
    }

    fn number(&mut self) -> PResult<NumberExpr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = NumberExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn term(&mut self) -> PResult<NumberExpr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = NumberExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn unary(&mut self) -> PResult<NumberExpr> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.advance();
                Ok(NumberExpr::Negate(Box::new(self.unary()?)))
            }
            Some(TokenKind::Number) => {
                let token = self.advance().ok_or(Reported)?;
                Ok(NumberExpr::Literal { value: self.number_value(token)?, span: token.span })
            }
            Some(TokenKind::Name) => Ok(NumberExpr::Reference(self.ident()?)),
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.number()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.mismatch(Expected::NUMBER_START)),
        }
    }

    fn number_value(&mut self, token: Token<'_>) -> PResult<f64> {
        token.text.parse::<f64>().map_err(|_| {
            self.log.report(token.span, format!("invalid number '{}'", token.text));
            Reported
        })
    }
}

/// Strip the surrounding quotes and resolve `\x` escapes to `x`.
fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Diagnostic;

    fn parse_ok(source: &str) -> Program {
        let mut log = DiagnosticLog::new(source);
        let program = parse(source, &mut log);
        assert!(log.is_empty(), "unexpected diagnostics: {:?}", log.into_diagnostics());
        program
    }

    fn parse_err(source: &str) -> Vec<Diagnostic> {
        let mut log = DiagnosticLog::new(source);
        parse(source, &mut log);
        log.into_diagnostics()
    }

    fn lit(value: f64) -> NumberExpr {
        NumberExpr::Literal { value, span: Span::default() }
    }

    /// Drop spans so trees can be compared structurally.
    fn shape(expr: &NumberExpr) -> String {
        match expr {
            NumberExpr::Literal { value, .. } => value.to_string(),
            NumberExpr::Reference(ident) => ident.name.clone(),
            NumberExpr::Negate(inner) => format!("(-{})", shape(inner)),
            NumberExpr::Binary { op, lhs, rhs } => {
                let sym = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                };
                format!("({} {} {})", shape(lhs), sym, shape(rhs))
            }
        }
    }

    fn value<'p>(props: &'p PropertyList, key: &str) -> Option<&'p PropertyValue> {
        props.entries.iter().find(|p| p.key.name == key).map(|p| &p.value)
    }

    fn var_init(program: &Program, idx: usize) -> &NumberExpr {
        match &program.declarations[idx] {
            Declaration::Var { init, .. } => init,
            other => panic!("expected var, got {other:?}"),
        }
    }

    #[test]
    fn parses_declarations_in_order() {
        let program = parse_ok(
            "var a = 1
             date b = *-*-*
             at b, a += 1",
        );
        assert_eq!(program.declarations.len(), 3);
        assert!(matches!(program.declarations[0], Declaration::Var { ref name, .. } if name.name == "a"));
        assert!(matches!(program.declarations[1], Declaration::Date { ref name, .. } if name.name == "b"));
        assert!(matches!(
            program.declarations[2],
            Declaration::Rule { when: DatePatternExpr::Named(ref n), action: Action::Assign { op: AssignOp::Add, .. } }
                if n.name == "b"
        ));
        assert!(program.options.is_none());
    }

    #[test]
    fn semicolons_are_optional_separators() {
        let program = parse_ok("var a=1; date b=*-*-*; at b, a+=1;");
        assert_eq!(program.declarations.len(), 3);
    }

    #[test]
    fn arithmetic_precedence_and_grouping() {
        let program = parse_ok("var a = 1 + 2 * 3 - 4 / 2\nvar b = 1 + (.8 / 100)\nvar c = -a * 2");
        assert_eq!(shape(var_init(&program, 0)), "((1 + (2 * 3)) - (4 / 2))");
        assert_eq!(shape(var_init(&program, 1)), "(1 + (0.8 / 100))");
        assert_eq!(shape(var_init(&program, 2)), "((-a) * 2)");
    }

    #[test]
    fn literal_number_expression() {
        let program = parse_ok("var a = 1.05");
        assert_eq!(shape(var_init(&program, 0)), shape(&lit(1.05)));
    }

    #[test]
    fn date_patterns_with_both_separators() {
        let program = parse_ok("date a = *-*--1\ndate b = */12/-2\ndate c = 2024-03-15");
        let parts = |idx: usize| match &program.declarations[idx] {
            Declaration::Date { pattern, .. } => (pattern.year.value, pattern.month.value, pattern.day.value),
            other => panic!("expected date, got {other:?}"),
        };
        assert_eq!(parts(0), (None, None, Some(-1)));
        assert_eq!(parts(1), (None, Some(12), Some(-2)));
        assert_eq!(parts(2), (Some(2024), Some(3), Some(15)));
    }

    #[test]
    fn inline_rule_pattern_and_blocks() {
        let program = parse_ok(
            "at 2024-*-1, {
                a += 1; b *= 2
                if (a > 1 && b <= 2 || a == 0) { a = 0 } else if (a < 0) { a = 1 } else { }
             }",
        );
        let Declaration::Rule { when, action } = &program.declarations[0] else {
            panic!("expected rule");
        };
        assert!(matches!(when, DatePatternExpr::Literal(p) if p.year.value == Some(2024) && p.month.value.is_none()));
        let Action::Block(actions) = action else {
            panic!("expected block");
        };
        assert_eq!(actions.len(), 3);
        let Action::Conditional { condition, else_action, .. } = &actions[2] else {
            panic!("expected conditional");
        };
        assert!(matches!(condition, BoolExpr::Or(lhs, _) if matches!(**lhs, BoolExpr::And(..))));
        let Some(else_action) = else_action else {
            panic!("expected else branch");
        };
        assert!(matches!(**else_action, Action::Conditional { else_action: Some(ref e), .. } if **e == Action::Block(vec![])));
    }

    #[test]
    fn var_properties_and_trailing_options() {
        let program = parse_ok(
            r#"var account = 10000 { label: "Checking \"main\"", color: "hidden" }
               options {
                 startDate: "Jan 1 2024"
                 duration: "5y"
                 height: 200
                 chartType: area
               }"#,
        );
        let Declaration::Var { props: Some(props), .. } = &program.declarations[0] else {
            panic!("expected var with props");
        };
        assert!(matches!(value(props, "label"), Some(PropertyValue::Str { value, .. }) if value == "Checking \"main\""));
        let options = program.options.expect("options block");
        assert_eq!(options.entries.len(), 4);
        assert!(matches!(value(&options, "height"), Some(PropertyValue::Number { value, .. }) if *value == 200.0));
        assert!(matches!(value(&options, "chartType"), Some(PropertyValue::Name(i)) if i.name == "area"));
    }

    #[test]
    fn garbage_reports_extraneous_input() {
        assert_eq!(parse_err("abc"), vec![Diagnostic::new(1, 1, "extraneous input 'abc' expecting <EOF>")]);
    }

    #[test]
    fn garbage_is_reported_once_then_skipped_to_next_declaration() {
        let diags = parse_err("abc def 12\nvar a = 1\nvar b =");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "extraneous input 'abc' expecting <EOF>");
        assert_eq!(diags[1], Diagnostic::new(3, 8, "mismatched input '<EOF>' expecting {Name, Number, '-', '('}"));
    }

    #[test]
    fn mismatched_tokens_name_the_expected_set() {
        let diags = parse_err("var a 1\nat b a += 1\nat b, a ++ 1");
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "mismatched input '1' expecting '='",
                "mismatched input 'a' expecting ','",
                "mismatched input '+' expecting {'=', '+=', '-=', '*=', '/='}",
            ]
        );
        assert_eq!((diags[1].line, diags[1].column), (2, 6));
    }

    #[test]
    fn malformed_date_parts() {
        let diags = parse_err("date a = *-1.5-*\ndate b = *-*");
        assert_eq!(diags[0], Diagnostic::new(1, 12, "invalid date part '1.5', expected an integer or '*'"));
        assert_eq!(diags[1].message, "mismatched input '<EOF>' expecting {'-', '/'}");
    }

    #[test]
    fn unclosed_block_reports_at_eof() {
        let diags = parse_err("at *-*-*, { a += 1");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "mismatched input '<EOF>' expecting {'if', Name, '{', '}'}");
    }

    #[test]
    fn declarations_after_options_are_extraneous() {
        let diags = parse_err("options { height: 100 }\nvar a = 1\nvar b = 2");
        assert_eq!(diags, vec![Diagnostic::new(2, 1, "extraneous input 'var' expecting <EOF>")]);
    }

    #[test]
    fn unquote_resolves_escapes() {
        assert_eq!(unquote(r#""a\"b\\c""#), "a\"b\\c");
        assert_eq!(unquote(r#""""#), "");
    }
}
