//! Tokenizer.
//!
//! Whitespace (newlines included) and `//` line comments are skipped. There is
//! no block comment form: `/*` would collide with the `*/*/-1` date syntax.

use crate::Span;
use crate::diagnostics::DiagnosticLog;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub(crate) enum TokenKind {
    // === Keywords ===
    #[token("var")]
    Var,
    #[token("date")]
    Date,
    #[token("at")]
    At,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("options")]
    Options,

    // === Literals ===
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,
    #[regex(r"[0-9]+(\.[0-9]*)?|\.[0-9]+")]
    Number,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    // === Assignment ===
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,

    // === Comparison / logic ===
    #[token("==")]
    EqEq,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token("<=")]
    LtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    // === Arithmetic ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
}

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

/// Split `source` into tokens.
///
/// Unrecognized characters are reported as `token recognition error at: '<ch>'`
/// and dropped, so the parser still sees the rest of the input.
pub(crate) fn tokenize<'src>(source: &'src str, log: &mut DiagnosticLog<'_>) -> Vec<Token<'src>> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        match result {
            Ok(kind) => tokens.push(Token { kind, text: lexer.slice(), span }),
            Err(()) => {
                tracing::debug!(start = span.start, text = lexer.slice(), "dropping unrecognized input");
                log.report(span, format!("token recognition error at: '{}'", lexer.slice()));
            }
        }
    }

    tokens
}
