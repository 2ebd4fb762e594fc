//! Sets of token kinds, used to phrase "expecting ..." diagnostics.
//!
//! Rendering follows the familiar parser-generator convention: a single item is
//! printed bare (`'='`), several items are braced (`{'=', '+='}`), and end of
//! input is `<EOF>`.

use super::lexer::TokenKind;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Expected: u64 {
        const EOF          = 1 << 0;
        const VAR          = 1 << 1;
        const DATE         = 1 << 2;
        const AT           = 1 << 3;
        const OPTIONS      = 1 << 4;
        const IF           = 1 << 5;
        const ELSE         = 1 << 6;
        const NAME         = 1 << 7;
        const NUMBER       = 1 << 8;
        const STRING       = 1 << 9;
        const ASSIGN       = 1 << 10;
        const PLUS_ASSIGN  = 1 << 11;
        const MINUS_ASSIGN = 1 << 12;
        const STAR_ASSIGN  = 1 << 13;
        const SLASH_ASSIGN = 1 << 14;
        const EQ_EQ        = 1 << 15;
        const GT           = 1 << 16;
        const LT           = 1 << 17;
        const GT_EQ        = 1 << 18;
        const LT_EQ        = 1 << 19;
        const AND_AND      = 1 << 20;
        const OR_OR        = 1 << 21;
        const PLUS         = 1 << 22;
        const MINUS        = 1 << 23;
        const STAR         = 1 << 24;
        const SLASH        = 1 << 25;
        const LPAREN       = 1 << 26;
        const RPAREN       = 1 << 27;
        const LBRACE       = 1 << 28;
        const RBRACE       = 1 << 29;
        const COMMA        = 1 << 30;
        const COLON        = 1 << 31;
        const SEMICOLON    = 1 << 32;

        const ASSIGN_OPS = Self::ASSIGN.bits()
            | Self::PLUS_ASSIGN.bits()
            | Self::MINUS_ASSIGN.bits()
            | Self::STAR_ASSIGN.bits()
            | Self::SLASH_ASSIGN.bits();
        const COMPARISON_OPS = Self::EQ_EQ.bits()
            | Self::GT.bits()
            | Self::LT.bits()
            | Self::GT_EQ.bits()
            | Self::LT_EQ.bits();
        const NUMBER_START = Self::NUMBER.bits() | Self::NAME.bits() | Self::LPAREN.bits() | Self::MINUS.bits();
        const ACTION_START = Self::NAME.bits() | Self::IF.bits() | Self::LBRACE.bits();
        const DATE_PART = Self::STAR.bits() | Self::NUMBER.bits() | Self::MINUS.bits();
        const DATE_SEPARATOR = Self::MINUS.bits() | Self::SLASH.bits();
        const PROPERTY_VALUE = Self::STRING.bits() | Self::NUMBER.bits() | Self::NAME.bits() | Self::MINUS.bits();
    }
}

const DISPLAY: &[(Expected, &str)] = &[
    (Expected::EOF, "<EOF>"),
    (Expected::VAR, "'var'"),
    (Expected::DATE, "'date'"),
    (Expected::AT, "'at'"),
    (Expected::OPTIONS, "'options'"),
    (Expected::IF, "'if'"),
    (Expected::ELSE, "'else'"),
    (Expected::NAME, "Name"),
    (Expected::NUMBER, "Number"),
    (Expected::STRING, "String"),
    (Expected::ASSIGN, "'='"),
    (Expected::PLUS_ASSIGN, "'+='"),
    (Expected::MINUS_ASSIGN, "'-='"),
    (Expected::STAR_ASSIGN, "'*='"),
    (Expected::SLASH_ASSIGN, "'/='"),
    (Expected::EQ_EQ, "'=='"),
    (Expected::GT, "'>'"),
    (Expected::LT, "'<'"),
    (Expected::GT_EQ, "'>='"),
    (Expected::LT_EQ, "'<='"),
    (Expected::AND_AND, "'&&'"),
    (Expected::OR_OR, "'||'"),
    (Expected::PLUS, "'+'"),
    (Expected::MINUS, "'-'"),
    (Expected::STAR, "'*'"),
    (Expected::SLASH, "'/'"),
    (Expected::LPAREN, "'('"),
    (Expected::RPAREN, "')'"),
    (Expected::LBRACE, "'{'"),
    (Expected::RBRACE, "'}'"),
    (Expected::COMMA, "','"),
    (Expected::COLON, "':'"),
    (Expected::SEMICOLON, "';'"),
];

impl Expected {
    /// The single-bit set for a token kind.
    pub(crate) fn of(kind: TokenKind) -> Expected {
        match kind {
            TokenKind::Var => Expected::VAR,
            TokenKind::Date => Expected::DATE,
            TokenKind::At => Expected::AT,
            TokenKind::If => Expected::IF,
            TokenKind::Else => Expected::ELSE,
            TokenKind::Options => Expected::OPTIONS,
            TokenKind::Name => Expected::NAME,
            TokenKind::Number => Expected::NUMBER,
            TokenKind::Str => Expected::STRING,
            TokenKind::Assign => Expected::ASSIGN,
            TokenKind::PlusAssign => Expected::PLUS_ASSIGN,
            TokenKind::MinusAssign => Expected::MINUS_ASSIGN,
            TokenKind::StarAssign => Expected::STAR_ASSIGN,
            TokenKind::SlashAssign => Expected::SLASH_ASSIGN,
            TokenKind::EqEq => Expected::EQ_EQ,
            TokenKind::Gt => Expected::GT,
            TokenKind::Lt => Expected::LT,
            TokenKind::GtEq => Expected::GT_EQ,
            TokenKind::LtEq => Expected::LT_EQ,
            TokenKind::AndAnd => Expected::AND_AND,
            TokenKind::OrOr => Expected::OR_OR,
            TokenKind::Plus => Expected::PLUS,
            TokenKind::Minus => Expected::MINUS,
            TokenKind::Star => Expected::STAR,
            TokenKind::Slash => Expected::SLASH,
            TokenKind::LParen => Expected::LPAREN,
            TokenKind::RParen => Expected::RPAREN,
            TokenKind::LBrace => Expected::LBRACE,
            TokenKind::RBrace => Expected::RBRACE,
            TokenKind::Comma => Expected::COMMA,
            TokenKind::Colon => Expected::COLON,
            TokenKind::Semicolon => Expected::SEMICOLON,
        }
    }

    /// Does the set contain `kind`?
    pub(crate) fn accepts(self, kind: TokenKind) -> bool {
        self.contains(Expected::of(kind))
    }

    /// Render as `'x'` or `{'x', 'y'}`.
    pub(crate) fn render(self) -> String {
        let items: Vec<&str> = DISPLAY.iter().filter(|(bit, _)| self.contains(*bit)).map(|(_, s)| *s).collect();
        match items.as_slice() {
            [] => "<nothing>".to_string(),
            [one] => (*one).to_string(),
            many => format!("{{{}}}", many.join(", ")),
        }
    }
}
