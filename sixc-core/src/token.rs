//! Tokens produced by the lexer.

use core::fmt;

/// 1-based line and column of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Closed set of terminal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    /// `int`, `string`, `boolean`
    Type,
    If,
    While,
    Print,
    /// A single lowercase letter or space inside a string literal.
    Char,
    Digit,
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    /// `==` or `!=`
    BoolOp,
    Assign,
    /// `true` or `false`
    BoolVal,
    /// `+`
    IntOp,
    Quote,
    /// The `$` sentinel.
    Eof,
}

impl TokenKind {
    /// Human readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Type => "type",
            TokenKind::If => "'if'",
            TokenKind::While => "'while'",
            TokenKind::Print => "'print'",
            TokenKind::Char => "character",
            TokenKind::Digit => "digit",
            TokenKind::ParenOpen => "'('",
            TokenKind::ParenClose => "')'",
            TokenKind::BraceOpen => "'{'",
            TokenKind::BraceClose => "'}'",
            TokenKind::BoolOp => "boolean operator",
            TokenKind::Assign => "'='",
            TokenKind::BoolVal => "boolean value",
            TokenKind::IntOp => "'+'",
            TokenKind::Quote => "'\"'",
            TokenKind::Eof => "'$'",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(lexeme: impl Into<String>, kind: TokenKind, position: Position) -> Self {
        Token {
            lexeme: lexeme.into(),
            kind,
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' [{:?}] at {}", self.lexeme, self.kind, self.position)
    }
}
