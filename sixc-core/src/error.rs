use thiserror::Error;

use crate::token::Position;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unrecognized character '{character}' at {position}")]
    UnknownCharacter { character: char, position: Position },
    #[error("{character} is not allowed inside a string (at {position})")]
    InvalidStringCharacter {
        character: CharName,
        position: Position,
    },
    #[error("expected '=' after '!' at {position}")]
    UnterminatedBang { position: Position },
}

/// A character rendered by name rather than by escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharName(pub char);

impl core::fmt::Display for CharName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            '\n' => f.write_str("newline"),
            '\r' => f.write_str("carriage return"),
            '\t' => f.write_str("tab"),
            c if c.is_control() => write!(f, "control character U+{:04X}", c as u32),
            c => write!(f, "'{c}'"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} at {position}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: Position,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemanticError {
    #[error("variable '{name}' at {position} was already declared on line {original_line}")]
    DuplicateDeclaration {
        name: String,
        position: Position,
        original_line: usize,
    },
    #[error("use of unresolved identifier '{name}' at {position}")]
    UnresolvedIdentifier { name: String, position: Position },
    #[error("type mismatch at {position}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        position: Position,
    },
    #[error("semantic analysis requires a concrete syntax tree with a root")]
    EmptyTree,
}

/// Code generation failures. `UnresolvedSymbol` is an internal invariant
/// violation: the analyzer rejects every program that could trigger it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeGenError {
    #[error("internal error: reference to unresolved symbol '{name}'")]
    UnresolvedSymbol { name: String },
    #[error("internal error: malformed {node} node in AST")]
    MalformedAst { node: String },
    #[error("program does not fit in {limit} bytes")]
    OutOfMemory { limit: usize },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("code generation error: {0}")]
    CodeGen(#[from] CodeGenError),
}
