//! Node payloads shared by the concrete and abstract syntax trees.

use core::fmt;

use crate::token::{Position, Token};
use crate::tree::Tree;

/// Nonterminals of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
    Program,
    Block,
    StatementList,
    Statement,
    PrintStatement,
    AssignmentStatement,
    VarDecl,
    WhileStatement,
    IfStatement,
    Expr,
    IntExpr,
    StringExpr,
    BoolExpr,
    Id,
    CharList,
    Type,
    Digit,
    BoolOp,
    BoolVal,
    IntOp,
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarNode {
    /// A matched terminal. In the AST an operator token also acts as a
    /// branch: its operands hang below it.
    Leaf(Token),
    Branch(Production),
    /// A string literal collapsed from its character tokens (AST only).
    StringLiteral { text: String, position: Position },
}

impl GrammarNode {
    pub fn production(&self) -> Option<Production> {
        match self {
            GrammarNode::Branch(p) => Some(*p),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            GrammarNode::Leaf(token) => Some(token),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            GrammarNode::Leaf(token) => Some(token.position),
            GrammarNode::StringLiteral { position, .. } => Some(*position),
            GrammarNode::Branch(_) => None,
        }
    }

    pub fn is(&self, production: Production) -> bool {
        self.production() == Some(production)
    }
}

impl fmt::Display for GrammarNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarNode::Leaf(token) => f.write_str(&token.lexeme),
            GrammarNode::Branch(production) => write!(f, "{production}"),
            GrammarNode::StringLiteral { text, .. } => write!(f, "\"{text}\""),
        }
    }
}

pub type SyntaxTree = Tree<GrammarNode>;

/// Outline of a syntax tree, one node per line.
pub fn render(tree: &SyntaxTree) -> String {
    tree.render(|node| node.to_string())
}

/// Tokens of every leaf in source order.
pub fn leaf_tokens(tree: &SyntaxTree) -> Vec<&Token> {
    tree.preorder()
        .into_iter()
        .filter_map(|id| tree.value(id).token())
        .collect()
}
