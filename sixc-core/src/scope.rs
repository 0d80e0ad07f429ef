//! Scope tree and symbol table.
//!
//! Scopes live in an arena indexed by [`ScopeId`]; a scope owns its child
//! list and keeps its parent as a plain index. Symbols live in a second
//! arena so later stages can refer to one by [`SymbolId`] regardless of
//! shadowing.

use core::fmt::{self, Write as _};
use std::collections::BTreeMap;

use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(usize);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Int,
    Boolean,
    String,
    None,
}

impl VarType {
    pub fn from_keyword(keyword: &str) -> VarType {
        match keyword {
            "int" => VarType::Int,
            "boolean" => VarType::Boolean,
            "string" => VarType::String,
            _ => VarType::None,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VarType::Int => "int",
            VarType::Boolean => "boolean",
            VarType::String => "string",
            VarType::None => "none",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub declared_type: VarType,
    pub token: Token,
    pub scope: ScopeId,
    pub initialized: bool,
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    symbols: BTreeMap<String, SymbolId>,
}

impl Scope {
    pub fn symbols(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.symbols.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the top-level scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope::default()],
            symbols: Vec::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Create a child of `parent` and return it.
    pub fn adopt(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    /// Register a new symbol. The caller checks for duplicates first.
    pub fn declare(&mut self, scope: ScopeId, declared_type: VarType, token: Token) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        let name = token.lexeme.clone();
        self.symbols.push(Symbol {
            name: name.clone(),
            declared_type,
            token,
            scope,
            initialized: false,
            used: false,
        });
        self.scopes[scope.0].symbols.insert(name, id);
        id
    }

    /// Look a name up in `scope` only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.0].symbols.get(name).copied()
    }

    /// Look a name up from `scope` outward; the innermost match wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.lookup_local(id, name) {
                return Some(symbol);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Pre-order walk of all scopes.
    pub fn walk(&self) -> Vec<ScopeId> {
        let mut out = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.scopes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn depth(&self, mut id: ScopeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.scopes[id.0].parent {
            depth += 1;
            id = parent;
        }
        depth
    }

    /// Symbol table listing, one symbol per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for scope in self.walk() {
            for (_, id) in self.scope(scope).symbols() {
                let symbol = self.symbol(id);
                let _ = writeln!(
                    out,
                    "{} {} scope {} line {}",
                    symbol.name,
                    symbol.declared_type,
                    self.depth(scope),
                    symbol.token.position.line
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Position, TokenKind};

    fn ident(name: &str, line: usize) -> Token {
        Token::new(name, TokenKind::Identifier, Position::new(line, 1))
    }

    #[test]
    fn lookup_walks_outward() {
        let mut tree = ScopeTree::new();
        let outer = tree.adopt(tree.root());
        let inner = tree.adopt(outer);
        let a = tree.declare(outer, VarType::Int, ident("a", 1));
        assert_eq!(tree.lookup(inner, "a"), Some(a));
        assert_eq!(tree.lookup_local(inner, "a"), None);
        assert_eq!(tree.lookup(outer, "b"), None);
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let mut tree = ScopeTree::new();
        let outer = tree.adopt(tree.root());
        let inner = tree.adopt(outer);
        let outer_a = tree.declare(outer, VarType::Int, ident("a", 1));
        let inner_a = tree.declare(inner, VarType::String, ident("a", 2));
        assert_eq!(tree.lookup(inner, "a"), Some(inner_a));
        assert_eq!(tree.lookup(outer, "a"), Some(outer_a));
        assert_eq!(tree.symbol(inner_a).declared_type, VarType::String);
    }

    #[test]
    fn walks_scopes_in_nesting_order() {
        let mut tree = ScopeTree::new();
        let first = tree.adopt(tree.root());
        let nested = tree.adopt(first);
        let second = tree.adopt(tree.root());
        assert_eq!(tree.walk(), vec![tree.root(), first, nested, second]);
        assert_eq!(tree.depth(nested), 2);
    }

    #[test]
    fn renders_symbol_table() {
        let mut tree = ScopeTree::new();
        let block = tree.adopt(tree.root());
        tree.declare(block, VarType::Boolean, ident("b", 3));
        assert_eq!(tree.render(), "b boolean scope 1 line 3\n");
    }
}
