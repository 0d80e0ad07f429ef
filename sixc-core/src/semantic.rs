//! Semantic analysis: lowers the CST into an AST while building the scope
//! tree, resolving identifiers and checking types.
//!
//! Lowering rules:
//! - `Block` opens a child scope for exactly the lifetime of the block.
//! - `VarDecl` declares a symbol in the current scope; redeclaring a name in
//!   the same scope is fatal.
//! - `Id` resolves outward through the scope chain and marks the symbol as
//!   initialized (assignment target) or used (anything else).
//! - `StringExpr` collapses its characters into one string literal.
//! - `IntExpr`/`BoolExpr` with two operands rotate the operator up into the
//!   branch position and type-check its operands.
//! - `AssignmentStatement` and `PrintStatement` type-check their children.
//!
//! Punctuation and wrapper nonterminals disappear. The first fatal error is
//! sticky; once set every remaining lowering step is a no-op.

use std::collections::HashMap;

use crate::error::SemanticError;
use crate::event::{Event, LogSink, Phase, Profile, Severity};
use crate::grammar::{self, GrammarNode, Production, SyntaxTree};
use crate::scope::{ScopeId, ScopeTree, SymbolId, VarType};
use crate::token::{Position, Token, TokenKind};
use crate::tree::{NodeId, TreeBuilder};

/// Output of a successful analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub ast: SyntaxTree,
    pub scopes: ScopeTree,
    /// Symbol each identifier leaf of the AST refers to (or declares).
    pub bindings: HashMap<NodeId, SymbolId>,
}

impl Analysis {
    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.bindings.get(&node).copied()
    }
}

pub fn analyze(cst: &SyntaxTree, sink: &mut dyn LogSink) -> Result<Analysis, SemanticError> {
    SemanticAnalyzer::new(sink).analyze(cst)
}

pub struct SemanticAnalyzer<'a> {
    builder: TreeBuilder<GrammarNode>,
    scopes: ScopeTree,
    current: ScopeId,
    bindings: HashMap<NodeId, SymbolId>,
    error: Option<SemanticError>,
    sink: &'a mut dyn LogSink,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(sink: &'a mut dyn LogSink) -> Self {
        let scopes = ScopeTree::new();
        let current = scopes.root();
        SemanticAnalyzer {
            builder: TreeBuilder::new(),
            scopes,
            current,
            bindings: HashMap::new(),
            error: None,
            sink,
        }
    }

    pub fn analyze(mut self, cst: &SyntaxTree) -> Result<Analysis, SemanticError> {
        let root = cst.root().ok_or(SemanticError::EmptyTree)?;
        self.log("began creating AST from CST", Profile::Verbose);
        self.convert(cst, root);

        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let warnings = self.report_warnings();
        let analysis = Analysis {
            ast: self.builder.finish(),
            scopes: self.scopes,
            bindings: self.bindings,
        };

        self.sink.emit(
            Event::new(
                Phase::SemanticAnalysis,
                Severity::Message,
                format!("symbol table:\n{}", analysis.scopes.render()),
            )
            .profile(Profile::Verbose),
        );
        self.sink.emit(
            Event::new(
                Phase::SemanticAnalysis,
                Severity::Message,
                format!("AST:\n{}", grammar::render(&analysis.ast)),
            )
            .profile(Profile::Verbose),
        );
        self.sink.emit(Event::new(
            Phase::SemanticAnalysis,
            Severity::Message,
            format!("semantic analysis completed with {warnings} warning(s)"),
        ));
        Ok(analysis)
    }

    fn convert(&mut self, cst: &SyntaxTree, id: NodeId) {
        if self.error.is_some() {
            return;
        }
        let production = match cst.value(id) {
            GrammarNode::Branch(production) => *production,
            // Bare terminals at this level are punctuation.
            GrammarNode::Leaf(_) | GrammarNode::StringLiteral { .. } => return,
        };

        match production {
            Production::Block => self.lower_block(cst, id),
            Production::VarDecl => self.lower_var_decl(cst, id),
            Production::AssignmentStatement | Production::PrintStatement => {
                self.add_branch(GrammarNode::Branch(production));
                self.convert_children(cst, id);
                self.check_current();
                self.climb();
            }
            Production::IfStatement | Production::WhileStatement => {
                self.add_branch(GrammarNode::Branch(production));
                self.convert_children(cst, id);
                self.climb();
            }
            Production::StringExpr => self.lower_string(cst, id),
            Production::IntExpr | Production::BoolExpr => self.lower_operation(cst, id),
            Production::Id => self.lower_id(cst, id),
            Production::Digit | Production::BoolVal | Production::Type => {
                if let Some(token) = terminal_of(cst, id) {
                    self.builder.add_leaf(GrammarNode::Leaf(token.clone()));
                }
            }
            _ => {
                self.log_with(
                    format!("nothing to keep at '{production}', recursing"),
                    Severity::Useless,
                    Profile::Everything,
                );
                self.convert_children(cst, id);
            }
        }
    }

    fn convert_children(&mut self, cst: &SyntaxTree, id: NodeId) {
        for &child in cst.children(id) {
            self.convert(cst, child);
        }
    }

    fn lower_block(&mut self, cst: &SyntaxTree, id: NodeId) {
        let parent = self.current;
        self.current = self.scopes.adopt(parent);
        self.add_branch(GrammarNode::Branch(Production::Block));
        self.convert_children(cst, id);
        self.climb();
        self.current = parent;
    }

    fn lower_var_decl(&mut self, cst: &SyntaxTree, id: NodeId) {
        self.add_branch(GrammarNode::Branch(Production::VarDecl));

        let mut type_token = None;
        let mut name_token = None;
        for &child in cst.children(id) {
            match cst.value(child).production() {
                Some(Production::Type) => type_token = terminal_of(cst, child),
                Some(Production::Id) => name_token = terminal_of(cst, child),
                _ => {}
            }
        }
        let (Some(type_token), Some(name_token)) = (type_token, name_token) else {
            self.climb();
            return;
        };

        self.builder.add_leaf(GrammarNode::Leaf(type_token.clone()));
        let name_leaf = self.builder.add_leaf(GrammarNode::Leaf(name_token.clone()));

        if let Some(existing) = self.scopes.lookup_local(self.current, &name_token.lexeme) {
            let original_line = self.scopes.symbol(existing).token.position.line;
            self.fail(SemanticError::DuplicateDeclaration {
                name: name_token.lexeme.clone(),
                position: name_token.position,
                original_line,
            });
            return;
        }

        let declared_type = VarType::from_keyword(&type_token.lexeme);
        self.log(
            format!(
                "adding symbol '{} {}' to the symbol table",
                type_token.lexeme, name_token.lexeme
            ),
            Profile::Verbose,
        );
        let symbol = self
            .scopes
            .declare(self.current, declared_type, name_token.clone());
        self.bindings.insert(name_leaf, symbol);
        self.climb();
    }

    fn lower_id(&mut self, cst: &SyntaxTree, id: NodeId) {
        let Some(token) = terminal_of(cst, id) else {
            return;
        };
        let Some(symbol) = self.scopes.lookup(self.current, &token.lexeme) else {
            self.fail(SemanticError::UnresolvedIdentifier {
                name: token.lexeme.clone(),
                position: token.position,
            });
            return;
        };

        let is_target = cst
            .parent(id)
            .is_some_and(|parent| cst.value(parent).is(Production::AssignmentStatement));
        let entry = self.scopes.symbol_mut(symbol);
        if is_target {
            entry.initialized = true;
        } else {
            entry.used = true;
        }

        let leaf = self.builder.add_leaf(GrammarNode::Leaf(token.clone()));
        self.bindings.insert(leaf, symbol);
    }

    fn lower_string(&mut self, cst: &SyntaxTree, id: NodeId) {
        let mut text = String::new();
        let mut position = None;
        let mut stack = vec![id];
        let mut visit = Vec::new();
        while let Some(node) = stack.pop() {
            visit.push(node);
            stack.extend(cst.children(node).iter().rev().copied());
        }
        for node in visit {
            if let GrammarNode::Leaf(token) = cst.value(node) {
                match token.kind {
                    TokenKind::Char => text.push_str(&token.lexeme),
                    TokenKind::Quote if position.is_none() => position = Some(token.position),
                    _ => {}
                }
            }
        }
        self.log(
            format!("collapsing characters to form string \"{text}\""),
            Profile::Verbose,
        );
        self.builder.add_leaf(GrammarNode::StringLiteral {
            text,
            position: position.unwrap_or_default(),
        });
    }

    fn lower_operation(&mut self, cst: &SyntaxTree, id: NodeId) {
        let operator = cst.children(id).iter().find_map(|&child| {
            match cst.value(child).production() {
                Some(Production::IntOp | Production::BoolOp) => terminal_of(cst, child),
                _ => None,
            }
        });

        match operator {
            Some(operator) => {
                self.log(
                    format!("found operator '{}', rotating it into a branch", operator.lexeme),
                    Profile::Verbose,
                );
                self.add_branch(GrammarNode::Leaf(operator.clone()));
                self.convert_children(cst, id);
                self.check_current();
                self.climb();
            }
            None => self.convert_children(cst, id),
        }
    }

    /// Type-check the node under the cursor.
    fn check_current(&mut self) {
        if self.error.is_some() {
            return;
        }
        let Some(node) = self.builder.cursor() else {
            return;
        };
        match infer(self.builder.tree(), &self.scopes, &self.bindings, node) {
            Ok(ty) => self.log_with(
                format!("type checks out, result is '{ty}'"),
                Severity::Match,
                Profile::Verbose,
            ),
            Err(error) => self.fail(error),
        }
    }

    /// Report unused / uninitialized symbols; returns how many were reported.
    fn report_warnings(&mut self) -> usize {
        let mut count = 0;
        for scope in self.scopes.walk() {
            for (_, id) in self.scopes.scope(scope).symbols() {
                let symbol = self.scopes.symbol(id);
                let text = if symbol.used && !symbol.initialized {
                    format!("variable '{}' was used but not initialized", symbol.name)
                } else if !symbol.used {
                    format!("unused variable '{}'", symbol.name)
                } else {
                    continue;
                };
                self.sink.emit(
                    Event::new(Phase::SemanticAnalysis, Severity::Warning, text)
                        .at(symbol.token.position),
                );
                count += 1;
            }
        }
        count
    }

    fn add_branch(&mut self, node: GrammarNode) {
        if self.error.is_some() {
            return;
        }
        self.log_with(
            format!("creating branch node '{node}'"),
            Severity::Match,
            Profile::Everything,
        );
        self.builder.add_branch(node);
    }

    fn climb(&mut self) {
        if self.error.is_some() {
            return;
        }
        self.builder.climb();
    }

    fn fail(&mut self, error: SemanticError) {
        if self.error.is_some() {
            return;
        }
        let mut event = Event::new(Phase::SemanticAnalysis, Severity::Error, error.to_string());
        event.position = error_position(&error);
        self.sink.emit(event);
        self.error = Some(error);
    }

    fn log(&mut self, text: impl Into<String>, profile: Profile) {
        self.log_with(text, Severity::Message, profile);
    }

    fn log_with(&mut self, text: impl Into<String>, severity: Severity, profile: Profile) {
        self.sink
            .emit(Event::new(Phase::SemanticAnalysis, severity, text).profile(profile));
    }
}

/// Compute the type of an AST node.
///
/// Leaves carry their own type. Any other node requires all of its
/// children to share one type; boolean operators always yield `Boolean`.
pub fn infer(
    ast: &SyntaxTree,
    scopes: &ScopeTree,
    bindings: &HashMap<NodeId, SymbolId>,
    node: NodeId,
) -> Result<VarType, SemanticError> {
    if !ast.has_children(node) {
        return Ok(leaf_type(ast, scopes, bindings, node));
    }

    let mut shared: Option<VarType> = None;
    for &child in ast.children(node) {
        let child_type = infer(ast, scopes, bindings, child)?;
        match shared {
            None => shared = Some(child_type),
            Some(expected) if expected != child_type => {
                return Err(SemanticError::TypeMismatch {
                    expected: expected.to_string(),
                    found: child_type.to_string(),
                    position: ast.value(child).position().unwrap_or_default(),
                });
            }
            Some(_) => {}
        }
    }

    match ast.value(node) {
        GrammarNode::Leaf(token) if token.kind == TokenKind::BoolOp => Ok(VarType::Boolean),
        _ => Ok(shared.unwrap_or(VarType::None)),
    }
}

fn leaf_type(
    ast: &SyntaxTree,
    scopes: &ScopeTree,
    bindings: &HashMap<NodeId, SymbolId>,
    node: NodeId,
) -> VarType {
    match ast.value(node) {
        GrammarNode::StringLiteral { .. } => VarType::String,
        GrammarNode::Leaf(token) => match token.kind {
            TokenKind::Digit => VarType::Int,
            TokenKind::BoolVal => VarType::Boolean,
            TokenKind::Identifier => bindings
                .get(&node)
                .map(|symbol| scopes.symbol(*symbol).declared_type)
                .unwrap_or(VarType::None),
            _ => VarType::None,
        },
        GrammarNode::Branch(_) => VarType::None,
    }
}

/// The single terminal under a one-terminal nonterminal such as `Id`.
fn terminal_of(cst: &SyntaxTree, id: NodeId) -> Option<&Token> {
    cst.children(id)
        .iter()
        .find_map(|child| cst.value(*child).token())
}

fn error_position(error: &SemanticError) -> Option<Position> {
    match error {
        SemanticError::DuplicateDeclaration { position, .. }
        | SemanticError::UnresolvedIdentifier { position, .. }
        | SemanticError::TypeMismatch { position, .. } => Some(*position),
        SemanticError::EmptyTree => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn run(source: &str) -> (Result<Analysis, SemanticError>, Vec<Event>) {
        let mut events: Vec<Event> = Vec::new();
        let tokens = lex(source, &mut events).expect("lex");
        let cst = parse(&tokens, &mut events).expect("parse");
        let mut events: Vec<Event> = Vec::new();
        let result = analyze(&cst, &mut events);
        (result, events)
    }

    fn warnings(events: &[Event]) -> Vec<&str> {
        events
            .iter()
            .filter(|e| e.is_warning())
            .map(|e| e.text.as_str())
            .collect()
    }

    #[test]
    fn rejects_duplicate_declaration() {
        let (result, _) = run("{ int a int a }$");
        match result {
            Err(SemanticError::DuplicateDeclaration {
                name,
                original_line,
                ..
            }) => {
                assert_eq!(name, "a");
                assert_eq!(original_line, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn allows_shadowing_in_nested_scope() {
        let (result, _) = run("{ int a a = 1 { string a a = \"x\" print(a) } print(a) }$");
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn rejects_type_mismatch_in_assignment() {
        let (result, _) = run("{ int a a = \"x\" }$");
        assert!(matches!(
            result,
            Err(SemanticError::TypeMismatch { ref expected, ref found, .. })
                if expected == "int" && found == "string"
        ));
    }

    #[test]
    fn rejects_unresolved_identifier() {
        let (result, events) = run("{ print(a) }$");
        assert!(matches!(
            result,
            Err(SemanticError::UnresolvedIdentifier { ref name, .. }) if name == "a"
        ));
        assert_eq!(events.iter().filter(|e| e.is_error()).count(), 1);
    }

    #[test]
    fn identifier_declared_in_sibling_block_is_not_visible() {
        let (result, _) = run("{ { int a } a = 1 }$");
        assert!(matches!(
            result,
            Err(SemanticError::UnresolvedIdentifier { .. })
        ));
    }

    #[test]
    fn warns_used_but_not_initialized() {
        let (result, events) = run("{ int a print(a) }$");
        assert!(result.is_ok());
        assert_eq!(
            warnings(&events),
            vec!["variable 'a' was used but not initialized"]
        );
    }

    #[test]
    fn warns_unused_variable() {
        let (result, events) = run("{ int a }$");
        assert!(result.is_ok());
        assert_eq!(warnings(&events), vec!["unused variable 'a'"]);
    }

    #[test]
    fn initialized_and_used_symbol_is_quiet() {
        let (result, events) = run("{ int a a = 3 print(a) }$");
        assert!(result.is_ok());
        assert!(warnings(&events).is_empty());
    }

    #[test]
    fn rotates_operators_and_drops_wrappers() {
        let (result, _) = run("{ int a a = 1 + 2 + a }$");
        let analysis = result.expect("analysis");
        let rendered = grammar::render(&analysis.ast);
        assert_eq!(
            rendered,
            "<Block>\n-<VarDecl>\n--[int]\n--[a]\n-<AssignmentStatement>\n--[a]\n--<+>\n---[1]\n---<+>\n----[2]\n----[a]\n"
        );
    }

    #[test]
    fn collapses_string_literals() {
        let (result, _) = run("{ string s s = \"hi there\" }$");
        let analysis = result.expect("analysis");
        let literal = analysis
            .ast
            .preorder()
            .into_iter()
            .find_map(|id| match analysis.ast.value(id) {
                GrammarNode::StringLiteral { text, .. } => Some(text.clone()),
                _ => None,
            });
        assert_eq!(literal.as_deref(), Some("hi there"));
    }

    #[test]
    fn boolean_operators_yield_boolean() {
        let (result, _) = run("{ boolean b b = (1 == 2) print(b) }$");
        assert!(result.is_ok(), "{result:?}");

        let (result, _) = run("{ int a a = (1 != 2) }$");
        assert!(matches!(result, Err(SemanticError::TypeMismatch { .. })));
    }

    #[test]
    fn comparison_operands_must_agree() {
        let (result, _) = run("{ print((1 == \"a\")) }$");
        assert!(matches!(
            result,
            Err(SemanticError::TypeMismatch { ref expected, ref found, .. })
                if expected == "int" && found == "string"
        ));
    }

    #[test]
    fn sum_with_string_operand_is_rejected() {
        let (result, _) = run("{ print(1 + \"a\") }$");
        assert!(matches!(result, Err(SemanticError::TypeMismatch { .. })));
    }

    #[test]
    fn binds_identifiers_to_the_symbol_visible_at_use() {
        let (result, _) = run("{ int a a = 1 { a = 2 int a a = 3 print(a) } }$");
        let analysis = result.expect("analysis");
        let ids: Vec<SymbolId> = analysis
            .ast
            .preorder()
            .into_iter()
            .filter_map(|id| analysis.symbol_of(id))
            .collect();
        // decl outer, assign outer, assign outer (before shadow), decl inner,
        // assign inner, print inner
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);
        assert_ne!(ids[2], ids[3]);
        assert_eq!(ids[3], ids[4]);
        assert_eq!(ids[4], ids[5]);
    }

    #[test]
    fn scope_tree_mirrors_blocks() {
        let (result, _) = run("{ int a { int b } { int c { int d } } }$");
        let analysis = result.expect("analysis");
        // root + outer block + two inner blocks + one nested
        assert_eq!(analysis.scopes.walk().len(), 5);
        assert_eq!(analysis.scopes.symbol_count(), 4);
    }
}
