//! Recursive-descent parser building the concrete syntax tree.
//!
//! ```text
//! Program        := Block '$'
//! Block          := '{' StatementList '}'
//! StatementList  := Statement StatementList | ε
//! Statement      := PrintStatement | AssignmentStatement | VarDecl
//!                 | WhileStatement | IfStatement | Block
//! PrintStatement := 'print' '(' Expr ')'
//! AssignmentStatement := Id '=' Expr
//! VarDecl        := type Id
//! WhileStatement := 'while' BoolExpr Block
//! IfStatement    := 'if' BoolExpr Block
//! Expr           := IntExpr | StringExpr | BoolExpr | Id
//! IntExpr        := digit (intop Expr)?
//! StringExpr     := '"' CharList '"'
//! BoolExpr       := boolval | '(' Expr boolop Expr ')'
//! Id             := identifier
//! ```
//!
//! Every nonterminal pushes a branch, recurses, then climbs back. The first
//! mismatch is recorded and sticks: from then on terminal matches and branch
//! pushes are inert, so the descent unwinds without touching the tree.

use crate::error::ParseError;
use crate::event::{Event, LogSink, Phase, Profile, Severity};
use crate::grammar::{GrammarNode, Production, SyntaxTree};
use crate::token::{Token, TokenKind};
use crate::tree::TreeBuilder;

pub fn parse(tokens: &[Token], sink: &mut dyn LogSink) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new(tokens, sink);
    parser.program();
    parser.finish()
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
    builder: TreeBuilder<GrammarNode>,
    error: Option<ParseError>,
    sink: &'a mut dyn LogSink,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], sink: &'a mut dyn LogSink) -> Self {
        Parser {
            tokens,
            index: 0,
            builder: TreeBuilder::new(),
            error: None,
            sink,
        }
    }

    pub fn finish(self) -> Result<SyntaxTree, ParseError> {
        match self.error {
            Some(error) => Err(error),
            None => {
                self.sink.emit(Event::new(
                    Phase::Parse,
                    Severity::Message,
                    "parse completed successfully",
                ));
                Ok(self.builder.finish())
            }
        }
    }

    pub fn program(&mut self) {
        self.branch(Production::Program);
        self.block();
        self.match_token(TokenKind::Eof);
        self.climb();
    }

    fn block(&mut self) {
        self.branch(Production::Block);
        self.match_token(TokenKind::BraceOpen);
        self.statement_list();
        self.match_token(TokenKind::BraceClose);
        self.climb();
    }

    fn statement_list(&mut self) {
        match self.peek_kind() {
            None | Some(TokenKind::BraceClose) => {}
            Some(_) => {
                self.branch(Production::StatementList);
                self.statement();
                self.statement_list();
                self.climb();
            }
        }
    }

    fn statement(&mut self) {
        self.branch(Production::Statement);
        match self.peek_kind() {
            Some(TokenKind::Print) => self.print_statement(),
            Some(TokenKind::Identifier) => self.assignment_statement(),
            Some(TokenKind::Type) => self.var_decl(),
            Some(TokenKind::While) => self.while_statement(),
            Some(TokenKind::If) => self.if_statement(),
            Some(TokenKind::BraceOpen) => self.block(),
            _ => self.unexpected("statement"),
        }
        self.climb();
    }

    fn print_statement(&mut self) {
        self.branch(Production::PrintStatement);
        self.match_token(TokenKind::Print);
        self.match_token(TokenKind::ParenOpen);
        self.expr();
        self.match_token(TokenKind::ParenClose);
        self.climb();
    }

    fn assignment_statement(&mut self) {
        self.branch(Production::AssignmentStatement);
        self.id();
        self.match_token(TokenKind::Assign);
        self.expr();
        self.climb();
    }

    fn var_decl(&mut self) {
        self.branch(Production::VarDecl);
        self.terminal(Production::Type, TokenKind::Type);
        self.id();
        self.climb();
    }

    fn while_statement(&mut self) {
        self.branch(Production::WhileStatement);
        self.match_token(TokenKind::While);
        self.bool_expr();
        self.block();
        self.climb();
    }

    fn if_statement(&mut self) {
        self.branch(Production::IfStatement);
        self.match_token(TokenKind::If);
        self.bool_expr();
        self.block();
        self.climb();
    }

    fn expr(&mut self) {
        self.branch(Production::Expr);
        match self.peek_kind() {
            Some(TokenKind::Digit) => self.int_expr(),
            Some(TokenKind::Quote) => self.string_expr(),
            Some(TokenKind::ParenOpen | TokenKind::BoolVal) => self.bool_expr(),
            Some(TokenKind::Identifier) => self.id(),
            _ => self.unexpected("expression"),
        }
        self.climb();
    }

    fn int_expr(&mut self) {
        self.branch(Production::IntExpr);
        self.terminal(Production::Digit, TokenKind::Digit);
        if self.peek_kind() == Some(TokenKind::IntOp) {
            self.terminal(Production::IntOp, TokenKind::IntOp);
            self.expr();
        }
        self.climb();
    }

    fn string_expr(&mut self) {
        self.branch(Production::StringExpr);
        self.match_token(TokenKind::Quote);
        self.char_list();
        self.match_token(TokenKind::Quote);
        self.climb();
    }

    fn char_list(&mut self) {
        if self.peek_kind() != Some(TokenKind::Char) {
            return;
        }
        self.branch(Production::CharList);
        while self.peek_kind() == Some(TokenKind::Char) {
            self.match_token(TokenKind::Char);
        }
        self.climb();
    }

    fn bool_expr(&mut self) {
        self.branch(Production::BoolExpr);
        if self.peek_kind() == Some(TokenKind::BoolVal) {
            self.terminal(Production::BoolVal, TokenKind::BoolVal);
        } else {
            self.match_token(TokenKind::ParenOpen);
            self.expr();
            self.terminal(Production::BoolOp, TokenKind::BoolOp);
            self.expr();
            self.match_token(TokenKind::ParenClose);
        }
        self.climb();
    }

    fn id(&mut self) {
        self.terminal(Production::Id, TokenKind::Identifier);
    }

    /// A nonterminal wrapping exactly one terminal.
    fn terminal(&mut self, production: Production, kind: TokenKind) {
        self.branch(production);
        self.match_token(kind);
        self.climb();
    }

    fn match_token(&mut self, expected: TokenKind) {
        if self.error.is_some() {
            return;
        }
        match self.tokens.get(self.index) {
            Some(token) if token.kind == expected => {
                self.sink.emit(
                    Event::new(
                        Phase::Parse,
                        Severity::Match,
                        format!("expected {expected}, found '{}'", token.lexeme),
                    )
                    .at(token.position)
                    .profile(Profile::Verbose),
                );
                self.builder.add_leaf(GrammarNode::Leaf(token.clone()));
                self.index += 1;
            }
            _ => self.unexpected(expected.describe()),
        }
    }

    fn unexpected(&mut self, expected: &str) {
        if self.error.is_some() {
            return;
        }
        let (error, position) = match self.tokens.get(self.index) {
            Some(token) => (
                ParseError::UnexpectedToken {
                    expected: expected.to_string(),
                    found: token.lexeme.clone(),
                    position: token.position,
                },
                Some(token.position),
            ),
            None => (
                ParseError::UnexpectedEnd {
                    expected: expected.to_string(),
                },
                None,
            ),
        };
        let mut event = Event::new(Phase::Parse, Severity::Error, error.to_string());
        event.position = position;
        self.sink.emit(event);
        self.error = Some(error);
    }

    fn branch(&mut self, production: Production) {
        if self.error.is_some() {
            return;
        }
        self.sink.emit(
            Event::new(
                Phase::Parse,
                Severity::Useless,
                format!("adding branch '{production}'"),
            )
            .profile(Profile::Everything),
        );
        self.builder.add_branch(GrammarNode::Branch(production));
    }

    fn climb(&mut self) {
        if self.error.is_some() {
            return;
        }
        self.builder.climb();
    }

    /// Kind of the next token, or `None` once parsing has failed.
    fn peek_kind(&self) -> Option<TokenKind> {
        if self.error.is_some() {
            return None;
        }
        self.tokens.get(self.index).map(|token| token.kind)
    }
}
