//! Lexer: source text to an ordered token stream.
//!
//! The lexer is a three-state machine. In `Default` it dispatches on the
//! current character; a lowercase letter switches to `Searching`, which
//! grows a window while it is still the prefix of a reserved word; a quote
//! switches to `String`, where each letter or space becomes its own token.
//! Identifiers are single lowercase letters, so a lowercase run that does
//! not spell a reserved word is split into one identifier per letter.

use crate::error::{CharName, LexError};
use crate::event::{Event, LogSink, Phase, Profile, Severity};
use crate::token::{Position, Token, TokenKind};

const RESERVED_WORDS: &[(&str, TokenKind)] = &[
    ("if", TokenKind::If),
    ("while", TokenKind::While),
    ("print", TokenKind::Print),
    ("int", TokenKind::Type),
    ("string", TokenKind::Type),
    ("boolean", TokenKind::Type),
    ("true", TokenKind::BoolVal),
    ("false", TokenKind::BoolVal),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Default,
    Searching { start: usize },
    String,
}

/// Lex a source string into tokens.
///
/// Stops at the `$` sentinel. Reaching the end of input without one is a
/// warning, not an error; the tokens collected so far are returned.
pub fn lex(source: &str, sink: &mut dyn LogSink) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, sink).run()
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    state: LexState,
    tokens: Vec<Token>,
    sink: &'a mut dyn LogSink,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, sink: &'a mut dyn LogSink) -> Self {
        Lexer {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 0,
            state: LexState::Default,
            tokens: Vec::new(),
            sink,
        }
    }

    pub fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            let finished = match self.state {
                LexState::Default => self.step_default()?,
                LexState::Searching { start } => {
                    self.step_searching(start);
                    false
                }
                LexState::String => self.step_string()?,
            };
            if finished {
                return Ok(self.tokens);
            }
        }
    }

    /// Returns `true` once lexing is over.
    fn step_default(&mut self) -> Result<bool, LexError> {
        let Some(ch) = self.peek_char() else {
            self.warn_missing_sentinel();
            return Ok(true);
        };

        match ch {
            '\n' => {
                self.index += 1;
                self.line += 1;
                self.column = 0;
            }
            ' ' | '\t' | '\r' => self.consume_char(),
            '"' => {
                self.single(TokenKind::Quote);
                self.state = LexState::String;
            }
            'a'..='z' => self.state = LexState::Searching { start: self.index },
            '0'..='9' => self.single(TokenKind::Digit),
            '+' => self.single(TokenKind::IntOp),
            '(' => self.single(TokenKind::ParenOpen),
            ')' => self.single(TokenKind::ParenClose),
            '{' => self.single(TokenKind::BraceOpen),
            '}' => self.single(TokenKind::BraceClose),
            '=' => {
                if self.peek_next() == Some('=') {
                    self.double("==", TokenKind::BoolOp);
                } else {
                    self.single(TokenKind::Assign);
                }
            }
            '!' => {
                if self.peek_next() == Some('=') {
                    self.double("!=", TokenKind::BoolOp);
                } else {
                    let position = self.here();
                    return Err(self.fail(LexError::UnterminatedBang { position }));
                }
            }
            '$' => {
                self.single(TokenKind::Eof);
                self.warn_trailing_text();
                return Ok(true);
            }
            other => {
                let position = self.here();
                return Err(self.fail(LexError::UnknownCharacter {
                    character: other,
                    position,
                }));
            }
        }
        Ok(false)
    }

    /// Longest-match scan for a reserved word starting at `start`.
    fn step_searching(&mut self, start: usize) {
        let position = self.here();
        let mut end = start + 1;
        loop {
            let candidate: String = self.chars[start..end].iter().collect();
            if let Some(kind) = reserved_word(&candidate) {
                let len = end - start;
                self.index += len;
                self.column += len;
                self.push(Token::new(candidate, kind, position));
                break;
            }

            match self.chars.get(end) {
                Some(&next) if next.is_ascii_lowercase() => {
                    let mut extended = candidate;
                    extended.push(next);
                    if is_reserved_prefix(&extended) {
                        end += 1;
                        continue;
                    }
                }
                _ => {}
            }

            self.single(TokenKind::Identifier);
            break;
        }
        self.state = LexState::Default;
    }

    fn step_string(&mut self) -> Result<bool, LexError> {
        let Some(ch) = self.peek_char() else {
            self.warn_missing_sentinel();
            return Ok(true);
        };

        match ch {
            'a'..='z' | ' ' => self.single(TokenKind::Char),
            '"' => {
                self.single(TokenKind::Quote);
                self.state = LexState::Default;
            }
            other => {
                let position = self.here();
                return Err(self.fail(LexError::InvalidStringCharacter {
                    character: CharName(other),
                    position,
                }));
            }
        }
        Ok(false)
    }

    fn single(&mut self, kind: TokenKind) {
        let position = self.here();
        let lexeme = self.chars[self.index].to_string();
        self.consume_char();
        self.push(Token::new(lexeme, kind, position));
    }

    fn double(&mut self, lexeme: &str, kind: TokenKind) {
        let position = self.here();
        self.consume_char();
        self.consume_char();
        self.push(Token::new(lexeme, kind, position));
    }

    fn push(&mut self, token: Token) {
        self.sink.emit(
            Event::new(
                Phase::Lex,
                Severity::Match,
                format!("{:?} '{}'", token.kind, token.lexeme),
            )
            .at(token.position)
            .profile(Profile::Verbose),
        );
        self.tokens.push(token);
    }

    fn fail(&mut self, error: LexError) -> LexError {
        self.sink
            .emit(Event::new(Phase::Lex, Severity::Error, error.to_string()).at(self.here()));
        error
    }

    fn warn_missing_sentinel(&mut self) {
        self.sink.emit(
            Event::new(
                Phase::Lex,
                Severity::Warning,
                "reached end of input without '$'",
            )
            .at(self.here()),
        );
    }

    fn warn_trailing_text(&mut self) {
        let rest = &self.chars[self.index..];
        if rest.iter().any(|c| !c.is_whitespace()) {
            self.sink.emit(
                Event::new(
                    Phase::Lex,
                    Severity::Warning,
                    format!("ignoring {} character(s) after '$'", rest.len()),
                )
                .at(self.here()),
            );
        }
    }

    /// Position of the character about to be consumed.
    fn here(&self) -> Position {
        Position::new(self.line, self.column + 1)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
            self.column += 1;
        }
    }
}

fn reserved_word(text: &str) -> Option<TokenKind> {
    RESERVED_WORDS
        .iter()
        .find(|(word, _)| *word == text)
        .map(|(_, kind)| *kind)
}

fn is_reserved_prefix(text: &str) -> bool {
    RESERVED_WORDS.iter().any(|(word, _)| word.starts_with(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn lex_ok(source: &str) -> Vec<Token> {
        let mut events: Vec<Event> = Vec::new();
        lex(source, &mut events).expect("lex should succeed")
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn single_letter_is_identifier() {
        let tokens = lex_ok("i$");
        assert_eq!(kinds(&tokens), vec![TokenKind::Identifier, TokenKind::Eof]);
        assert_eq!(tokens[0].lexeme, "i");
    }

    #[test]
    fn if_before_paren_is_keyword() {
        let tokens = lex_ok("if($");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::If, TokenKind::ParenOpen, TokenKind::Eof]
        );
        assert_eq!(tokens[0].lexeme, "if");
    }

    #[test]
    fn non_keyword_run_splits_into_identifiers() {
        let tokens = lex_ok("in ab$");
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["i", "n", "a", "b", "$"]);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Identifier));
    }

    #[test]
    fn keywords_glued_to_identifiers() {
        let tokens = lex_ok("inta$");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Type, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn recognises_every_reserved_word() {
        let tokens = lex_ok("if while print int string boolean true false$");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::If,
                TokenKind::While,
                TokenKind::Print,
                TokenKind::Type,
                TokenKind::Type,
                TokenKind::Type,
                TokenKind::BoolVal,
                TokenKind::BoolVal,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn disambiguates_assignment_and_equality() {
        let tokens = lex_ok("a = 1 (a == b) (a != b)$");
        assert_eq!(tokens[1].kind, TokenKind::Assign);
        assert_eq!(tokens[5].kind, TokenKind::BoolOp);
        assert_eq!(tokens[5].lexeme, "==");
        assert_eq!(tokens[10].lexeme, "!=");
    }

    #[test]
    fn string_characters_become_char_tokens() {
        let tokens = lex_ok("\"a b\"$");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Quote,
                TokenKind::Char,
                TokenKind::Char,
                TokenKind::Char,
                TokenKind::Quote,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].lexeme, " ");
    }

    #[test]
    fn keywords_inside_strings_are_characters() {
        let tokens = lex_ok("\"if\"$");
        assert_eq!(tokens[1].kind, TokenKind::Char);
        assert_eq!(tokens[2].kind, TokenKind::Char);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = lex_ok("{\n  print(a)\n}$");
        assert_eq!(tokens[0].position, Position::new(1, 1));
        assert_eq!(tokens[1].position, Position::new(2, 3));
        assert_eq!(tokens[2].position, Position::new(2, 8));
        assert_eq!(tokens[3].position, Position::new(2, 9));
        assert_eq!(tokens[5].position, Position::new(3, 1));
    }

    #[test]
    fn is_deterministic() {
        let source = "{ int a a = 1 + 2 print(\"hi\") }$";
        assert_eq!(lex_ok(source), lex_ok(source));
    }

    #[test]
    fn rejects_unknown_character() {
        let mut events: Vec<Event> = Vec::new();
        let err = lex("{ a = 1 ; }$", &mut events).unwrap_err();
        assert_eq!(
            err,
            LexError::UnknownCharacter {
                character: ';',
                position: Position::new(1, 9),
            }
        );
        assert!(events.last().is_some_and(Event::is_error));
    }

    #[test]
    fn rejects_lone_bang() {
        let mut events: Vec<Event> = Vec::new();
        let err = lex("(a ! b)$", &mut events).unwrap_err();
        assert!(matches!(err, LexError::UnterminatedBang { .. }));
    }

    #[test]
    fn string_errors_name_the_character() {
        let mut events: Vec<Event> = Vec::new();
        let err = lex("\"ab\ncd\"$", &mut events).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("newline"), "{message}");
        assert!(!message.contains("\\n"));

        let err = lex("\"A\"$", &mut events).unwrap_err();
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn missing_sentinel_is_a_warning() {
        let mut events: Vec<Event> = Vec::new();
        let tokens = lex("{ }", &mut events).expect("lex should succeed");
        assert_eq!(kinds(&tokens), vec![TokenKind::BraceOpen, TokenKind::BraceClose]);
        assert!(events.iter().any(Event::is_warning));
    }

    #[test]
    fn text_after_sentinel_is_ignored_with_warning() {
        let mut events: Vec<Event> = Vec::new();
        let tokens = lex("{ }$ junk ;", &mut events).expect("lex should succeed");
        assert_eq!(tokens.len(), 3);
        assert!(events.iter().any(Event::is_warning));
    }

    #[test]
    fn reports_every_token_to_the_sink() {
        let mut events: Vec<Event> = Vec::new();
        let tokens = lex("{ print(1) }$", &mut events).expect("lex should succeed");
        let matches = events
            .iter()
            .filter(|e| e.phase == Phase::Lex && e.severity == Severity::Match)
            .count();
        assert_eq!(matches, tokens.len());
    }
}
