//! Structured log events emitted by every pipeline stage.
//!
//! Stages never print. They report to a [`LogSink`] handed to them at
//! construction time; the host decides how (and whether) to show events.
//! Every event carries the [`Profile`] it natively belongs to so that a
//! presentation layer can filter by verbosity, but the core itself always
//! emits everything.

use core::fmt;

use crate::token::Position;

/// Pipeline stage that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lex,
    Parse,
    SemanticAnalysis,
    CodeGen,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Lex => "Lex",
            Phase::Parse => "Parse",
            Phase::SemanticAnalysis => "Semantic Analysis",
            Phase::CodeGen => "Code Generation",
        }
    }
}

/// Native severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Message,
    Match,
    Warning,
    Error,
    /// Bookkeeping chatter (cursor climbs, recursion notices).
    Useless,
}

/// Verbosity profile an event belongs to. Ordered from least to most chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Profile {
    #[default]
    EndUser,
    Verbose,
    Everything,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub phase: Phase,
    pub severity: Severity,
    pub profile: Profile,
    pub text: String,
    pub position: Option<Position>,
}

impl Event {
    pub fn new(phase: Phase, severity: Severity, text: impl Into<String>) -> Self {
        Event {
            phase,
            severity,
            profile: Profile::EndUser,
            text: text.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.phase.as_str())?;
        match self.severity {
            Severity::Error => write!(f, "error")?,
            Severity::Warning => write!(f, "warning")?,
            _ => {}
        }
        if let Some(position) = self.position {
            if matches!(self.severity, Severity::Error | Severity::Warning) {
                write!(f, " ")?;
            }
            write!(f, "at {position}")?;
        }
        if matches!(self.severity, Severity::Error | Severity::Warning) || self.position.is_some()
        {
            write!(f, ": ")?;
        }
        write!(f, "{}", self.text)
    }
}

/// Capability every stage reports through.
pub trait LogSink {
    fn emit(&mut self, event: Event);
}

impl LogSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn emit(&mut self, event: Event) {
        (**self).emit(event);
    }
}

/// Forwards events to the `tracing` ecosystem.
///
/// Errors and warnings keep their level; everything else is mapped by
/// profile so a subscriber's max level doubles as the verbosity filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&mut self, event: Event) {
        let phase = event.phase.as_str();
        let (line, column) = event
            .position
            .map(|p| (p.line, p.column))
            .unwrap_or((0, 0));
        let text = event.text.as_str();
        match (event.severity, event.profile) {
            (Severity::Error, _) => tracing::error!(phase, line, column, "{text}"),
            (Severity::Warning, _) => tracing::warn!(phase, line, column, "{text}"),
            (_, Profile::EndUser) => tracing::info!(phase, line, column, "{text}"),
            (_, Profile::Verbose) => tracing::debug!(phase, line, column, "{text}"),
            (_, Profile::Everything) => tracing::trace!(phase, line, column, "{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_events_in_order() {
        let mut sink: Vec<Event> = Vec::new();
        sink.emit(Event::new(Phase::Lex, Severity::Match, "first"));
        sink.emit(Event::new(Phase::Parse, Severity::Error, "second").at(Position::new(2, 3)));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].text, "first");
        assert!(sink[1].is_error());
    }

    #[test]
    fn renders_positioned_errors() {
        let event = Event::new(Phase::Parse, Severity::Error, "boom").at(Position::new(1, 4));
        assert_eq!(event.to_string(), "[Parse] error at 1:4: boom");
    }

    #[test]
    fn profiles_are_ordered_by_verbosity() {
        assert!(Profile::EndUser < Profile::Verbose);
        assert!(Profile::Verbose < Profile::Everything);
    }
}
