//! Core of the sixc toolchain.
//!
//! This crate provides the compiler pipeline for a small brace-delimited
//! teaching language targeting a 256-byte 6502-style machine image.
//! The pipeline is roughly:
//!
//!   source text
//!     -> lexer     (tokens)
//!     -> parser    (concrete syntax tree)
//!     -> semantic  (abstract syntax tree + scope tree + type checks)
//!     -> codegen   (execution image, backpatched)
//!
//! Every stage reports through a [`event::LogSink`]. Higher-level tools
//! (the CLI, editors) should depend on this crate rather than
//! reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod error;
pub mod event;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod token;
pub mod lexer;
pub mod tree;
pub mod grammar;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic layers: scopes, lowering and type checking
// ---------------------------------------------------------------------

pub mod scope;
pub mod semantic;

// ---------------------------------------------------------------------
// Back-end: code generation, simulation and compiler orchestration
// ---------------------------------------------------------------------

pub mod image;
pub mod codegen;
pub mod machine;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, compile, compile_image};
pub use error::CoreError;
pub use event::{Event, LogSink, Profile, TracingSink};
pub use image::Executable;
pub use machine::{MachineConfig, MachineError, RunOutcome};
