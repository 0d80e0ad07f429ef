use crate::codegen::generate;
use crate::error::CoreError;
use crate::event::{Event, LogSink, Phase, Severity};
use crate::grammar::SyntaxTree;
use crate::image::Executable;
use crate::lexer::lex;
use crate::parser::parse;
use crate::semantic::{Analysis, analyze};
use crate::token::Token;

/// Everything the pipeline produced for one source text.
#[derive(Debug, Clone)]
pub struct CompilationArtifact {
    pub tokens: Vec<Token>,
    pub cst: SyntaxTree,
    pub analysis: Analysis,
    pub image: Executable,
}

/// Run every stage in order. The first failing stage ends the run; no later
/// stage sees its partial output.
pub fn compile(source: &str, sink: &mut dyn LogSink) -> Result<CompilationArtifact, CoreError> {
    let tokens = lex(source, sink)?;
    let cst = parse(&tokens, sink)?;
    let analysis = analyze(&cst, sink)?;
    let image = generate(&analysis, sink)?;
    sink.emit(Event::new(
        Phase::CodeGen,
        Severity::Message,
        "compilation finished",
    ));
    Ok(CompilationArtifact {
        tokens,
        cst,
        analysis,
        image,
    })
}

/// Compile and keep only the image, collecting every event.
pub fn compile_image(source: &str) -> (Result<Executable, CoreError>, Vec<Event>) {
    let mut events: Vec<Event> = Vec::new();
    let result = compile(source, &mut events).map(|artifact| artifact.image);
    (result, events)
}
