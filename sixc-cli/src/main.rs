use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sixc_core::machine::run;
use sixc_core::{CompilationArtifact, MachineConfig, TracingSink, compile};
use tracing::Level;

/// Compile a sixc program into a 256-byte machine image.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, help = "Source file (reads stdin when omitted)")]
    input: Option<String>,

    #[arg(short, long, help = "Image path (writes stdout when omitted)")]
    output: Option<String>,

    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        default_value = "hex",
        help = "Output format: hex dump, single-line hex pairs or raw bytes"
    )]
    emit: Emit,

    #[arg(long, help = "Run the image on the simulator after compiling")]
    run: bool,

    #[arg(long, value_enum, default_value = "end-user")]
    verbosity: Verbosity,

    #[arg(
        long,
        value_name = "STEPS",
        default_value_t = MachineConfig::default().step_limit,
        help = "Instruction budget for --run"
    )]
    step_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Sixteen bytes per row with offsets.
    Hex,
    /// All 256 bytes as one line of hex pairs.
    Pairs,
    Bin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    EndUser,
    Verbose,
    Everything,
}

impl Verbosity {
    fn max_level(self) -> Level {
        match self {
            Verbosity::EndUser => Level::INFO,
            Verbosity::Verbose => Level::DEBUG,
            Verbosity::Everything => Level::TRACE,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.max_level())
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut sink = TracingSink;
    let artifact = compile(&source, &mut sink).context("compilation failed")?;

    let bytes = match cli.emit {
        Emit::Hex => artifact.image.hex_dump().into_bytes(),
        Emit::Pairs => format!("{}\n", artifact.image.to_hex()).into_bytes(),
        Emit::Bin => artifact.image.as_bytes().to_vec(),
    };
    match &cli.output {
        Some(path) => write_output(path, &bytes)?,
        None => io::stdout()
            .write_all(&bytes)
            .context("failed to write image to stdout")?,
    }

    if cli.run {
        let output = run_image(&artifact, cli.step_limit)?;
        println!("{output}");
    }
    Ok(())
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

fn run_image(artifact: &CompilationArtifact, step_limit: usize) -> Result<String> {
    let config = MachineConfig { step_limit };
    let outcome = run(&artifact.image.bytes, &config).context("failed to execute image")?;
    tracing::debug!(steps = outcome.steps, "program halted");
    Ok(outcome.output)
}
