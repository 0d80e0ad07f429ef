use std::fs;
use std::path::{Path, PathBuf};

use sixc_core::machine::run;
use sixc_core::{MachineConfig, compile_image};
use walkdir::WalkDir;

struct Program {
    path: PathBuf,
    source: String,
    expected: Option<String>,
}

fn programs_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("programs")
}

fn load_programs(root: &Path) -> Vec<Program> {
    let mut programs = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "six") {
            let source = fs::read_to_string(path).expect("read program");
            let expected = fs::read_to_string(path.with_extension("out")).ok();
            programs.push(Program {
                path: path.to_path_buf(),
                source,
                expected,
            });
        }
    }
    programs
}

fn is_invalid(program: &Program, root: &Path) -> bool {
    program
        .path
        .strip_prefix(root)
        .is_ok_and(|relative| relative.starts_with("invalid"))
}

#[test]
fn valid_programs_produce_expected_output() {
    let root = programs_root();
    let programs = load_programs(&root);
    let mut checked = 0;
    for program in programs.iter().filter(|p| !is_invalid(p, &root)) {
        let (result, _) = compile_image(&program.source);
        let image = result.unwrap_or_else(|e| panic!("{}: {e}", program.path.display()));
        let outcome = run(&image.bytes, &MachineConfig::default())
            .unwrap_or_else(|e| panic!("{}: {e}", program.path.display()));
        if let Some(expected) = &program.expected {
            assert_eq!(
                outcome.output,
                expected.trim_end_matches('\n'),
                "{}",
                program.path.display()
            );
        }
        checked += 1;
    }
    assert!(checked > 0, "no programs found under {}", root.display());
}

#[test]
fn invalid_programs_are_rejected() {
    let root = programs_root();
    let programs = load_programs(&root);
    let mut checked = 0;
    for program in programs.iter().filter(|p| is_invalid(p, &root)) {
        let (result, events) = compile_image(&program.source);
        assert!(result.is_err(), "{} compiled", program.path.display());
        assert_eq!(
            events.iter().filter(|e| e.is_error()).count(),
            1,
            "{}",
            program.path.display()
        );
        checked += 1;
    }
    assert!(checked > 0, "no invalid programs under {}", root.display());
}
