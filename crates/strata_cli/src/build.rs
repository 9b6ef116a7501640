//! `strata build`: incremental check and emit.
//!
//! 1. Load `strata.toml` and the project's root files
//! 2. Seed the build from the previous build info (unless `--force`)
//! 3. Report configuration, syntax and type errors
//! 4. Emit every file that owes output, then the build info
//!
//! Exit codes: 0 when clean, 1 when errors were reported but outputs were
//! written, 2 when errors prevented the emit.

use strata_diagnostics::Diagnostic;
use strata_incremental::{read_build_info_program, IncrementalProgram};
use strata_program::EmitOptions;
use tracing::info;

use crate::project::{render_diagnostics, Project, ProgramSources};
use crate::{BuildArgs, GlobalArgs};

/// Exit code of a build with no errors.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code of a build that reported errors but still wrote its outputs.
pub const EXIT_DIAGNOSTICS: i32 = 1;
/// Exit code of a build whose emit was skipped because of errors.
pub const EXIT_EMIT_SKIPPED: i32 = 2;

/// Runs the `strata build` command.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(args.project.as_deref(), global)?;
    let options = project.options();

    let previous = if args.force {
        None
    } else {
        read_build_info_program(options, project.host.as_ref())
    };
    let program = project.program()?;
    let mut builder = IncrementalProgram::new(program, previous.as_ref());

    if !global.quiet {
        eprintln!(
            "   Building {} ({} changed of {} files)",
            project.config.project.name,
            builder.snapshot().changed_files().len(),
            builder.program().source_files().len()
        );
    }
    if global.verbose {
        for path in builder.snapshot().changed_files() {
            eprintln!("    Changed {}", project.display_name(path.as_str()));
        }
    }

    let mut diagnostics = collect_diagnostics(&mut builder);

    let mut emit_skipped = false;
    if args.dry {
        for (path, kind) in builder.snapshot().affected_files_pending_emit() {
            println!("{} ({kind})", project.display_name(path.as_str()));
        }
    } else {
        let result = builder.emit_to_host(&EmitOptions::default());
        emit_skipped = result.emit_skipped;
        for diag in result.diagnostics {
            if !diagnostics.contains(&diag) {
                diagnostics.push(diag);
            }
        }
        for file in &result.emitted_files {
            println!("TSFILE: {file}");
        }
        info!(files = result.emitted_files.len(), skipped = emit_skipped, "emit finished");
    }

    let sources = ProgramSources {
        project: &project,
        program: builder.program(),
    };
    render_diagnostics(&diagnostics, &sources, global);

    let errors = diagnostics.iter().filter(|diag| diag.is_error()).count();
    if !global.quiet {
        eprintln!("   Result: {errors} error(s)");
    }
    Ok(exit_code(errors, emit_skipped))
}

/// Gathers diagnostics in reporting order: configuration, options and
/// syntax first; type errors only once the files parse.
fn collect_diagnostics(builder: &mut IncrementalProgram) -> Vec<Diagnostic> {
    let mut diagnostics = builder.config_file_parsing_diagnostics();
    diagnostics.extend(builder.options_diagnostics());
    diagnostics.extend(builder.syntactic_diagnostics(None));
    if diagnostics.is_empty() {
        diagnostics.extend(builder.global_diagnostics());
        diagnostics.extend(builder.semantic_diagnostics(None));
    }
    diagnostics
}

fn exit_code(errors: usize, emit_skipped: bool) -> i32 {
    match (errors, emit_skipped) {
        (0, _) => EXIT_SUCCESS,
        (_, true) => EXIT_EMIT_SKIPPED,
        (_, false) => EXIT_DIAGNOSTICS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn global() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
        }
    }

    fn args(dir: &Path) -> BuildArgs {
        BuildArgs {
            project: Some(dir.to_str().unwrap().to_string()),
            force: false,
            dry: false,
        }
    }

    fn project(options: &str, files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (name, text) in files {
            let path = tmp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        fs::write(
            tmp.path().join("strata.toml"),
            format!("[project]\nname = \"demo\"\ninclude = [\"src\"]\n\n[compiler_options]\nincremental = true\n{options}"),
        )
        .unwrap();
        tmp
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(0, false), EXIT_SUCCESS);
        assert_eq!(exit_code(0, true), EXIT_SUCCESS);
        assert_eq!(exit_code(2, false), EXIT_DIAGNOSTICS);
        assert_eq!(exit_code(1, true), EXIT_EMIT_SKIPPED);
    }

    #[test]
    fn clean_build_writes_outputs_and_build_info() {
        let tmp = project(
            "",
            &[
                ("src/a.ts", "export const x = 1;"),
                ("src/b.ts", "import { x } from './a';\nexport const y = x + 1;"),
            ],
        );
        assert_eq!(run(&args(tmp.path()), &global()).unwrap(), EXIT_SUCCESS);
        assert!(tmp.path().join("src/a.js").is_file());
        assert!(tmp.path().join("src/b.js").is_file());
        assert!(tmp.path().join("strata.tsbuildinfo").is_file());
    }

    #[test]
    fn rebuild_without_changes_rewrites_nothing() {
        let tmp = project("", &[("src/a.ts", "export const x = 1;")]);
        assert_eq!(run(&args(tmp.path()), &global()).unwrap(), EXIT_SUCCESS);
        let output = tmp.path().join("src/a.js");
        fs::remove_file(&output).unwrap();

        assert_eq!(run(&args(tmp.path()), &global()).unwrap(), EXIT_SUCCESS);
        assert!(!output.exists());

        let forced = BuildArgs {
            force: true,
            ..args(tmp.path())
        };
        assert_eq!(run(&forced, &global()).unwrap(), EXIT_SUCCESS);
        assert!(output.is_file());
    }

    #[test]
    fn type_errors_still_emit() {
        let tmp = project("", &[("src/a.ts", "export const a: string = 1;")]);
        assert_eq!(run(&args(tmp.path()), &global()).unwrap(), EXIT_DIAGNOSTICS);
        assert!(tmp.path().join("src/a.js").is_file());
    }

    #[test]
    fn no_emit_on_error_skips_outputs() {
        let tmp = project("no_emit_on_error = true\n", &[("src/a.ts", "export const a: string = 1;")]);
        assert_eq!(run(&args(tmp.path()), &global()).unwrap(), EXIT_EMIT_SKIPPED);
        assert!(!tmp.path().join("src/a.js").exists());
        assert!(tmp.path().join("strata.tsbuildinfo").is_file());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tmp = project("", &[("src/a.ts", "export const x = 1;")]);
        let dry = BuildArgs {
            dry: true,
            ..args(tmp.path())
        };
        assert_eq!(run(&dry, &global()).unwrap(), EXIT_SUCCESS);
        assert!(!tmp.path().join("src/a.js").exists());
        assert!(!tmp.path().join("strata.tsbuildinfo").exists());
    }
}
