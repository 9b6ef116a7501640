//! `strata status`: what the next build would redo, read from build info.
//!
//! Nothing is parsed or checked: the report covers the state the last build
//! persisted, plus root files whose content no longer matches the recorded
//! version.

use strata_common::hash::compute_hash;
use strata_incremental::{read_build_info, Snapshot};
use strata_program::frontend::lib_file::DEFAULT_LIB_FILE_NAME;
use strata_program::Host;

use crate::project::Project;
use crate::GlobalArgs;

/// A file whose recorded version no longer matches the disk.
#[derive(Debug, PartialEq, Eq)]
pub enum Drift {
    /// The content changed.
    Modified(String),
    /// The file is gone.
    Deleted(String),
}

/// Runs the `strata status` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(None, global)?;
    let Some(file) = project.build_info_file() else {
        println!("{} is not incremental; nothing is persisted", project.config.project.name);
        return Ok(0);
    };
    let host = project.host.as_ref();
    let Some(build_info) = read_build_info(&file, host)? else {
        println!("no build info at {}; run `strata build`", project.display_name(&file));
        return Ok(0);
    };
    let snapshot = build_info.to_snapshot(&file, host.current_directory(), host.use_case_sensitive_file_names())?;

    println!("build info: {} (version {})", project.display_name(&file), build_info.version);
    println!("files: {}", snapshot.file_infos().len());

    let changed = snapshot.changed_files();
    println!("unprocessed changes: {}", changed.len());
    for path in changed {
        println!("  {}", project.display_name(path.as_str()));
    }

    let pending = snapshot.affected_files_pending_emit();
    println!("pending emit: {}", pending.len());
    for (path, kind) in pending {
        println!("  {} ({kind})", project.display_name(path.as_str()));
    }

    println!("cached errors: {}", snapshot.cached_error_count());
    if snapshot.check_pending() {
        println!("type checking pending");
    }
    if let Some(dts) = snapshot.latest_changed_dts_file() {
        println!("latest changed declaration file: {}", project.display_name(dts));
    }

    let drift = drift(&snapshot, host);
    if !global.quiet {
        println!("changed on disk: {}", drift.len());
        for entry in &drift {
            match entry {
                Drift::Modified(name) => println!("  modified {}", project.display_name(name)),
                Drift::Deleted(name) => println!("  deleted  {}", project.display_name(name)),
            }
        }
    }
    Ok(0)
}

/// Compares each recorded file's version against its current content.
pub fn drift(snapshot: &Snapshot, host: &dyn Host) -> Vec<Drift> {
    snapshot
        .file_infos()
        .into_iter()
        .filter(|(path, _)| path.as_str() != DEFAULT_LIB_FILE_NAME)
        .filter_map(|(path, info)| match host.read_file(path.as_str()) {
            None => Some(Drift::Deleted(path.as_str().to_string())),
            Some(text) if compute_hash(&text) != info.version => Some(Drift::Modified(path.as_str().to_string())),
            Some(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_config::{CompilerOptions, ModuleKind};
    use strata_incremental::IncrementalProgram;
    use strata_program::{CompilerProgram, EmitOptions, MemoryHost};

    #[test]
    fn drift_reports_edits_and_deletions() {
        let host = Arc::new(MemoryHost::with_files(
            "/p",
            [("/p/a.ts", "export const a = 1;"), ("/p/b.ts", "export const b = 1;"), ("/p/c.ts", "export const c = 1;")],
        ));
        let options = CompilerOptions {
            module: Some(ModuleKind::EsNext),
            incremental: true,
            ts_build_info_file: Some("/p/app.tsbuildinfo".to_string()),
            ..CompilerOptions::default()
        };
        let roots = vec!["/p/a.ts".to_string(), "/p/b.ts".to_string(), "/p/c.ts".to_string()];
        let program = Arc::new(CompilerProgram::new(roots, options, host.clone()));
        let mut builder = IncrementalProgram::new(program, None);
        builder.emit_to_host(&EmitOptions::default());

        host.set_file("/p/a.ts", "export const a = 2;");
        host.remove_file("/p/b.ts");
        let drift = drift(builder.snapshot(), host.as_ref());
        assert_eq!(
            drift,
            vec![Drift::Modified("/p/a.ts".to_string()), Drift::Deleted("/p/b.ts".to_string())]
        );
    }
}
