//! End-to-end generations of an incremental build over the reference
//! frontend.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use strata_common::FilePath;
use strata_config::{CompilerOptions, ModuleKind};
use strata_incremental::{
    read_build_info_program, readable_build_info, BuildInfo, FileEmitKind, IncrementalProgram, Snapshot,
};
use strata_program::{CompilerProgram, EmitOptions, Host, MemoryHost, OsHost, Program, WriteFileData};

const BUILD_INFO: &str = "/p/app.tsbuildinfo";

fn options() -> CompilerOptions {
    CompilerOptions {
        module: Some(ModuleKind::EsNext),
        incremental: true,
        ts_build_info_file: Some(BUILD_INFO.to_string()),
        ..CompilerOptions::default()
    }
}

fn host(files: &[(&str, &str)]) -> Arc<MemoryHost> {
    Arc::new(MemoryHost::with_files("/p", files.iter().copied()))
}

fn program(host: &Arc<MemoryHost>, options: &CompilerOptions) -> Arc<dyn Program> {
    let roots = host
        .file_names()
        .into_iter()
        .filter(|name| name.ends_with(".ts") && !name.ends_with(".d.ts"))
        .collect();
    Arc::new(CompilerProgram::new_without_default_library(roots, options.clone(), host.clone()))
}

fn generation(host: &Arc<MemoryHost>, options: &CompilerOptions, old: Option<&Snapshot>) -> IncrementalProgram {
    IncrementalProgram::new(program(host, options), old)
}

fn path(name: &str) -> FilePath {
    FilePath::from_canonical(name)
}

fn paths(names: &[&str]) -> BTreeSet<FilePath> {
    names.iter().map(|name| path(name)).collect()
}

/// Runs the worklist to completion, returning every affected file.
fn drain(program: &mut IncrementalProgram) -> BTreeSet<FilePath> {
    let mut affected = BTreeSet::new();
    while let Some(file) = program.next_affected_file() {
        program.commit_affected_file(&file);
        affected.insert(file);
    }
    affected
}

fn codes(diagnostics: &[strata_diagnostics::Diagnostic]) -> Vec<u32> {
    diagnostics.iter().map(|diag| diag.code).collect()
}

const A: &str = "export const x = 1;";
const B: &str = "import { x } from './a';\nexport const y = x + 1;";
const C: &str = "import { y } from './b';\nexport const z = y;";

#[test]
fn cold_build_then_leaf_edit() {
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B)]);
    let mut first = generation(&host, &options(), None);
    assert_eq!(first.snapshot().changed_files(), &paths(&["/p/a.ts", "/p/b.ts"]));

    drain(&mut first);
    assert!(first.snapshot().changed_files().is_empty());
    assert!(first.snapshot().build_info_emit_pending());
    for file in ["/p/a.ts", "/p/b.ts"] {
        let info = first.snapshot().file_info(&path(file)).unwrap();
        assert!(!info.signature.is_empty());
        assert_ne!(info.signature, info.version);
    }

    host.set_file("/p/b.ts", "import { x } from './a';\nexport const y = x + 2;");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert_eq!(second.snapshot().changed_files(), &paths(&["/p/b.ts"]));
    assert_eq!(drain(&mut second), paths(&["/p/b.ts"]));
}

#[test]
fn unchanged_program_is_idempotent() {
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B)]);
    let mut first = generation(&host, &options(), None);
    first.semantic_diagnostics(None);
    let result = first.emit_to_host(&EmitOptions::default());
    assert!(!result.emit_skipped);
    assert!(host.take_written().contains(&BUILD_INFO.to_string()));

    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert!(second.snapshot().changed_files().is_empty());
    assert!(second.snapshot().affected_files_pending_emit().is_empty());
    assert!(!second.snapshot().build_info_emit_pending());
    assert!(second.semantic_diagnostics(None).is_empty());
    second.emit_to_host(&EmitOptions::default());
    assert!(host.take_written().is_empty());
}

#[test]
fn body_edit_does_not_reach_importers() {
    let host = host(&[
        ("/p/a.ts", "export function f(a: number) { return a; }"),
        ("/p/b.ts", "import { f } from './a';\nexport const y = f(1);"),
    ]);
    let mut first = generation(&host, &options(), None);
    drain(&mut first);

    host.set_file("/p/a.ts", "export function f(a: number) { return a * 2; }");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert_eq!(drain(&mut second), paths(&["/p/a.ts"]));
}

#[test]
fn shape_change_stops_where_shapes_settle() {
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B), ("/p/c.ts", C)]);
    let mut first = generation(&host, &options(), None);
    drain(&mut first);

    // `y` stays a number, so `c` is untouched.
    host.set_file("/p/a.ts", "export const x = 2;");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert_eq!(drain(&mut second), paths(&["/p/a.ts", "/p/b.ts"]));

    // `y` becomes a string, so `c` is affected too.
    host.set_file("/p/a.ts", "export const x = \"s\";");
    let old = second.into_snapshot();
    let mut third = generation(&host, &options(), Some(&old));
    assert_eq!(drain(&mut third), paths(&["/p/a.ts", "/p/b.ts", "/p/c.ts"]));
}

#[test]
fn isolated_modules_affect_direct_importers_only() {
    let options = CompilerOptions {
        isolated_modules: true,
        ..options()
    };
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B), ("/p/c.ts", C)]);
    let mut first = generation(&host, &options, None);
    drain(&mut first);

    host.set_file("/p/a.ts", "export const x = \"s\";");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options, Some(&old));
    assert_eq!(drain(&mut second), paths(&["/p/a.ts", "/p/b.ts"]));
}

#[test]
fn global_script_invalidates_every_file() {
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B), ("/p/g.ts", "export const g = 1;")]);
    let mut first = generation(&host, &options(), None);
    drain(&mut first);

    host.set_file("/p/g.ts", "var g = 1;");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert!(second.snapshot().file_info(&path("/p/g.ts")).unwrap().affects_global_scope);
    assert_eq!(drain(&mut second), paths(&["/p/a.ts", "/p/b.ts", "/p/g.ts"]));
}

#[test]
fn removing_global_script_invalidates_remaining_files() {
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B), ("/p/g.ts", "var g = 1;")]);
    let mut first = generation(&host, &options(), None);
    drain(&mut first);
    assert!(first.snapshot().file_info(&path("/p/g.ts")).unwrap().affects_global_scope);

    host.remove_file("/p/g.ts");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert!(second.snapshot().file_info(&path("/p/g.ts")).is_none());
    assert_eq!(second.snapshot().changed_files(), &paths(&["/p/a.ts", "/p/b.ts"]));
    assert!(second.snapshot().build_info_emit_pending());
    assert_eq!(drain(&mut second), paths(&["/p/a.ts", "/p/b.ts"]));
}

#[test]
fn interrupted_batch_is_redone() {
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B), ("/p/c.ts", C)]);
    let mut first = generation(&host, &options(), None);
    drain(&mut first);
    let signature = |snapshot: &Snapshot, name: &str| snapshot.file_info(&path(name)).unwrap().signature.clone();
    let settled_a = signature(first.snapshot(), "/p/a.ts");
    let settled_b = signature(first.snapshot(), "/p/b.ts");

    // Take the first affected file of the batch, then stop without committing.
    host.set_file("/p/a.ts", "export const x = \"s\";");
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert_eq!(second.next_affected_file(), Some(path("/p/a.ts")));
    assert_ne!(signature(second.snapshot(), "/p/a.ts"), settled_a);
    assert_ne!(signature(second.snapshot(), "/p/b.ts"), settled_b);

    // Build info written now records the signatures from before the batch.
    let persisted = BuildInfo::from_snapshot(second.snapshot(), second.program(), BUILD_INFO)
        .to_snapshot(BUILD_INFO, "/p", true)
        .unwrap();
    assert_eq!(signature(&persisted, "/p/a.ts"), settled_a);
    assert_eq!(signature(&persisted, "/p/b.ts"), settled_b);
    assert!(persisted.changed_files().contains(&path("/p/a.ts")));

    let interrupted = second.into_snapshot();
    let mut third = generation(&host, &options(), Some(&interrupted));
    assert_eq!(signature(third.snapshot(), "/p/a.ts"), settled_a);
    assert_eq!(drain(&mut third), paths(&["/p/a.ts", "/p/b.ts", "/p/c.ts"]));

    let mut resumed = generation(&host, &options(), Some(&persisted));
    assert_eq!(drain(&mut resumed), paths(&["/p/a.ts", "/p/b.ts", "/p/c.ts"]));
}

/// Edits the enum behind a re-exported value and returns what `/p/u.ts`
/// owes afterwards.
fn pending_for_user_after_enum_edit(before: &str, after: &str) -> Option<FileEmitKind> {
    let host = host(&[
        ("/p/e.ts", before),
        ("/p/m.ts", "import { Flag } from './e';\nexport const f = Flag.On;"),
        ("/p/u.ts", "import { f } from './m';\nexport const g = f;"),
    ]);
    let mut first = generation(&host, &options(), None);
    first.emit_to_host(&EmitOptions::default());
    host.take_written();

    host.set_file("/p/e.ts", after);
    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    let affected = drain(&mut second);
    assert!(affected.contains(&path("/p/m.ts")));
    assert!(!affected.contains(&path("/p/u.ts")));
    let pending = second.snapshot().affected_files_pending_emit().get(&path("/p/u.ts")).copied();

    second.emit_to_host(&EmitOptions::default());
    let written = host.take_written();
    assert!(written.contains(&"/p/m.js".to_string()));
    assert_eq!(written.contains(&"/p/u.js".to_string()), pending.is_some());
    pending
}

#[test]
fn const_enum_edit_re_emits_importers_javascript() {
    let pending = pending_for_user_after_enum_edit(
        "export const enum Flag { On = 1 }",
        "export const enum Flag { On = 2 }",
    );
    assert!(pending.is_some_and(|kind| kind.contains(FileEmitKind::JS)));
}

#[test]
fn plain_enum_edit_leaves_importers_of_importers_alone() {
    let pending = pending_for_user_after_enum_edit("export enum Flag { On = 1 }", "export enum Flag { On = 2 }");
    assert_eq!(pending, None);
}

#[test]
fn enabling_declaration_map_schedules_only_maps() {
    let declarations = CompilerOptions {
        declaration: true,
        ..options()
    };
    let host = host(&[("/p/a.ts", A), ("/p/b.ts", B)]);
    let mut first = generation(&host, &declarations, None);
    first.emit_to_host(&EmitOptions::default());
    host.take_written();

    let with_maps = CompilerOptions {
        declaration_map: true,
        ..declarations
    };
    let old = first.into_snapshot();
    let mut second = generation(&host, &with_maps, Some(&old));
    assert!(second.snapshot().changed_files().is_empty());
    let pending = second.snapshot().affected_files_pending_emit();
    assert_eq!(pending.len(), 2);
    assert!(pending.values().all(|&kind| kind == FileEmitKind::DTS_MAP));

    second.emit_to_host(&EmitOptions::default());
    assert!(host.take_written().contains(&"/p/a.d.ts.map".to_string()));
    assert!(second.snapshot().affected_files_pending_emit().is_empty());
}

#[test]
fn composite_skips_unchanged_declaration_files() {
    let composite = CompilerOptions {
        composite: true,
        ..options()
    };
    let host = host(&[
        ("/p/a.ts", "export function f(a: number) { return a; }"),
        ("/p/b.ts", "import { f } from './a';\nexport const y = f(1);"),
    ]);
    let mut first = generation(&host, &composite, None);
    first.emit_to_host(&EmitOptions::default());
    let written = host.take_written();
    assert!(written.contains(&"/p/a.d.ts".to_string()));
    assert!(first.snapshot().latest_changed_dts_file().is_some());

    host.set_file("/p/a.ts", "export function f(a: number) { return a * 2; }");
    let old = first.into_snapshot();
    let mut second = generation(&host, &composite, Some(&old));
    second.emit_to_host(&EmitOptions::default());
    let written = host.take_written();
    assert!(written.contains(&"/p/a.js".to_string()));
    assert!(!written.contains(&"/p/a.d.ts".to_string()));
    assert!(!written.contains(&"/p/b.js".to_string()));
    assert!(!second.snapshot().has_changed_emit_signature());
}

#[test]
fn failed_writes_stay_pending() {
    let host = host(&[("/p/a.ts", A)]);
    let mut first = generation(&host, &options(), None);
    let mut failing = |name: &str, _text: &str, _bom: bool, _data: &mut WriteFileData| -> io::Result<()> {
        if name == "/p/a.js" {
            Err(io::Error::other("disk full"))
        } else {
            Ok(())
        }
    };
    let result = first.emit(&EmitOptions::default(), &mut failing);
    assert_eq!(codes(&result.diagnostics), vec![5033]);
    assert!(first
        .snapshot()
        .affected_files_pending_emit()
        .contains_key(&path("/p/a.ts")));

    let old = first.into_snapshot();
    let mut second = generation(&host, &options(), Some(&old));
    assert!(second.snapshot().changed_files().is_empty());
    let result = second.emit_to_host(&EmitOptions::default());
    assert!(result.diagnostics.is_empty());
    assert!(host.take_written().contains(&"/p/a.js".to_string()));
    assert!(second.snapshot().affected_files_pending_emit().is_empty());
}

#[test]
fn failed_build_info_write_is_reported_once() {
    let host = host(&[("/p/a.ts", A)]);
    host.fail_writes_to(BUILD_INFO);
    let mut first = generation(&host, &options(), None);
    let result = first.emit_to_host(&EmitOptions::default());
    assert_eq!(codes(&result.diagnostics), vec![5033]);
    assert!(first.snapshot().build_info_emit_pending());
}

#[test]
fn no_emit_still_writes_build_info() {
    let no_emit = CompilerOptions {
        no_emit: true,
        ..options()
    };
    let host = host(&[("/p/a.ts", A)]);
    let mut first = generation(&host, &no_emit, None);
    first.semantic_diagnostics(None);
    let result = first.emit_to_host(&EmitOptions::default());
    assert!(result.emit_skipped);
    assert_eq!(host.take_written(), vec![BUILD_INFO.to_string()]);
}

#[test]
fn no_emit_on_error_skips_outputs() {
    let options = CompilerOptions {
        no_emit_on_error: true,
        ..options()
    };
    let host = host(&[("/p/a.ts", "export const a: string = 1;")]);
    let mut first = generation(&host, &options, None);
    let result = first.emit_to_host(&EmitOptions::default());
    assert!(result.emit_skipped);
    assert!(!result.diagnostics.is_empty());
    let written = host.take_written();
    assert!(!written.contains(&"/p/a.js".to_string()));
    assert!(written.contains(&BUILD_INFO.to_string()));
}

#[test]
fn declaration_diagnostics_are_cached_per_file() {
    let options = CompilerOptions {
        declaration: true,
        ..options()
    };
    let host = host(&[
        ("/p/a.ts", "interface Hidden { x: number }\nexport function make(): Hidden { return { x: 1 }; }"),
        ("/p/b.ts", "import { make } from './a';\nexport const value = make();"),
    ]);
    let mut first = generation(&host, &options, None);
    assert_eq!(codes(&first.declaration_diagnostics(None)), vec![4025]);
    assert!(host.take_written().is_empty());
    assert_eq!(codes(&first.declaration_diagnostics(Some(&path("/p/b.ts")))), vec![4025]);
    assert!(first.snapshot().emit_diagnostics_of(&path("/p/b.ts")).is_some());
}

#[test]
fn build_info_lists_files_in_id_order() {
    let options = CompilerOptions {
        declaration: true,
        ..options()
    };
    // Program order puts `a.ts` last, after the files it imports.
    let host = host(&[
        (
            "/p/a.ts",
            "import { make } from './z';\nimport { n } from './c';\nexport const again = make();\nexport const m = n;",
        ),
        ("/p/c.ts", "import { make } from './z';\nexport const value = make();\nexport const n = 1;"),
        ("/p/z.ts", "interface Hidden { x: number }\nexport function make(): Hidden { return { x: 1 }; }"),
    ]);
    let mut first = generation(&host, &options, None);
    assert_eq!(codes(&first.declaration_diagnostics(None)), vec![4025, 4025]);

    let build_info = BuildInfo::from_snapshot(first.snapshot(), first.program(), BUILD_INFO);
    assert_eq!(build_info.file_names, vec!["./z.ts", "./c.ts", "./a.ts"]);
    let ids: Vec<u32> = build_info
        .emit_diagnostics_per_file
        .iter()
        .map(|entry| entry.0.as_raw())
        .collect();
    assert_eq!(ids, vec![2, 3]);
    let changed: Vec<u32> = build_info.change_file_set.iter().map(|id| id.as_raw()).collect();
    assert!(changed.windows(2).all(|pair| pair[0] < pair[1]));

    let again = BuildInfo::from_snapshot(first.snapshot(), first.program(), BUILD_INFO);
    assert_eq!(serde_json::to_string(&again).unwrap(), serde_json::to_string(&build_info).unwrap());
}

#[test]
fn semantic_diagnostics_are_served_from_cache() {
    let host = host(&[("/p/a.ts", "export const a: string = 1;"), ("/p/b.ts", A)]);
    let mut first = generation(&host, &options(), None);
    assert_eq!(codes(&first.semantic_diagnostics(None)), vec![2322]);
    first.emit_to_host(&EmitOptions::default());

    let text = host.read_file(BUILD_INFO).unwrap();
    let build_info = BuildInfo::parse(&text).unwrap();
    assert_eq!(build_info.semantic_diagnostics_per_file.len(), 1);

    let old = read_build_info_program(&options(), host.as_ref()).unwrap();
    let mut second = generation(&host, &options(), Some(&old));
    assert!(second.snapshot().has_semantic_diagnostics(&path("/p/a.ts")));
    assert_eq!(
        codes(&second.semantic_diagnostics(Some(&path("/p/a.ts")))),
        vec![2322]
    );
}

#[test]
fn build_info_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(OsHost::new(dir.path()));
    let root = host.current_directory().to_string();
    let a = format!("{root}/src/a.ts");
    let b = format!("{root}/src/b.ts");
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(&a, A).unwrap();
    std::fs::write(&b, B).unwrap();

    let options = CompilerOptions {
        module: Some(ModuleKind::EsNext),
        composite: true,
        declaration_map: true,
        list_emitted_files: true,
        out_dir: Some(format!("{root}/out")),
        ts_build_info_file: Some(format!("{root}/out/app.tsbuildinfo")),
        ..CompilerOptions::default()
    };
    let make = || -> Arc<dyn Program> {
        Arc::new(CompilerProgram::new_without_default_library(
            vec![a.clone(), b.clone()],
            options.clone(),
            host.clone(),
        ))
    };

    let mut first = IncrementalProgram::new(make(), None);
    assert!(first.semantic_diagnostics(None).is_empty());
    let result = first.emit_to_host(&EmitOptions::default());
    assert!(result.diagnostics.is_empty());
    assert!(result.emitted_files.contains(&format!("{root}/out/app.tsbuildinfo")));

    let decoded = read_build_info_program(&options, host.as_ref()).unwrap();
    let written = first.snapshot();
    assert_eq!(decoded.file_infos(), written.file_infos());
    for file in [&a, &b] {
        let file = path(file);
        assert_eq!(
            decoded.referenced_map().unwrap().references(&file),
            written.referenced_map().unwrap().references(&file)
        );
        assert_eq!(decoded.emit_signature(&file), written.emit_signature(&file));
    }
    assert_eq!(decoded.changed_files(), written.changed_files());
    assert_eq!(decoded.affected_files_pending_emit(), written.affected_files_pending_emit());
    assert_eq!(decoded.latest_changed_dts_file(), written.latest_changed_dts_file());

    let mut second = IncrementalProgram::new(make(), Some(&decoded));
    assert!(second.snapshot().changed_files().is_empty());
    assert!(drain(&mut second).is_empty());
    let result = second.emit_to_host(&EmitOptions::default());
    assert!(result.emitted_files.is_empty());

    let text = std::fs::read_to_string(dir.path().join("out/app.tsbuildinfo")).unwrap();
    let readable = readable_build_info(&BuildInfo::parse(&text).unwrap()).unwrap();
    assert_eq!(readable["fileNames"][0], "../src/a.ts");
    assert_eq!(readable["referencedMap"]["../src/b.ts"][0], "../src/a.ts");
}

#[test]
fn corrupt_build_info_is_ignored() {
    let host = host(&[("/p/a.ts", A)]);
    host.set_file(BUILD_INFO, "{\"version\":");
    assert!(read_build_info_program(&options(), host.as_ref()).is_none());
    host.set_file(BUILD_INFO, "{\"version\":\"0.0.0-elsewhere\",\"fileNames\":[\"./a.ts\"]}");
    assert!(read_build_info_program(&options(), host.as_ref()).is_none());
}
