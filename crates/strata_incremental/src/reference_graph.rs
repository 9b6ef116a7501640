//! The file dependency graph, indexed in both directions.
//!
//! An edge `a -> b` means `a` uses declarations of `b`. The forward map
//! answers "what does `a` reference" for change detection; the reverse map
//! answers "who references `b`" for invalidation. Both maps are updated
//! together so neither direction needs a scan.

use std::collections::{BTreeSet, HashMap};
use strata_common::path::{get_directory_path, to_path};
use strata_common::FilePath;
use strata_program::{ModuleAugmentation, Program, SourceFile};

/// Forward and reverse reference maps.
#[derive(Clone, Debug, Default)]
pub struct ReferenceGraph {
    references: HashMap<FilePath, BTreeSet<FilePath>>,
    referenced_by: HashMap<FilePath, BTreeSet<FilePath>>,
}

impl ReferenceGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the references of `file`.
    pub fn set(&mut self, file: FilePath, references: BTreeSet<FilePath>) {
        self.remove(&file);
        for target in &references {
            self.referenced_by
                .entry(target.clone())
                .or_default()
                .insert(file.clone());
        }
        if !references.is_empty() {
            self.references.insert(file, references);
        }
    }

    /// Removes every edge leaving `file`.
    pub fn remove(&mut self, file: &FilePath) {
        let Some(old) = self.references.remove(file) else {
            return;
        };
        for target in old {
            if let Some(sources) = self.referenced_by.get_mut(&target) {
                sources.remove(file);
                if sources.is_empty() {
                    self.referenced_by.remove(&target);
                }
            }
        }
    }

    /// The files `file` references.
    pub fn references(&self, file: &FilePath) -> Option<&BTreeSet<FilePath>> {
        self.references.get(file)
    }

    /// The files referencing `file`.
    pub fn referenced_by(&self, file: &FilePath) -> Option<&BTreeSet<FilePath>> {
        self.referenced_by.get(file)
    }

    /// Owned copy of [`referenced_by`](Self::referenced_by), empty when unreferenced.
    pub(crate) fn referencing_files(&self, file: &FilePath) -> Vec<FilePath> {
        self.referenced_by(file)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Files with outgoing edges, sorted.
    pub fn files(&self) -> Vec<&FilePath> {
        let mut files: Vec<&FilePath> = self.references.keys().collect();
        files.sort();
        files
    }

    /// Number of files with outgoing edges.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Returns `true` if the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl PartialEq for ReferenceGraph {
    fn eq(&self, other: &Self) -> bool {
        self.references == other.references
    }
}

impl Eq for ReferenceGraph {}

/// The files whose declarations `file` depends on, or `None` if there are none.
///
/// Covers resolved imports and re-exports, module augmentations, triple-slash
/// path references, resolved type-reference directives, and every other file
/// declaring an ambient module that is declared in more than one file.
pub fn referenced_files(program: &dyn Program, file: &SourceFile) -> Option<BTreeSet<FilePath>> {
    let mut referenced = BTreeSet::new();

    if !file.imports().is_empty() || !file.module_augmentations().is_empty() {
        let checker = program.type_checker_for_file(file);
        let augmented = file
            .module_augmentations()
            .iter()
            .filter_map(|augmentation| match augmentation {
                ModuleAugmentation::Module(name) => Some(name),
                ModuleAugmentation::Global => None,
            });
        for specifier in file.imports().iter().chain(augmented) {
            referenced.extend(
                checker
                    .module_declaration_files(file, &specifier.text)
                    .into_iter()
                    .filter(|declaring| declaring != file.path()),
            );
        }
    }

    let directory = get_directory_path(file.file_name());
    let case_sensitive = program.use_case_sensitive_file_names();
    let mut add_file_name = |file_name: &str| {
        let path = match program.parse_file_redirect(file_name) {
            Some(redirect) => to_path(&redirect, program.current_directory(), case_sensitive),
            None => to_path(file_name, &directory, case_sensitive),
        };
        referenced.insert(path);
    };
    for reference in file.referenced_files() {
        add_file_name(&reference.file_name);
    }
    for resolved in program.resolved_type_reference_directives(file) {
        add_file_name(&resolved);
    }

    let checker = program.type_checker_for_file(file);
    for declaring_files in checker.ambient_module_files() {
        if declaring_files.len() > 1 {
            referenced.extend(
                declaring_files
                    .into_iter()
                    .filter(|declaring| declaring != file.path()),
            );
        }
    }

    (!referenced.is_empty()).then_some(referenced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_config::CompilerOptions;
    use strata_program::{CompilerProgram, MemoryHost};

    fn path(name: &str) -> FilePath {
        FilePath::from_canonical(name)
    }

    fn set(names: &[&str]) -> BTreeSet<FilePath> {
        names.iter().map(|name| path(name)).collect()
    }

    #[test]
    fn both_directions_stay_in_sync() {
        let mut graph = ReferenceGraph::new();
        graph.set(path("/a.ts"), set(&["/b.ts", "/c.ts"]));
        graph.set(path("/d.ts"), set(&["/b.ts"]));
        assert_eq!(graph.referenced_by(&path("/b.ts")), Some(&set(&["/a.ts", "/d.ts"])));
        assert_eq!(graph.referenced_by(&path("/c.ts")), Some(&set(&["/a.ts"])));

        graph.set(path("/a.ts"), set(&["/c.ts"]));
        assert_eq!(graph.referenced_by(&path("/b.ts")), Some(&set(&["/d.ts"])));

        graph.remove(&path("/d.ts"));
        assert_eq!(graph.referenced_by(&path("/b.ts")), None);
        assert_eq!(graph.files(), vec![&path("/a.ts")]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn empty_reference_sets_are_not_stored() {
        let mut graph = ReferenceGraph::new();
        graph.set(path("/a.ts"), BTreeSet::new());
        assert!(graph.is_empty());
        assert_eq!(graph.references(&path("/a.ts")), None);
    }

    #[test]
    fn references_from_program() {
        let host = Arc::new(MemoryHost::with_files(
            "/p",
            [
                ("/p/a.ts", "export const a = 1;"),
                ("/p/b.ts", "/// <reference path=\"./g.d.ts\" />\nimport { a } from './a';\nexport const b = a;"),
                ("/p/g.d.ts", "declare var G: number;"),
                ("/p/m1.d.ts", "declare module 'shared' { export const x: number; }"),
                ("/p/m2.d.ts", "declare module 'shared' { export const y: number; }"),
            ],
        ));
        let program = CompilerProgram::new_without_default_library(
            vec!["/p/b.ts".to_string(), "/p/m1.d.ts".to_string(), "/p/m2.d.ts".to_string()],
            CompilerOptions::default(),
            host,
        );
        let b = program.source_file(&path("/p/b.ts")).unwrap();
        assert_eq!(
            referenced_files(&program, b),
            Some(set(&["/p/a.ts", "/p/g.d.ts", "/p/m1.d.ts", "/p/m2.d.ts"]))
        );
        let m1 = program.source_file(&path("/p/m1.d.ts")).unwrap();
        assert_eq!(referenced_files(&program, m1), Some(set(&["/p/m2.d.ts"])));
    }
}
