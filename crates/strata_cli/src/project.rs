//! Project loading shared by every command.
//!
//! Locates `strata.toml`, loads it, and wires up the on-disk host, the
//! program, and diagnostic rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_common::path::{get_directory_path, get_relative_path_from_directory, normalize_slashes};
use strata_common::FilePath;
use strata_config::{get_build_info_file_path, resolve_root_files, CompilerOptions, ProjectConfig, CONFIG_FILE_NAME};
use strata_diagnostics::{Diagnostic, DiagnosticRenderer, SourceLookup, TerminalRenderer};
use strata_program::{CompilerProgram, Host, OsHost, Program};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `strata.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file to load.
///
/// An explicit project directory wins, then `--config` (a file, or a
/// directory holding `strata.toml`); otherwise the nearest `strata.toml`
/// above the working directory.
pub fn resolve_config_file(
    project: Option<&str>,
    global: &GlobalArgs,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(dir) = project {
        return Ok(PathBuf::from(dir).join(CONFIG_FILE_NAME));
    }
    if let Some(config) = &global.config {
        let path = PathBuf::from(config);
        if path.is_dir() {
            return Ok(path.join(CONFIG_FILE_NAME));
        }
        return Ok(path);
    }
    Ok(find_project_root(&std::env::current_dir()?)?.join(CONFIG_FILE_NAME))
}

/// A loaded project: its configuration and the host its files live on.
pub struct Project {
    /// The parsed configuration, with path options made absolute.
    pub config: ProjectConfig,
    /// The project directory, with forward slashes.
    pub directory: String,
    /// The filesystem host rooted at the project directory.
    pub host: Arc<OsHost>,
}

impl Project {
    /// Loads the project selected by `project` and the global flags.
    pub fn load(project: Option<&str>, global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config_file = resolve_config_file(project, global)?;
        let config = strata_config::load_config(&config_file)?;
        let config_path = config
            .compiler_options
            .config_file_path
            .clone()
            .unwrap_or_else(|| normalize_slashes(&config_file.to_string_lossy()));
        let directory = get_directory_path(&config_path);
        let host = Arc::new(OsHost::new(Path::new(&directory)));
        Ok(Self {
            config,
            directory,
            host,
        })
    }

    /// The compiler options from `strata.toml`.
    pub fn options(&self) -> &CompilerOptions {
        &self.config.compiler_options
    }

    /// Where the build info lives, if the project is incremental.
    pub fn build_info_file(&self) -> Option<String> {
        get_build_info_file_path(self.options())
    }

    /// Loads the program over the project's root files.
    pub fn program(&self) -> Result<Arc<dyn Program>, Box<dyn std::error::Error>> {
        let roots = resolve_root_files(&self.config)?;
        let host: Arc<dyn Host> = self.host.clone();
        Ok(Arc::new(CompilerProgram::new(roots, self.options().clone(), host)))
    }

    /// Prints `path` relative to the project directory.
    pub fn display_name(&self, path: &str) -> String {
        get_relative_path_from_directory(&self.directory, path, self.host.use_case_sensitive_file_names())
    }
}

/// Resolves diagnostic locations against a loaded program.
pub struct ProgramSources<'a> {
    /// The project the program was built from.
    pub project: &'a Project,
    /// The program whose files the diagnostics point into.
    pub program: &'a dyn Program,
}

impl SourceLookup for ProgramSources<'_> {
    fn display_name(&self, path: &FilePath) -> String {
        self.project.display_name(path.as_str())
    }

    fn source_text(&self, path: &FilePath) -> Option<&str> {
        self.program.source_file(path).map(|file| file.text())
    }
}

/// Renders each diagnostic to stderr.
pub fn render_diagnostics(diagnostics: &[Diagnostic], sources: &dyn SourceLookup, global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color, !global.quiet);
    for diag in diagnostics {
        eprintln!("{}", renderer.render(diag, sources));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    #[test]
    fn finds_config_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = tmp.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), tmp.path());
    }

    #[test]
    fn missing_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = find_project_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn project_flag_wins_over_config_flag() {
        let file = resolve_config_file(Some("/work/app"), &global(Some("/elsewhere/strata.toml".into()))).unwrap();
        assert_eq!(file, PathBuf::from("/work/app").join(CONFIG_FILE_NAME));
    }

    #[test]
    fn config_flag_accepts_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap().to_string();
        let file = resolve_config_file(None, &global(Some(dir))).unwrap();
        assert_eq!(file, tmp.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn loads_project_and_program() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/a.ts"), "export const a = 1;").unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"demo\"\ninclude = [\"src\"]\n\n[compiler_options]\nincremental = true\n",
        )
        .unwrap();

        let project = Project::load(tmp.path().to_str(), &global(None)).unwrap();
        let build_info = project.build_info_file().unwrap();
        assert!(build_info.ends_with("/strata.tsbuildinfo"));
        assert_eq!(project.display_name(&format!("{}/src/a.ts", project.directory)), "src/a.ts");

        let program = project.program().unwrap();
        assert!(program
            .source_files()
            .iter()
            .any(|file| file.file_name().ends_with("src/a.ts")));
    }
}
