//! Strata CLI: the command-line interface for the Strata incremental compiler.
//!
//! Provides `strata build` to check and emit a project, reusing whatever the
//! previous build left valid, `strata status` to inspect the persisted state
//! without building, and `strata buildinfo` to dump the build-info file.

#![warn(missing_docs)]

mod build;
mod buildinfo;
mod logging;
mod project;
mod status;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Strata, an incremental TypeScript-subset compiler.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata incremental compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `strata.toml` file, or a directory containing one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check and emit the project, redoing only what changed.
    Build(BuildArgs),
    /// Show what the last build left pending.
    Status,
    /// Print the build-info file.
    Buildinfo(BuildInfoArgs),
}

/// Arguments for the `strata build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Project directory containing `strata.toml`.
    #[arg(short, long)]
    pub project: Option<String>,

    /// Ignore the previous build info and rebuild everything.
    #[arg(short, long)]
    pub force: bool,

    /// Check and list pending outputs without writing anything.
    #[arg(long)]
    pub dry: bool,
}

/// Arguments for the `strata buildinfo` subcommand.
#[derive(Parser, Debug)]
pub struct BuildInfoArgs {
    /// Expand file ids into names and spell out emit kinds.
    #[arg(short, long)]
    pub readable: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Status => status::run(&global),
        Command::Buildinfo(ref args) => buildinfo::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_build_default() {
        let cli = Cli::parse_from(["strata", "build"]);
        match cli.command {
            Command::Build(ref args) => {
                assert!(args.project.is_none());
                assert!(!args.force);
                assert!(!args.dry);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_with_args() {
        let cli = Cli::parse_from(["strata", "build", "--project", "app", "--force", "--dry"]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.project.as_deref(), Some("app"));
                assert!(args.force);
                assert!(args.dry);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_short_flags() {
        let cli = Cli::parse_from(["strata", "build", "-p", "app", "-f"]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.project.as_deref(), Some("app"));
                assert!(args.force);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_status() {
        let cli = Cli::parse_from(["strata", "status"]);
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn parse_buildinfo_readable() {
        let cli = Cli::parse_from(["strata", "buildinfo", "--readable"]);
        match cli.command {
            Command::Buildinfo(ref args) => assert!(args.readable),
            _ => panic!("expected Buildinfo command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strata", "--quiet", "--color", "never", "build"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["strata", "status", "--verbose", "--color", "always"]);
        assert!(cli.verbose);
        assert_eq!(cli.color, ColorChoice::Always);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["strata", "--config", "/path/to/strata.toml", "status"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/strata.toml"));
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["strata"]).is_err());
    }
}
