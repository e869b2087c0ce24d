// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `webdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "webdag",
    version,
    about = "Build, watch and serve a TypeScript + Sass web project.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (e.g. build, clean, serve, test).
    #[arg(value_name = "TASK", default_value = "default")]
    pub task: String,

    /// Path to the config file (TOML).
    ///
    /// The file is optional; every setting has a default. Paths inside it are
    /// relative to the directory containing it.
    #[arg(long, value_name = "PATH", default_value = "Webdag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WEBDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the execution plan for TASK without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// List every task with its prerequisites and exit.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_defaults_to_default() {
        let args = CliArgs::parse_from(["webdag"]);
        assert_eq!(args.task, "default");
        assert_eq!(args.config, "Webdag.toml");
        assert!(!args.dry_run);
    }

    #[test]
    fn flags_and_task_are_parsed() {
        let args = CliArgs::parse_from([
            "webdag",
            "build",
            "--config",
            "site/Webdag.toml",
            "--log-level",
            "debug",
            "--dry-run",
        ]);
        assert_eq!(args.task, "build");
        assert_eq!(args.config, "site/Webdag.toml");
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
