//! CLI struct definitions for the `scc-preflight` command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "scc-preflight",
    version = env!("CARGO_PKG_VERSION"),
    about = "Fail-closed pre-dispatch gate: checks a task's files, test commands, symbols and write scope before an agent runs it."
)]
pub(crate) struct Cli {
    /// Emit debug logs on stderr (SCC_LOG overrides).
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Evaluate one dispatch attempt and print the verdict
    #[clap(name = "evaluate", visible_alias = "e")]
    Evaluate(EvaluateCli),

    /// Inspect and query the policy & authorization registry
    #[clap(name = "registry", visible_alias = "r")]
    Registry(RegistryCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct EvaluateCli {
    /// Task descriptor JSON file.
    #[clap(long)]
    pub task: PathBuf,
    /// Pin specification JSON file.
    #[clap(long)]
    pub pin: PathBuf,
    /// Role policy JSON file.
    #[clap(long, conflicts_with = "role")]
    pub policy: Option<PathBuf>,
    /// Resolve the role policy from the registry instead of a file.
    #[clap(long)]
    pub role: Option<String>,
    /// Repository root (defaults to current working directory).
    #[clap(long)]
    pub root: Option<PathBuf>,
    /// Also write the verdict JSON to this path.
    #[clap(long)]
    pub out: Option<PathBuf>,
    #[clap(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub(crate) struct RegistryCli {
    /// Repository root (defaults to current working directory).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    #[clap(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: RegistryCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum RegistryCommand {
    /// Load and cross-validate the registry, reporting every issue
    Check {
        /// Report issues without failing on the first structural error.
        #[clap(long)]
        lenient: bool,
    },
    /// List a role's default skills
    Skills {
        #[clap(long)]
        role: String,
    },
    /// Check that a set of skills is allowed for a role
    Authorize {
        #[clap(long)]
        role: String,
        #[clap(long = "skill", required = true)]
        skills: Vec<String>,
    },
    /// Report whether a role may write code
    CanWrite {
        #[clap(long)]
        role: String,
    },
}
