use crate::core::output;
use crate::registry::model::RegistryIssue;
use std::io;
use thiserror::Error;

/// Structural failures: the gate could not evaluate, as opposed to a verdict that failed policy.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Cannot evaluate: {0}")]
    MissingInput(String),
    #[error("Cannot read input {path}: {message}")]
    InputError { path: String, message: String },
    #[error("Invalid glob '{pattern}': {message}")]
    GlobError { pattern: String, message: String },
    #[error("Policy registry invalid ({} issue(s)): {}", issues.len(), render_issues(issues))]
    RegistryInvalid { issues: Vec<RegistryIssue> },
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl GateError {
    /// Stable snake-case code for programmatic branching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IoError(_) => "io_error",
            Self::JsonError(_) => "invalid_json",
            Self::ConfigError(_) => "invalid_config",
            Self::MissingInput(_) => "missing_input",
            Self::InputError { .. } => "invalid_input",
            Self::GlobError { .. } => "invalid_glob",
            Self::RegistryInvalid { .. } => "registry_invalid",
            Self::LockPoisoned(_) => "lock_poisoned",
        }
    }
}

fn render_issues(issues: &[RegistryIssue]) -> String {
    let lines = issues.iter().map(|i| i.to_string()).collect::<Vec<_>>();
    output::summarize(&lines, 5, 160)
}
