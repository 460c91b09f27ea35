//! Static runnability checks for declared test commands.
//!
//! Nothing here executes a command. Each recognised tool family gets a checker
//! that confirms the scripts, modules or targets it references exist under the
//! repository root. Shapes we do not recognise are accepted through an explicit
//! [`CommandAcceptance::DefaultAllow`] variant so the permissive paths stay
//! visible and testable.

use crate::core::paths;
use crate::core::shell;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

const SOURCE_EXTENSIONS: &[&str] = &[".py", ".js", ".mjs", ".cjs", ".ts"];
const PYTEST_CONFIG_FILES: &[&str] = &["pytest.ini", "pyproject.toml", "setup.cfg"];
const PYTEST_VALUE_FLAGS: &[&str] = &[
    "-k",
    "-m",
    "-p",
    "-c",
    "-o",
    "--rootdir",
    "--maxfail",
    "--durations",
    "--tb",
    "--log-level",
    "--junitxml",
    "--basetemp",
    "--confcutdir",
    "--ignore",
    "--deselect",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFamily {
    PackageManager,
    Interpreter,
    Pytest,
    GoTest,
    Cargo,
    Unknown,
}

/// Why a command was let through without a positive existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAllowReason {
    /// `python -m mod` / `node` without a path-like target.
    BareModule,
    /// Tool not in the dispatch table and no path-like argument was missing.
    UnknownTool,
    /// Recognised tool, subcommand we do not model (`npm install`, `go vet`).
    UnmodeledSubcommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAcceptance {
    Verified { tool: ToolFamily },
    DefaultAllow { tool: ToolFamily, reason: DefaultAllowReason },
}

impl CommandAcceptance {
    pub fn tool(&self) -> ToolFamily {
        match self {
            Self::Verified { tool } | Self::DefaultAllow { tool, .. } => *tool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    EmptyCommand,
    InvalidPath(String),
    MissingDir(String),
    MissingFile(String),
    MissingPath(String),
    InvalidJson(String),
    MissingNpmScript { dir: String, script: String },
    PytestConfigMissing,
}

impl CommandFailure {
    /// Stable snake-case code without the detail suffix.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyCommand => "empty_command",
            Self::InvalidPath(_) => "invalid_path",
            Self::MissingDir(_) => "missing_dir",
            Self::MissingFile(_) => "missing_file",
            Self::MissingPath(_) => "missing_path",
            Self::InvalidJson(_) => "invalid_json",
            Self::MissingNpmScript { .. } => "missing_npm_script",
            Self::PytestConfigMissing => "pytest_config_missing",
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand | Self::PytestConfigMissing => write!(f, "{}", self.code()),
            Self::InvalidPath(p)
            | Self::MissingDir(p)
            | Self::MissingFile(p)
            | Self::MissingPath(p)
            | Self::InvalidJson(p) => write!(f, "{}:{}", self.code(), p),
            Self::MissingNpmScript { dir, script } => {
                write!(f, "{}:{}:{}", self.code(), dir, script)
            }
        }
    }
}

pub type CommandCheck = Result<CommandAcceptance, CommandFailure>;

/// Validate one declared test command against the tree at `root`.
pub fn validate_command(root: &Path, command: &str) -> CommandCheck {
    let tokens = shell::tokenize(command);
    let Some(first) = tokens.first() else {
        return Err(CommandFailure::EmptyCommand);
    };
    let tool = first.to_ascii_lowercase();
    let args = &tokens[1..];
    debug!(tool = %tool, argc = args.len(), "validating command");

    match tool.as_str() {
        "npm" | "pnpm" | "yarn" | "bun" => check_package_manager(root, args),
        "python" | "python3" | "node" => check_interpreter(root, &tool, args),
        "pytest" | "py.test" => check_pytest(root, args),
        "go" => check_go(root, args),
        "cargo" => check_cargo(root, args),
        _ => check_unknown(root, args),
    }
}

/// Normalize a referenced path, failing closed on anything `normalize` rejects.
fn safe_rel(rel: &str) -> Result<String, CommandFailure> {
    paths::normalize(rel).ok_or_else(|| CommandFailure::InvalidPath(rel.to_string()))
}

fn is_flag(arg: &str) -> bool {
    arg.starts_with('-')
}

fn is_path_like(arg: &str) -> bool {
    arg.contains('/')
        || arg.contains('\\')
        || SOURCE_EXTENSIONS.iter().any(|ext| arg.ends_with(ext))
}

fn check_package_manager(root: &Path, args: &[String]) -> CommandCheck {
    let tool = ToolFamily::PackageManager;
    let mut dir_arg: Option<&str> = None;
    let mut positional: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if let Some(value) = arg.strip_prefix("--prefix=") {
            dir_arg = Some(value);
        } else if arg == "--prefix" || arg == "-C" {
            let Some(value) = args.get(i + 1) else {
                return Err(CommandFailure::InvalidPath(String::new()));
            };
            dir_arg = Some(value.as_str());
            i += 1;
        } else if !is_flag(arg) {
            positional.push(arg);
        }
        i += 1;
    }

    let dir = match dir_arg {
        None => ".".to_string(),
        Some(raw) => match raw.trim() {
            "." | "./" => ".".to_string(),
            _ => safe_rel(raw)?,
        },
    };
    let dir_path = root.join(&dir);
    if !dir_path.is_dir() {
        return Err(CommandFailure::MissingDir(dir));
    }
    let manifest_rel = if dir == "." {
        "package.json".to_string()
    } else {
        format!("{}/package.json", dir)
    };
    let manifest_path = dir_path.join("package.json");
    if !manifest_path.is_file() {
        return Err(CommandFailure::MissingFile(manifest_rel));
    }

    let script = match positional.as_slice() {
        ["run" | "run-script", name, ..] => Some(*name),
        ["test" | "t", ..] => Some("test"),
        _ => None,
    };
    let Some(script) = script else {
        return Ok(CommandAcceptance::DefaultAllow {
            tool,
            reason: DefaultAllowReason::UnmodeledSubcommand,
        });
    };

    let raw = fs::read_to_string(&manifest_path)
        .map_err(|_| CommandFailure::InvalidJson(manifest_rel.clone()))?;
    let manifest: Value =
        serde_json::from_str(&raw).map_err(|_| CommandFailure::InvalidJson(manifest_rel.clone()))?;
    let has_script = manifest
        .get("scripts")
        .and_then(Value::as_object)
        .is_some_and(|scripts| scripts.contains_key(script));
    if has_script {
        Ok(CommandAcceptance::Verified { tool })
    } else {
        Err(CommandFailure::MissingNpmScript {
            dir,
            script: script.to_string(),
        })
    }
}

fn check_interpreter(root: &Path, tool_name: &str, args: &[String]) -> CommandCheck {
    let tool = ToolFamily::Interpreter;
    if tool_name.starts_with("python")
        && args.first().is_some_and(|a| a == "-m")
        && args.get(1).is_some_and(|m| m == "pytest")
    {
        return check_pytest(root, &args[2..]);
    }

    match args.first() {
        Some(target) if !is_flag(target) && is_path_like(target) => {
            let rel = safe_rel(target)?;
            if root.join(&rel).is_file() {
                Ok(CommandAcceptance::Verified { tool })
            } else {
                Err(CommandFailure::MissingFile(rel))
            }
        }
        _ => Ok(CommandAcceptance::DefaultAllow {
            tool,
            reason: DefaultAllowReason::BareModule,
        }),
    }
}

fn check_pytest(root: &Path, args: &[String]) -> CommandCheck {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if PYTEST_VALUE_FLAGS.contains(&arg) {
            i += 2;
            continue;
        }
        if !is_flag(arg) {
            let target = arg.split("::").next().unwrap_or(arg);
            let rel = safe_rel(target)?;
            if !root.join(&rel).exists() {
                return Err(CommandFailure::MissingPath(rel));
            }
        }
        i += 1;
    }

    let has_config = PYTEST_CONFIG_FILES.iter().any(|f| root.join(f).is_file());
    if !has_config && !root.join("tests").is_dir() {
        return Err(CommandFailure::PytestConfigMissing);
    }
    Ok(CommandAcceptance::Verified {
        tool: ToolFamily::Pytest,
    })
}

fn check_go(root: &Path, args: &[String]) -> CommandCheck {
    if args.first().is_some_and(|a| a == "test") {
        if root.join("go.mod").is_file() {
            return Ok(CommandAcceptance::Verified {
                tool: ToolFamily::GoTest,
            });
        }
        return Err(CommandFailure::MissingFile("go.mod".to_string()));
    }
    Ok(CommandAcceptance::DefaultAllow {
        tool: ToolFamily::GoTest,
        reason: DefaultAllowReason::UnmodeledSubcommand,
    })
}

fn check_cargo(root: &Path, args: &[String]) -> CommandCheck {
    if args.first().is_some_and(|a| a == "test") {
        if root.join("Cargo.toml").is_file() {
            return Ok(CommandAcceptance::Verified {
                tool: ToolFamily::Cargo,
            });
        }
        return Err(CommandFailure::MissingFile("Cargo.toml".to_string()));
    }
    Ok(CommandAcceptance::DefaultAllow {
        tool: ToolFamily::Cargo,
        reason: DefaultAllowReason::UnmodeledSubcommand,
    })
}

fn check_unknown(root: &Path, args: &[String]) -> CommandCheck {
    for arg in args.iter().filter(|a| !is_flag(a) && is_path_like(a)) {
        let rel = safe_rel(arg)?;
        if !root.join(&rel).exists() {
            return Err(CommandFailure::MissingPath(rel));
        }
    }
    Ok(CommandAcceptance::DefaultAllow {
        tool: ToolFamily::Unknown,
        reason: DefaultAllowReason::UnknownTool,
    })
}
