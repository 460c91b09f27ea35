//! scc-preflight: a fail-closed admission gate for agent task dispatch.
//!
//! Before an agent is handed a task, the gate checks that the task is
//! executable as described:
//!
//! - every required file exists and sits inside the pinned scope
//! - every declared test command can actually run in the repository
//! - every required symbol is covered by the pin
//! - the role executing the task may write every in-scope file
//!
//! The answer is a deterministic [`core::preflight::Verdict`]. Any doubt
//! resolves to deny.
//!
//! # Crate Structure
//!
//! - [`core`]: path matching, shell tokenizing, command validation, the gate
//!   itself and the shared error, config and logging plumbing
//! - [`registry`]: role policies, the role↔skill matrix and the skill
//!   registry, loaded into one cross-validated model with an mtime-keyed cache
//!
//! # Examples
//!
//! ```bash
//! # Evaluate a task against a policy file
//! scc-preflight evaluate --task task.json --pin pin.json --policy policy.json
//!
//! # Same, resolving the policy from the registry by role
//! scc-preflight evaluate --task task.json --pin pin.json --role implementer --format json
//!
//! # Cross-check the registry
//! scc-preflight registry check --lenient
//! ```

pub mod core;
pub mod registry;

mod cli;

use cli::{Cli, Command, EvaluateCli, OutputFormat, RegistryCli, RegistryCommand};
use core::config::{self, GateConfig};
use core::error::GateError;
use core::logging;
use core::preflight::{self, PinSpec, PreflightGate, TaskDescriptor, Verdict};
use registry::model::{PolicyRegistry, RegistryIssue, RolePolicy};

use clap::Parser;
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a command that ran to completion.
///
/// `Fail` means the inputs were well formed but policy said no; structural
/// problems come back as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    fn from_pass(pass: bool) -> Self {
        if pass { Self::Pass } else { Self::Fail }
    }
}

pub fn run() -> Result<Outcome, GateError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Evaluate(args) => run_evaluate(args),
        Command::Registry(args) => run_registry(args),
    }
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf, GateError> {
    match root {
        Some(root) => Ok(root),
        None => Ok(std::env::current_dir()?),
    }
}

fn read_json_input<T: DeserializeOwned>(path: &Path) -> Result<T, GateError> {
    let raw = fs::read_to_string(path).map_err(|e| GateError::InputError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| GateError::InputError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn snapshot_registry(
    root: &Path,
    config: &GateConfig,
) -> Result<Arc<registry::RegistrySnapshot>, GateError> {
    registry::global_cache(root, config.registry.strict)?.current()
}

fn run_evaluate(args: EvaluateCli) -> Result<Outcome, GateError> {
    let root = resolve_root(args.root)?;
    let config = config::load_config(&root)?;
    let task: TaskDescriptor = read_json_input(&args.task)?;
    let pin: PinSpec = read_json_input(&args.pin)?;
    let gate = PreflightGate::with_limits(&root, config.limits.clone());

    let verdict = match (&args.role, &args.policy) {
        (Some(role), _) => {
            let snapshot = snapshot_registry(&root, &config)?;
            gate.evaluate_for_role(Some(&task), Some(&pin), &snapshot.registry, role)?
        }
        (None, Some(policy_path)) => {
            let policy: RolePolicy = read_json_input(policy_path)?;
            gate.evaluate(Some(&task), Some(&pin), Some(&policy))?
        }
        (None, None) => gate.evaluate(Some(&task), Some(&pin), None)?,
    };

    if let Some(out) = &args.out {
        preflight::write_verdict(out, &verdict)?;
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdict)?),
        OutputFormat::Text => print_verdict(&verdict),
    }
    Ok(Outcome::from_pass(verdict.pass))
}

fn print_verdict(verdict: &Verdict) {
    let status = if verdict.pass {
        "PASS".bright_green().bold()
    } else {
        "FAIL".bright_red().bold()
    };
    println!("{} preflight {}", status, verdict.task_id.bright_white());

    let buckets = [
        ("files", &verdict.missing.files),
        ("symbols", &verdict.missing.symbols),
        ("tests", &verdict.missing.tests),
        ("write_scope", &verdict.missing.write_scope),
    ];
    for (name, items) in buckets {
        if items.is_empty() {
            continue;
        }
        println!("  {} missing.{} ({})", "▸".bright_cyan(), name, items.len());
        for item in items {
            println!("      {}", item);
        }
    }
    for note in &verdict.notes {
        println!("  {} {}", "ℹ".bright_yellow(), note);
    }
}

fn run_registry(args: RegistryCli) -> Result<Outcome, GateError> {
    let root = resolve_root(args.root)?;
    let config = config::load_config(&root)?;

    match args.command {
        RegistryCommand::Check { lenient } => {
            let load = registry::load(&root, config.registry.strict && !lenient)?;
            match args.format {
                OutputFormat::Json => {
                    let skills: Vec<&str> =
                        load.registry.skills().map(|s| s.skill_id.as_str()).collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "ok": load.ok,
                            "roles": load.registry.role_names(),
                            "skills": skills,
                            "issues": load.issues,
                        }))?
                    );
                }
                OutputFormat::Text => print_check(&load.registry, &load.issues),
            }
            Ok(Outcome::from_pass(load.ok))
        }
        RegistryCommand::Skills { role } => {
            let snapshot = snapshot_registry(&root, &config)?;
            let registry = &snapshot.registry;
            let key = registry.normalize_role(&role);
            let skills = registry.default_skills_capped(&role, config.limits.max_default_skills);
            match args.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "role": key,
                        "skills": skills,
                    }))?
                ),
                OutputFormat::Text => match key {
                    Some(key) => {
                        println!("{} {}", "Role:".bright_white().bold(), key);
                        for skill in &skills {
                            println!("  {} {}", "▸".bright_cyan(), skill);
                        }
                    }
                    None => println!("{} unknown role '{}'", "✗".bright_red(), role.trim()),
                },
            }
            Ok(Outcome::from_pass(key.is_some()))
        }
        RegistryCommand::Authorize { role, skills } => {
            let snapshot = snapshot_registry(&root, &config)?;
            let result = snapshot.registry.validate_skill_set(&role, &skills);
            match args.format {
                OutputFormat::Json => {
                    let denial = result.as_ref().err();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "allowed": result.is_ok(),
                            "denial": denial,
                        }))?
                    );
                }
                OutputFormat::Text => match &result {
                    Ok(()) => println!("{} allowed", "✓".bright_green()),
                    Err(denial) => println!("{} denied {}", "✗".bright_red(), denial),
                },
            }
            Ok(Outcome::from_pass(result.is_ok()))
        }
        RegistryCommand::CanWrite { role } => {
            let snapshot = snapshot_registry(&root, &config)?;
            let allowed = snapshot.registry.can_write_code(&role);
            match args.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "role": role.trim(),
                        "can_write_code": allowed,
                    }))?
                ),
                OutputFormat::Text => println!("{}", allowed),
            }
            Ok(Outcome::from_pass(allowed))
        }
    }
}

fn print_check(registry: &PolicyRegistry, issues: &[RegistryIssue]) {
    let roles = registry.role_names().len();
    let skills = registry.skills().count();
    if issues.is_empty() {
        println!(
            "{} registry ok ({} roles, {} skills)",
            "✓".bright_green(),
            roles,
            skills
        );
        return;
    }
    println!(
        "{} registry has {} issue(s) ({} roles, {} skills loaded)",
        "✗".bright_red(),
        issues.len(),
        roles,
        skills
    );
    for issue in issues {
        println!("  {} {}", "▸".bright_cyan(), issue);
    }
}
