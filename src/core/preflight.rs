//! Preflight gate: fail-closed admission check run before a task is dispatched.
//!
//! The gate is a pure function of its inputs, the files under the repository
//! root, and (for [`PreflightGate::evaluate_for_role`]) a registry snapshot.
//! Structural problems surface as [`GateError`]; policy problems land in the
//! [`Verdict`] buckets and drive `pass = false`.

use crate::core::command;
use crate::core::config::Limits;
use crate::core::error::GateError;
use crate::core::output;
use crate::core::paths::{self, ALLOW_ALL, GlobMatcher};
use crate::registry::model::{PolicyRegistry, RolePolicy, WritePermissions};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Verdict format identifier. Part of the persisted compatibility contract.
pub const VERDICT_SCHEMA_VERSION: &str = "scc.preflight.v1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(default, alias = "id")]
    pub task_id: String,
    #[serde(default)]
    pub required_files: Vec<String>,
    #[serde(default)]
    pub allowed_tests: Vec<String>,
    #[serde(default)]
    pub required_symbols: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSpec {
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub symbols: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingBuckets {
    pub files: Vec<String>,
    pub symbols: Vec<String>,
    pub tests: Vec<String>,
    pub write_scope: Vec<String>,
}

impl MissingBuckets {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.symbols.is_empty()
            && self.tests.is_empty()
            && self.write_scope.is_empty()
    }
}

/// Fixed-shape gate output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub schema_version: String,
    pub task_id: String,
    pub pass: bool,
    pub missing: MissingBuckets,
    pub notes: Vec<String>,
}

impl Verdict {
    pub fn canonical_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn canonical_hash_hex(&self) -> Result<String, serde_json::Error> {
        let bytes = self.canonical_json_bytes()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Persist a verdict as pretty JSON, creating parent directories.
pub fn write_verdict(path: &Path, verdict: &Verdict) -> Result<PathBuf, GateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(verdict)?;
    fs::write(path, bytes)?;
    Ok(path.to_path_buf())
}

#[derive(Debug, Clone)]
pub struct PreflightGate {
    root: PathBuf,
    limits: Limits,
}

impl PreflightGate {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_limits(root, Limits::default())
    }

    pub fn with_limits(root: impl Into<PathBuf>, limits: Limits) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Evaluate a dispatch attempt.
    ///
    /// `task` and `pin` are required; without them there is nothing to judge
    /// and the call fails structurally. A missing `role_policy` is not
    /// structural: it denies every write.
    pub fn evaluate(
        &self,
        task: Option<&TaskDescriptor>,
        pin: Option<&PinSpec>,
        role_policy: Option<&RolePolicy>,
    ) -> Result<Verdict, GateError> {
        let task = task.ok_or_else(|| GateError::MissingInput("task descriptor".to_string()))?;
        let task_id = task.task_id.trim();
        if task_id.is_empty() {
            return Err(GateError::MissingInput("task id".to_string()));
        }
        let pin = pin.ok_or_else(|| GateError::MissingInput("pin specification".to_string()))?;

        let mut missing = MissingBuckets::default();
        let mut notes = Vec::new();

        let in_scope = self.check_files(task, pin, &mut missing.files);
        self.check_tests(task, &mut missing.tests);
        check_symbols(task, pin, &mut missing.symbols);
        check_write_scope(
            &in_scope,
            role_policy,
            &mut missing.write_scope,
            &mut notes,
        );

        let pass = missing.is_empty();
        let dropped_notes = output::cap_list(&mut notes, self.limits.max_notes);
        if dropped_notes > 0 {
            notes.push(format!("notes truncated: {} more", dropped_notes));
        }
        self.cap_buckets(&mut missing, &mut notes);
        info!(
            task_id,
            pass,
            files = missing.files.len(),
            tests = missing.tests.len(),
            symbols = missing.symbols.len(),
            write_scope = missing.write_scope.len(),
            "preflight evaluated"
        );

        Ok(Verdict {
            schema_version: VERDICT_SCHEMA_VERSION.to_string(),
            task_id: task_id.to_string(),
            pass,
            missing,
            notes,
        })
    }

    /// Evaluate against the policy a registry holds for `role`.
    pub fn evaluate_for_role(
        &self,
        task: Option<&TaskDescriptor>,
        pin: Option<&PinSpec>,
        registry: &PolicyRegistry,
        role: &str,
    ) -> Result<Verdict, GateError> {
        let policy = registry.role_policy(role);
        let mut verdict = self.evaluate(task, pin, policy)?;
        if policy.is_none() {
            let note = match registry.normalize_role(role) {
                Some(key) => format!("role '{}' has no valid policy; writes denied", key),
                None => format!("unknown role '{}'; writes denied", role.trim()),
            };
            verdict.notes.push(note);
        }
        Ok(verdict)
    }

    /// Existence + pinned-scope check. Returns the normalized files that passed.
    fn check_files(
        &self,
        task: &TaskDescriptor,
        pin: &PinSpec,
        bucket: &mut Vec<String>,
    ) -> Vec<String> {
        let mut passed = Vec::new();
        for raw in &task.required_files {
            let Some(rel) = paths::normalize(raw) else {
                debug!(file = %raw, "required file rejected by normalize");
                output::push_unique(bucket, raw.trim());
                continue;
            };
            let on_disk = self.root.join(&rel).exists();
            let pinned = paths::is_allowed_by_prefix(&rel, &pin.allowed_paths);
            if on_disk && pinned {
                output::push_unique(&mut passed, rel);
            } else {
                debug!(file = %rel, on_disk, pinned, "required file failed scope check");
                output::push_unique(bucket, rel);
            }
        }
        passed
    }

    fn check_tests(&self, task: &TaskDescriptor, bucket: &mut Vec<String>) {
        for cmd in &task.allowed_tests {
            if let Err(failure) = command::validate_command(&self.root, cmd) {
                debug!(command = %cmd, reason = %failure, "test command not runnable");
                output::push_unique(bucket, format!("{} :: {}", cmd, failure));
            }
        }
    }

    fn cap_buckets(&self, missing: &mut MissingBuckets, notes: &mut Vec<String>) {
        let caps = [
            ("files", &mut missing.files, self.limits.max_files),
            ("symbols", &mut missing.symbols, self.limits.max_symbols),
            ("tests", &mut missing.tests, self.limits.max_tests),
            (
                "write_scope",
                &mut missing.write_scope,
                self.limits.max_write_scope,
            ),
        ];
        for (name, list, cap) in caps {
            let dropped = output::cap_list(list, cap);
            if dropped > 0 {
                notes.push(format!("missing.{} truncated: {} more", name, dropped));
            }
        }
    }
}

fn check_symbols(task: &TaskDescriptor, pin: &PinSpec, bucket: &mut Vec<String>) {
    for symbol in &task.required_symbols {
        if !pin.symbols.contains(symbol) {
            bucket.push(symbol.clone());
        }
    }
}

struct CompiledWriteScope {
    allow_all: bool,
    allow: Vec<GlobMatcher>,
    deny: Vec<GlobMatcher>,
    /// Deny patterns that failed to compile; their presence denies everything.
    broken_deny: Vec<String>,
}

fn compile_write_scope(write: &WritePermissions, notes: &mut Vec<String>) -> CompiledWriteScope {
    let allow_all = write.allow_paths.iter().any(|p| p.trim() == ALLOW_ALL);
    let mut allow = Vec::new();
    let mut deny = Vec::new();
    let mut broken_deny = Vec::new();

    for pattern in &write.allow_paths {
        match paths::glob_to_matcher(pattern) {
            Ok(m) => allow.push(m),
            Err(e) => notes.push(format!("write_scope: ignoring allow pattern: {}", e)),
        }
    }
    for pattern in &write.deny_paths {
        match paths::glob_to_matcher(pattern) {
            Ok(m) => deny.push(m),
            Err(e) => {
                notes.push(format!("write_scope: deny pattern treated as match-all: {}", e));
                broken_deny.push(pattern.clone());
            }
        }
    }
    CompiledWriteScope {
        allow_all,
        allow,
        deny,
        broken_deny,
    }
}

fn check_write_scope(
    files: &[String],
    role_policy: Option<&RolePolicy>,
    bucket: &mut Vec<String>,
    notes: &mut Vec<String>,
) {
    if files.is_empty() {
        return;
    }
    let Some(write) = role_policy.and_then(RolePolicy::write) else {
        notes.push("write_scope: no write permissions declared; all writes denied".to_string());
        bucket.extend(files.iter().cloned());
        return;
    };

    let scope = compile_write_scope(write, notes);
    // One note per denial cause, in first-hit order; files are listed in the bucket.
    let mut causes: Vec<(String, usize)> = Vec::new();
    for file in files {
        let cause = if let Some(pattern) = scope.broken_deny.first() {
            format!("denied by {}", pattern)
        } else if let Some(m) = scope.deny.iter().find(|m| m.is_match(file)) {
            format!("denied by {}", m.pattern())
        } else if scope.allow_all || scope.allow.iter().any(|m| m.is_match(file)) {
            continue;
        } else {
            "not covered by allow_paths".to_string()
        };
        bucket.push(file.clone());
        match causes.iter_mut().find(|(c, _)| *c == cause) {
            Some((_, count)) => *count += 1,
            None => causes.push((cause, 1)),
        }
    }
    for (cause, count) in causes {
        notes.push(format!("write_scope: {} file(s) {}", count, cause));
    }
}
