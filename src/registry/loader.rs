//! Policy registry loader.
//!
//! Reads the four index documents plus every referenced role policy and skill
//! document, cross-validates them, and builds a [`PolicyRegistry`]. A bad
//! document records a [`RegistryIssue`] and loading carries on with the rest.
//! Strict loads turn any issue into [`GateError::RegistryInvalid`].

use crate::core::error::GateError;
use crate::core::{output, paths};
use crate::registry::model::{
    IssueCode, PolicyRegistry, RegistryIssue, RoleEntry, RolePolicy, RoleRegistryDoc,
    RoleSkillMatrixDoc, SKILL_REQUIRED_FIELDS, SKILL_SCHEMA_VERSION, Skill, SkillRegistryDoc,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

pub const ROLE_REGISTRY_REL_PATH: &str = "roles/registry.json";
pub const ROLE_SKILL_MATRIX_REL_PATH: &str = "roles/role_skill_matrix.json";
pub const ROLE_POLICY_SCHEMA_REL_PATH: &str = "contracts/roles/role_policy.schema.json";
pub const SKILL_REGISTRY_REL_PATH: &str = "skills/registry.json";

/// Modification time and length of a source file, or `None` when it was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    path: PathBuf,
    state: Option<(SystemTime, u64)>,
}

impl FileStamp {
    pub(crate) fn capture(path: &Path) -> Self {
        let state = fs::metadata(path)
            .ok()
            .and_then(|m| m.modified().ok().map(|t| (t, m.len())));
        Self {
            path: path.to_path_buf(),
            state,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.state.map(|(t, _)| t)
    }
}

/// Outcome of a load. `ok` is true iff `issues` is empty.
#[derive(Debug, Clone)]
pub struct RegistryLoad {
    pub ok: bool,
    pub registry: PolicyRegistry,
    pub issues: Vec<RegistryIssue>,
    /// Every file the load read or tried to read, stamped just before the read.
    pub stamps: Vec<FileStamp>,
}

struct LoadContext<'a> {
    root: &'a Path,
    issues: Vec<RegistryIssue>,
    stamps: BTreeMap<PathBuf, FileStamp>,
}

impl LoadContext<'_> {
    fn issue(&mut self, code: IssueCode, path: &str, message: impl Into<String>) {
        let issue = RegistryIssue::new(code, path, message);
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
        self.issues.push(issue);
    }

    /// Read and parse a JSON document, recording `missing_file` / `invalid_json`.
    fn read_json(&mut self, rel: &str) -> Option<Value> {
        let full = self.root.join(rel);
        // Stamp before the read; a racing write then leaves the stamp stale.
        self.stamps
            .entry(full.clone())
            .or_insert_with(|| FileStamp::capture(&full));
        let raw = match fs::read_to_string(&full) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.issue(IssueCode::MissingFile, rel, "file not found");
                return None;
            }
            Err(e) => {
                self.issue(IssueCode::MissingFile, rel, format!("unreadable: {}", e));
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => {
                debug!(path = rel, "registry document read");
                Some(v)
            }
            Err(e) => {
                self.issue(IssueCode::InvalidJson, rel, e.to_string());
                None
            }
        }
    }

    fn typed<T: DeserializeOwned>(&mut self, rel: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(t) => Some(t),
            Err(e) => {
                self.issue(IssueCode::InvalidShape, rel, e.to_string());
                None
            }
        }
    }

    /// Normalize a document path referenced from an index, recording `invalid_path`.
    fn doc_path(&mut self, index_rel: &str, raw: &str) -> Option<String> {
        let normalized = paths::normalize(raw);
        if normalized.is_none() {
            self.issue(
                IssueCode::InvalidPath,
                index_rel,
                format!("unsafe document path '{}'", raw),
            );
        }
        normalized
    }
}

/// Load and cross-validate the registry under `root`.
pub fn load(root: &Path, strict: bool) -> Result<RegistryLoad, GateError> {
    let mut ctx = LoadContext {
        root,
        issues: Vec::new(),
        stamps: BTreeMap::new(),
    };

    let schema = load_policy_schema(&mut ctx);
    let roles = load_roles(&mut ctx, schema.as_ref());
    let skills = load_skills(&mut ctx, &roles);
    let matrix = load_matrix(&mut ctx, &roles, &skills);

    let registry = PolicyRegistry {
        roles,
        skills,
        matrix,
    };
    let issues = ctx.issues;
    info!(
        root = %root.display(),
        roles = registry.roles.len(),
        skills = registry.skills.len(),
        issues = issues.len(),
        "policy registry loaded"
    );

    if strict && !issues.is_empty() {
        return Err(GateError::RegistryInvalid { issues });
    }
    Ok(RegistryLoad {
        ok: issues.is_empty(),
        registry,
        issues,
        stamps: ctx.stamps.into_values().collect(),
    })
}

fn load_policy_schema(ctx: &mut LoadContext<'_>) -> Option<jsonschema::Validator> {
    let schema = ctx.read_json(ROLE_POLICY_SCHEMA_REL_PATH)?;
    match jsonschema::validator_for(&schema) {
        Ok(validator) => Some(validator),
        Err(e) => {
            ctx.issue(
                IssueCode::SchemaCompileFailed,
                ROLE_POLICY_SCHEMA_REL_PATH,
                e.to_string(),
            );
            None
        }
    }
}

fn load_roles(
    ctx: &mut LoadContext<'_>,
    schema: Option<&jsonschema::Validator>,
) -> BTreeMap<String, RoleEntry> {
    let mut roles = BTreeMap::new();
    let Some(doc) = ctx.read_json(ROLE_REGISTRY_REL_PATH) else {
        return roles;
    };
    let Some(doc) = ctx.typed::<RoleRegistryDoc>(ROLE_REGISTRY_REL_PATH, doc) else {
        return roles;
    };

    for entry in doc.roles {
        let key = entry.role.trim().to_string();
        if key.is_empty() {
            ctx.issue(
                IssueCode::InvalidShape,
                ROLE_REGISTRY_REL_PATH,
                "role entry with empty name",
            );
            continue;
        }
        if roles.contains_key(&key) {
            ctx.issue(
                IssueCode::DuplicateRole,
                ROLE_REGISTRY_REL_PATH,
                format!("role '{}' registered more than once", key),
            );
            continue;
        }
        let policy_path = ctx.doc_path(ROLE_REGISTRY_REL_PATH, &entry.policy);
        let policy = match policy_path.as_deref() {
            Some(rel) => load_role_policy(ctx, &key, rel, schema),
            None => None,
        };
        roles.insert(
            key.clone(),
            RoleEntry {
                role: key,
                policy_path: policy_path.unwrap_or_default(),
                aliases: entry.aliases,
                policy,
            },
        );
    }
    roles
}

fn load_role_policy(
    ctx: &mut LoadContext<'_>,
    role: &str,
    rel: &str,
    schema: Option<&jsonschema::Validator>,
) -> Option<RolePolicy> {
    let value = ctx.read_json(rel)?;

    if let Some(validator) = schema {
        let violations = validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect::<Vec<_>>();
        if !violations.is_empty() {
            ctx.issue(
                IssueCode::SchemaViolation,
                rel,
                output::summarize(&violations, 5, 200),
            );
            return None;
        }
    }

    let policy = ctx.typed::<RolePolicy>(rel, value)?;
    if let Some(declared) = policy.role.as_deref() {
        if declared.trim() != role {
            ctx.issue(
                IssueCode::RoleMismatch,
                rel,
                format!("policy declares role '{}' but is registered as '{}'", declared, role),
            );
            return None;
        }
    }
    Some(policy)
}

fn load_skills(
    ctx: &mut LoadContext<'_>,
    roles: &BTreeMap<String, RoleEntry>,
) -> BTreeMap<String, Skill> {
    let mut skills = BTreeMap::new();
    let Some(doc) = ctx.read_json(SKILL_REGISTRY_REL_PATH) else {
        return skills;
    };
    let Some(doc) = ctx.typed::<SkillRegistryDoc>(SKILL_REGISTRY_REL_PATH, doc) else {
        return skills;
    };

    for entry in doc.skills {
        let skill_id = entry.skill_id.trim().to_string();
        if skill_id.is_empty() {
            ctx.issue(
                IssueCode::InvalidShape,
                SKILL_REGISTRY_REL_PATH,
                "skill entry with empty skill_id",
            );
            continue;
        }
        if skills.contains_key(&skill_id) {
            ctx.issue(
                IssueCode::DuplicateSkill,
                SKILL_REGISTRY_REL_PATH,
                format!("skill '{}' registered more than once", skill_id),
            );
            continue;
        }
        let Some(rel) = ctx.doc_path(SKILL_REGISTRY_REL_PATH, &entry.path) else {
            continue;
        };
        let Some(skill) = load_skill(ctx, &skill_id, &rel) else {
            continue;
        };
        if !roles.contains_key(&skill.owner_role) {
            ctx.issue(
                IssueCode::UnknownOwnerRole,
                &rel,
                format!("owner_role '{}' is not a registered role", skill.owner_role),
            );
        }
        skills.insert(skill_id, skill);
    }
    skills
}

fn load_skill(ctx: &mut LoadContext<'_>, skill_id: &str, rel: &str) -> Option<Skill> {
    let value = ctx.read_json(rel)?;

    let Some(obj) = value.as_object() else {
        ctx.issue(IssueCode::InvalidShape, rel, "skill document must be an object");
        return None;
    };
    let missing = SKILL_REQUIRED_FIELDS
        .iter()
        .filter(|f| !obj.contains_key(**f))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        ctx.issue(
            IssueCode::InvalidShape,
            rel,
            format!("missing required fields: {}", missing.join(", ")),
        );
        return None;
    }

    let skill = ctx.typed::<Skill>(rel, value)?;
    if skill.schema_version != SKILL_SCHEMA_VERSION {
        ctx.issue(
            IssueCode::SchemaVersionMismatch,
            rel,
            format!(
                "actual={} expected={}",
                skill.schema_version, SKILL_SCHEMA_VERSION
            ),
        );
        return None;
    }
    if skill.skill_id != skill_id {
        ctx.issue(
            IssueCode::SkillIdMismatch,
            rel,
            format!(
                "document declares '{}' but is registered as '{}'",
                skill.skill_id, skill_id
            ),
        );
        return None;
    }
    if skill.contracts.input_schema.trim().is_empty()
        || skill.contracts.output_schema.trim().is_empty()
    {
        ctx.issue(
            IssueCode::EmptyContractSchema,
            rel,
            "contracts.input_schema and contracts.output_schema must be non-empty",
        );
        return None;
    }
    Some(skill)
}

fn load_matrix(
    ctx: &mut LoadContext<'_>,
    roles: &BTreeMap<String, RoleEntry>,
    skills: &BTreeMap<String, Skill>,
) -> BTreeMap<String, Vec<String>> {
    let mut matrix = BTreeMap::new();
    let Some(doc) = ctx.read_json(ROLE_SKILL_MATRIX_REL_PATH) else {
        return matrix;
    };
    let Some(doc) = ctx.typed::<RoleSkillMatrixDoc>(ROLE_SKILL_MATRIX_REL_PATH, doc) else {
        return matrix;
    };

    for (role, skill_ids) in doc.roles {
        if !roles.contains_key(&role) {
            ctx.issue(
                IssueCode::MatrixUnknownRole,
                ROLE_SKILL_MATRIX_REL_PATH,
                format!("matrix lists unregistered role '{}'", role),
            );
            continue;
        }
        let mut allowed = Vec::new();
        for skill_id in skill_ids {
            if !skills.contains_key(&skill_id) {
                ctx.issue(
                    IssueCode::UnknownSkill,
                    ROLE_SKILL_MATRIX_REL_PATH,
                    format!("role '{}' references unknown skill '{}'", role, skill_id),
                );
                continue;
            }
            output::push_unique(&mut allowed, skill_id);
        }
        matrix.insert(role, allowed);
    }

    for role in roles.keys() {
        if !matrix.contains_key(role) {
            ctx.issue(
                IssueCode::MatrixMissingRole,
                ROLE_SKILL_MATRIX_REL_PATH,
                format!("registered role '{}' has no matrix entry", role),
            );
        }
    }
    matrix
}
