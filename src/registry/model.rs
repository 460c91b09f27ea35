//! Typed records for the policy & authorization registry.
//!
//! JSON documents are validated once in the loader and land here as
//! strongly typed values. Nothing downstream re-inspects raw JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fixed `schema_version` literal every skill document must carry.
pub const SKILL_SCHEMA_VERSION: &str = "scc.skill.v1";

// ============================================================================
// ROLE POLICY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    /// Self-declared role. When present it must equal the registry key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub can_write_code: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// `None` when the document has no write block at all. Treated as deny-all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<WritePermissions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePermissions {
    #[serde(default)]
    pub allow_paths: Vec<String>,
    #[serde(default)]
    pub deny_paths: Vec<String>,
}

impl RolePolicy {
    pub fn write(&self) -> Option<&WritePermissions> {
        self.permissions.write.as_ref()
    }
}

// ============================================================================
// SKILLS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub schema_version: String,
    pub skill_id: String,
    pub version: String,
    pub owner_role: String,
    pub summary: String,
    pub applies_to: Vec<String>,
    pub contracts: SkillContracts,
    pub enablement: SkillEnablement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillContracts {
    pub input_schema: String,
    pub output_schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEnablement {
    pub status: EnablementStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnablementStatus {
    Enabled,
    Disabled,
    Experimental,
}

/// Top-level keys a skill document must carry before typed parsing.
pub const SKILL_REQUIRED_FIELDS: &[&str] = &[
    "schema_version",
    "skill_id",
    "version",
    "owner_role",
    "summary",
    "applies_to",
    "contracts",
    "enablement",
];

// ============================================================================
// INDEX DOCUMENTS
// ============================================================================

/// `roles/registry.json`
#[derive(Debug, Clone, Deserialize)]
pub struct RoleRegistryDoc {
    pub roles: Vec<RoleRegistryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRegistryEntry {
    pub role: String,
    pub policy: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// `roles/role_skill_matrix.json`
#[derive(Debug, Clone, Deserialize)]
pub struct RoleSkillMatrixDoc {
    pub roles: BTreeMap<String, Vec<String>>,
}

/// `skills/registry.json`
#[derive(Debug, Clone, Deserialize)]
pub struct SkillRegistryDoc {
    pub skills: Vec<SkillRegistryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillRegistryEntry {
    pub skill_id: String,
    pub path: String,
}

// ============================================================================
// LOADED MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEntry {
    pub role: String,
    pub policy_path: String,
    pub aliases: Vec<String>,
    /// Only `Some` when the policy document loaded, validated and matched its key.
    pub policy: Option<RolePolicy>,
}

/// Cross-validated registry. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRegistry {
    pub(crate) roles: BTreeMap<String, RoleEntry>,
    pub(crate) skills: BTreeMap<String, Skill>,
    pub(crate) matrix: BTreeMap<String, Vec<String>>,
}

impl PolicyRegistry {
    pub fn roles(&self) -> impl Iterator<Item = &RoleEntry> {
        self.roles.values()
    }

    pub fn role_names(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    /// Matrix row for an exact role key.
    pub fn matrix_entry(&self, role: &str) -> Option<&[String]> {
        self.matrix.get(role).map(Vec::as_slice)
    }
}

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingFile,
    InvalidJson,
    InvalidShape,
    InvalidPath,
    SchemaCompileFailed,
    SchemaViolation,
    RoleMismatch,
    SkillIdMismatch,
    SchemaVersionMismatch,
    EmptyContractSchema,
    DuplicateRole,
    DuplicateSkill,
    UnknownSkill,
    MatrixMissingRole,
    MatrixUnknownRole,
    UnknownOwnerRole,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFile => "missing_file",
            Self::InvalidJson => "invalid_json",
            Self::InvalidShape => "invalid_shape",
            Self::InvalidPath => "invalid_path",
            Self::SchemaCompileFailed => "schema_compile_failed",
            Self::SchemaViolation => "schema_violation",
            Self::RoleMismatch => "role_mismatch",
            Self::SkillIdMismatch => "skill_id_mismatch",
            Self::SchemaVersionMismatch => "schema_version_mismatch",
            Self::EmptyContractSchema => "empty_contract_schema",
            Self::DuplicateRole => "duplicate_role",
            Self::DuplicateSkill => "duplicate_skill",
            Self::UnknownSkill => "unknown_skill",
            Self::MatrixMissingRole => "matrix_missing_role",
            Self::MatrixUnknownRole => "matrix_unknown_role",
            Self::UnknownOwnerRole => "unknown_owner_role",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured load problem. `path` is the repo-relative document it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryIssue {
    pub code: IssueCode,
    pub path: String,
    pub message: String,
}

impl RegistryIssue {
    pub fn new(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_write_block_stays_none() {
        let policy: RolePolicy = serde_json::from_value(json!({
            "role": "reviewer",
            "capabilities": { "can_write_code": false },
            "permissions": {}
        }))
        .expect("parse");
        assert!(policy.write().is_none());

        let empty: RolePolicy = serde_json::from_value(json!({
            "permissions": { "write": {} }
        }))
        .expect("parse");
        let write = empty.write().expect("write block present");
        assert!(write.allow_paths.is_empty());
    }

    #[test]
    fn issue_codes_serialize_snake_case() {
        let issue = RegistryIssue::new(IssueCode::UnknownSkill, "roles/role_skill_matrix.json", "x");
        let v = serde_json::to_value(&issue).expect("serialize");
        assert_eq!(v["code"], "unknown_skill");
        assert_eq!(issue.to_string(), "unknown_skill roles/role_skill_matrix.json: x");
    }
}
