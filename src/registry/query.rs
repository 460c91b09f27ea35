//! Read-only authorization queries over a loaded [`PolicyRegistry`].

use crate::core::output;
use crate::registry::model::{PolicyRegistry, RolePolicy, Skill};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_SKILL_CAP: usize = 32;

/// Why a requested skill set was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AuthorizationDenial {
    RoleNotInMatrix { role: String },
    SkillNotAllowed { role: String, unknown: Vec<String> },
}

impl AuthorizationDenial {
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoleNotInMatrix { .. } => "role_not_in_matrix",
            Self::SkillNotAllowed { .. } => "skill_not_allowed",
        }
    }
}

impl fmt::Display for AuthorizationDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleNotInMatrix { role } => write!(f, "{}:{}", self.code(), role),
            Self::SkillNotAllowed { role, unknown } => {
                write!(f, "{}:{}:{}", self.code(), role, unknown.join(","))
            }
        }
    }
}

impl PolicyRegistry {
    /// Map a free-form role string onto a registered role key.
    ///
    /// Tries, in order: the trimmed input, its lowercase form, hyphen and
    /// underscore spellings of word separators, then declared aliases.
    pub fn normalize_role(&self, raw: &str) -> Option<&str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_lowercase();
        let words = lower
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();
        let candidates = [
            trimmed.to_string(),
            lower.clone(),
            words.join("-"),
            words.join("_"),
        ];
        for candidate in &candidates {
            if let Some((key, _)) = self.roles.get_key_value(candidate.as_str()) {
                return Some(key.as_str());
            }
        }
        self.roles
            .values()
            .find(|entry| {
                entry
                    .aliases
                    .iter()
                    .any(|alias| alias.trim().to_lowercase() == lower)
            })
            .map(|entry| entry.role.as_str())
    }

    /// Allowed skills for a role in matrix order, capped at [`DEFAULT_SKILL_CAP`].
    pub fn default_skills(&self, role: &str) -> Vec<&str> {
        self.default_skills_capped(role, DEFAULT_SKILL_CAP)
    }

    pub fn default_skills_capped(&self, role: &str, cap: usize) -> Vec<&str> {
        let Some(key) = self.normalize_role(role) else {
            return Vec::new();
        };
        self.matrix_entry(key)
            .unwrap_or_default()
            .iter()
            .take(cap)
            .map(String::as_str)
            .collect()
    }

    /// Policy of a role, only when it loaded cleanly.
    pub fn role_policy(&self, role: &str) -> Option<&RolePolicy> {
        let key = self.normalize_role(role)?;
        self.roles.get(key)?.policy.as_ref()
    }

    /// False for unknown roles and roles without a valid policy.
    pub fn can_write_code(&self, role: &str) -> bool {
        self.role_policy(role)
            .is_some_and(|p| p.capabilities.can_write_code)
    }

    pub fn skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.get(skill_id.trim())
    }

    /// Check that every requested skill is in the role's matrix row.
    pub fn validate_skill_set<S: AsRef<str>>(
        &self,
        role: &str,
        requested: &[S],
    ) -> Result<(), AuthorizationDenial> {
        let key = self.normalize_role(role);
        let allowed = key.and_then(|k| self.matrix_entry(k));
        let (Some(key), Some(allowed)) = (key, allowed) else {
            return Err(AuthorizationDenial::RoleNotInMatrix {
                role: role.trim().to_string(),
            });
        };

        let mut unknown: Vec<String> = Vec::new();
        for skill in requested {
            let skill = skill.as_ref().trim();
            if !allowed.iter().any(|a| a == skill) {
                output::push_unique(&mut unknown, skill);
            }
        }
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AuthorizationDenial::SkillNotAllowed {
                role: key.to_string(),
                unknown,
            })
        }
    }
}
