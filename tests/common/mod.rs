//! Registry and repository fixtures shared by the integration suites.
#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::Path;

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

pub fn write_json(root: &Path, rel: &str, value: &Value) {
    let body = serde_json::to_string_pretty(value).expect("serialize");
    write(root, rel, &body);
}

pub fn role_policy_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["role", "capabilities"],
        "properties": {
            "role": { "type": "string", "minLength": 1 },
            "capabilities": {
                "type": "object",
                "required": ["can_write_code"],
                "properties": { "can_write_code": { "type": "boolean" } }
            },
            "permissions": {
                "type": "object",
                "properties": {
                    "write": {
                        "type": "object",
                        "properties": {
                            "allow_paths": { "type": "array", "items": { "type": "string" } },
                            "deny_paths": { "type": "array", "items": { "type": "string" } }
                        }
                    }
                }
            }
        }
    })
}

pub fn skill_doc(skill_id: &str, owner_role: &str) -> Value {
    json!({
        "schema_version": "scc.skill.v1",
        "skill_id": skill_id,
        "version": "1.0.0",
        "owner_role": owner_role,
        "summary": format!("{} skill", skill_id),
        "applies_to": ["repo"],
        "contracts": {
            "input_schema": "contracts/skills/input.schema.json",
            "output_schema": "contracts/skills/output.schema.json"
        },
        "enablement": { "status": "enabled" }
    })
}

/// A clean registry: three roles, three skills, a complete matrix.
///
/// - `implementer` (aliases `impl`, `coder`) writes `src/**` and `tests/**`
///   except `src/generated/**`
/// - `reviewer` cannot write code and has no write block
/// - `release-manager` writes everything except `secrets/**`
pub fn seed_registry(root: &Path) {
    write_json(root, "contracts/roles/role_policy.schema.json", &role_policy_schema());
    write_json(
        root,
        "roles/registry.json",
        &json!({
            "roles": [
                { "role": "implementer", "policy": "roles/policies/implementer.json", "aliases": ["impl", "Coder"] },
                { "role": "reviewer", "policy": "roles/policies/reviewer.json" },
                { "role": "release-manager", "policy": "roles/policies/release_manager.json" }
            ]
        }),
    );
    write_json(
        root,
        "roles/policies/implementer.json",
        &json!({
            "role": "implementer",
            "capabilities": { "can_write_code": true },
            "permissions": {
                "write": {
                    "allow_paths": ["src/**", "tests/**"],
                    "deny_paths": ["src/generated/**"]
                }
            }
        }),
    );
    write_json(
        root,
        "roles/policies/reviewer.json",
        &json!({
            "role": "reviewer",
            "capabilities": { "can_write_code": false },
            "permissions": {}
        }),
    );
    write_json(
        root,
        "roles/policies/release_manager.json",
        &json!({
            "role": "release-manager",
            "capabilities": { "can_write_code": true },
            "permissions": {
                "write": { "allow_paths": ["**"], "deny_paths": ["secrets/**"] }
            }
        }),
    );
    write_json(
        root,
        "skills/registry.json",
        &json!({
            "skills": [
                { "skill_id": "code.edit", "path": "skills/code_edit.json" },
                { "skill_id": "code.review", "path": "skills/code_review.json" },
                { "skill_id": "release.cut", "path": "skills/release_cut.json" }
            ]
        }),
    );
    write_json(root, "skills/code_edit.json", &skill_doc("code.edit", "implementer"));
    write_json(root, "skills/code_review.json", &skill_doc("code.review", "reviewer"));
    write_json(root, "skills/release_cut.json", &skill_doc("release.cut", "release-manager"));
    write_json(
        root,
        "roles/role_skill_matrix.json",
        &json!({
            "roles": {
                "implementer": ["code.edit", "code.review"],
                "reviewer": ["code.review"],
                "release-manager": ["release.cut", "code.review"]
            }
        }),
    );
}
