use scc_preflight::core::command::{
    CommandAcceptance, CommandFailure, DefaultAllowReason, ToolFamily, validate_command,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

fn verified(tool: ToolFamily) -> Result<CommandAcceptance, CommandFailure> {
    Ok(CommandAcceptance::Verified { tool })
}

fn default_allow(
    tool: ToolFamily,
    reason: DefaultAllowReason,
) -> Result<CommandAcceptance, CommandFailure> {
    Ok(CommandAcceptance::DefaultAllow { tool, reason })
}

#[test]
fn empty_command_fails() {
    let tmp = TempDir::new().expect("tmpdir");
    assert_eq!(validate_command(tmp.path(), "   "), Err(CommandFailure::EmptyCommand));
}

#[test]
fn npm_script_must_exist_in_package_json() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    let missing = validate_command(root, "npm test").expect_err("no package.json");
    assert_eq!(missing.to_string(), "missing_file:package.json");

    write(root, "package.json", r#"{"scripts":{"test":"jest","lint":"eslint ."}}"#);
    assert_eq!(validate_command(root, "npm test"), verified(ToolFamily::PackageManager));
    assert_eq!(validate_command(root, "pnpm run lint"), verified(ToolFamily::PackageManager));
    assert_eq!(
        validate_command(root, "yarn run build"),
        Err(CommandFailure::MissingNpmScript {
            dir: ".".to_string(),
            script: "build".to_string(),
        })
    );
    assert_eq!(
        validate_command(root, "npm install"),
        default_allow(ToolFamily::PackageManager, DefaultAllowReason::UnmodeledSubcommand)
    );
}

#[test]
fn npm_without_test_script_reports_missing_script() {
    let tmp = TempDir::new().expect("tmpdir");
    write(tmp.path(), "package.json", r#"{"scripts":{"build":"tsc"}}"#);
    let failure = validate_command(tmp.path(), "npm test").expect_err("no test script");
    assert_eq!(failure.to_string(), "missing_npm_script:.:test");
}

#[test]
fn npm_prefix_selects_the_package_directory() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    assert_eq!(
        validate_command(root, "npm --prefix web test"),
        Err(CommandFailure::MissingDir("web".to_string()))
    );

    fs::create_dir_all(root.join("web")).expect("mkdir");
    assert_eq!(
        validate_command(root, "npm --prefix=web test"),
        Err(CommandFailure::MissingFile("web/package.json".to_string()))
    );

    write(root, "web/package.json", r#"{"scripts":{"test":"vitest"}}"#);
    assert_eq!(
        validate_command(root, "npm --prefix ./web test"),
        verified(ToolFamily::PackageManager)
    );
    assert_eq!(
        validate_command(root, "pnpm -C web run e2e"),
        Err(CommandFailure::MissingNpmScript {
            dir: "web".to_string(),
            script: "e2e".to_string(),
        })
    );
    assert_eq!(
        validate_command(root, "npm --prefix ../outside test"),
        Err(CommandFailure::InvalidPath("../outside".to_string()))
    );
}

#[test]
fn dangling_prefix_flag_fails_closed() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();
    write(root, "package.json", r#"{"scripts":{"test":"jest"}}"#);

    for command in ["npm test --prefix", "pnpm test -C", "npm --prefix= test"] {
        assert_eq!(
            validate_command(root, command),
            Err(CommandFailure::InvalidPath(String::new())),
            "{command}"
        );
    }
}

#[test]
fn unparsable_package_json_is_invalid_json() {
    let tmp = TempDir::new().expect("tmpdir");
    write(tmp.path(), "package.json", "{ not json");
    assert_eq!(
        validate_command(tmp.path(), "npm test"),
        Err(CommandFailure::InvalidJson("package.json".to_string()))
    );
}

#[test]
fn interpreters_check_script_files_and_allow_bare_modules() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    assert_eq!(
        validate_command(root, "python scripts/check.py"),
        Err(CommandFailure::MissingFile("scripts/check.py".to_string()))
    );
    write(root, "scripts/check.py", "print('ok')\n");
    assert_eq!(validate_command(root, "python3 scripts/check.py"), verified(ToolFamily::Interpreter));

    assert_eq!(
        validate_command(root, "python -m http.server"),
        default_allow(ToolFamily::Interpreter, DefaultAllowReason::BareModule)
    );
    assert_eq!(
        validate_command(root, "node --version"),
        default_allow(ToolFamily::Interpreter, DefaultAllowReason::BareModule)
    );
}

#[test]
fn python_dash_m_pytest_uses_pytest_rules() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    assert_eq!(
        validate_command(root, "python -m pytest"),
        Err(CommandFailure::PytestConfigMissing)
    );
    write(root, "pytest.ini", "[pytest]\n");
    assert_eq!(validate_command(root, "python -m pytest -q"), verified(ToolFamily::Pytest));
}

#[test]
fn pytest_needs_config_or_tests_dir_and_existing_targets() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    assert_eq!(validate_command(root, "pytest"), Err(CommandFailure::PytestConfigMissing));

    write(root, "tests/test_api.py", "def test_ok():\n    pass\n");
    assert_eq!(validate_command(root, "pytest"), verified(ToolFamily::Pytest));
    assert_eq!(
        validate_command(root, "pytest tests/test_api.py::test_ok -k 'slow or fast'"),
        verified(ToolFamily::Pytest)
    );
    assert_eq!(
        validate_command(root, "pytest tests/test_missing.py"),
        Err(CommandFailure::MissingPath("tests/test_missing.py".to_string()))
    );
}

#[test]
fn go_and_cargo_need_their_manifests() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    assert_eq!(
        validate_command(root, "go test ./..."),
        Err(CommandFailure::MissingFile("go.mod".to_string()))
    );
    assert_eq!(
        validate_command(root, "cargo test --all"),
        Err(CommandFailure::MissingFile("Cargo.toml".to_string()))
    );

    write(root, "go.mod", "module example.com/x\n");
    write(root, "Cargo.toml", "[package]\nname = \"x\"\n");
    assert_eq!(validate_command(root, "go test ./..."), verified(ToolFamily::GoTest));
    assert_eq!(validate_command(root, "cargo test"), verified(ToolFamily::Cargo));
    assert_eq!(
        validate_command(root, "go vet"),
        default_allow(ToolFamily::GoTest, DefaultAllowReason::UnmodeledSubcommand)
    );
}

#[test]
fn unknown_tools_default_allow_unless_a_path_is_missing() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    let allowed = validate_command(root, "make check").expect("default allow");
    assert_eq!(allowed.tool(), ToolFamily::Unknown);
    assert_eq!(
        allowed,
        CommandAcceptance::DefaultAllow {
            tool: ToolFamily::Unknown,
            reason: DefaultAllowReason::UnknownTool,
        }
    );

    assert_eq!(
        validate_command(root, "bash ci/run.sh"),
        Err(CommandFailure::MissingPath("ci/run.sh".to_string()))
    );
    write(root, "ci/run.sh", "#!/bin/sh\n");
    assert_eq!(
        validate_command(root, "bash ci/run.sh"),
        default_allow(ToolFamily::Unknown, DefaultAllowReason::UnknownTool)
    );
}
