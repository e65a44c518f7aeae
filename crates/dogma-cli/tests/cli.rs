use std::fs;
use std::path::Path;

use assert_cmd::Command;
use dogma_test_support::USERS_CONTRACT;
use predicates::prelude::*;
use tempfile::TempDir;

fn setup_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(&path, contents).expect("write file");
}

fn dogma(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dogma").expect("binary");
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn tree_prints_nested_sections() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "api.md", USERS_CONTRACT);

    let output = dogma(temp.path())
        .args(["tree", "api.md"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("stdout utf8");
    assert!(stdout.starts_with("# Users service\n# API\n  ## users/{id}\n    ### Params\n"));
    assert!(stdout.contains("\n    ### Notes\n# Types\n  ## User\n"));
}

#[test]
fn tree_drops_skipped_levels() {
    let temp = TempDir::new().expect("tempdir");

    dogma(temp.path())
        .args(["tree", "-"])
        .write_stdin("# A\n### orphan\n## B\n")
        .assert()
        .success()
        .stdout("# A\n  ## B\n");
}

#[test]
fn extract_plain_lists_endpoints_and_types() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "api.md", USERS_CONTRACT);

    dogma(temp.path())
        .args(["extract", "api.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  GET /users/{id}\n    params: id: string\n"))
        .stdout(predicate::str::contains("    body: name: string, email?: string\n"))
        .stdout(predicate::str::contains("    result: <json block>\n"))
        .stdout(predicate::str::contains("  Role: <ts block>\n"))
        .stdout(predicate::str::contains("  Token: <text>\n"));
}

#[test]
fn extract_json_reads_stdin() {
    let temp = TempDir::new().expect("tempdir");

    let output = dogma(temp.path())
        .args(["extract", "-", "--format", "json"])
        .write_stdin(USERS_CONTRACT)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(json["endpoints"][1]["name"], "users");
    assert_eq!(json["endpoints"][1]["method"], "POST");
    assert_eq!(json["types"]["User"]["definition"]["kind"], "fields");
    assert_eq!(json["front_matter"]["version"], "2");
}

#[test]
fn registry_emits_descriptors() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "api.md", USERS_CONTRACT);

    let output = dogma(temp.path())
        .args(["registry", "api.md"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(
        json,
        serde_json::json!([
            { "name": "users/{id}", "method": "GET" },
            { "name": "users", "method": "POST" }
        ])
    );
}

#[test]
fn extraction_errors_exit_with_failure() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "broken.md", "# API\n\n## ping\n\nNo verb.\n");

    dogma(temp.path())
        .args(["extract", "broken.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "dogma error: broken.md: line 3: endpoint 'ping' has no `Method:` line",
        ));
}

#[test]
fn local_config_changes_headings_and_duplicate_policy() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        ".dogma.toml",
        "[extract]\napi_heading = \"^endpoints$\"\nduplicates = \"last-wins\"\n",
    );
    setup_file(
        temp.path(),
        "api.md",
        "# Endpoints\n\n## ping\n\nMethod: GET\n\n## ping\n\nMethod: GET\n\n\
         ### Result\n\n| Name | Type |\n| --- | --- |\n| pong | bool |\n",
    );

    dogma(temp.path())
        .args(["extract", "api.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    result: pong: bool\n"))
        .stderr(predicate::str::contains(
            "warning: api.md:7: endpoint 'ping' (GET) is already defined at line 3",
        ));
}

#[test]
fn missing_override_config_is_an_error() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "api.md", USERS_CONTRACT);

    dogma(temp.path())
        .args(["extract", "api.md", "--config", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("override config"));
}
