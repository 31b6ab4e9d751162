//! Command-line behaviour that needs no model service.

use assert_cmd::Command;
use predicates::prelude::*;

fn multidoc() -> Command {
    let mut cmd = Command::cargo_bin("multidoc").unwrap_or_else(|_| unreachable!());
    cmd.env_remove("MULTIDOC_DOCUMENTS").env_remove("RUST_LOG");
    cmd
}

#[test]
fn documents_lists_reference_registry() {
    multidoc()
        .arg("documents")
        .assert()
        .success()
        .stdout(predicate::str::contains("insurance: The Insurance Act, 1938"))
        .stdout(predicate::str::contains("ttohoata: "))
        .stdout(predicate::str::contains("cpa: "));
}

#[test]
fn documents_check_flags_missing_indexes() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let config = dir.path().join("documents.toml");
    std::fs::write(
        &config,
        "[[documents]]\nid = \"tesia\"\nname = \"The Employees State Insurance Act, 1948\"\n\
         description = \"Employee sickness and maternity benefits.\"\nindex_path = \"nowhere\"\n",
    )
    .unwrap_or_else(|_| unreachable!());

    multidoc()
        .arg("--config")
        .arg(&config)
        .args(["documents", "--check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[missing] tesia"))
        .stdout(predicate::str::contains("0/1 indexes loaded"));
}

#[test]
fn documents_as_json() {
    let output = multidoc()
        .args(["--format", "json", "documents"])
        .output()
        .unwrap_or_else(|_| unreachable!());
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap_or_default();
    let ids: Vec<&str> = json
        .as_array()
        .map(|docs| docs.iter().filter_map(|d| d["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["insurance", "cpa", "tesia", "iradaoi", "ttohoata"]);
}

#[test]
fn invalid_registry_is_reported() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let config = dir.path().join("documents.toml");
    let entry = "[[documents]]\nid = \"cpa\"\nname = \"CPA\"\ndescription = \"\"\nindex_path = \"cpa\"\n";
    std::fs::write(&config, entry.repeat(2)).unwrap_or_else(|_| unreachable!());

    multidoc()
        .arg("--config")
        .arg(&config)
        .arg("documents")
        .assert()
        .failure()
        .stderr(predicate::str::contains("declared twice"));
}

#[test]
fn empty_registry_lists_nothing() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let config = dir.path().join("documents.toml");
    std::fs::write(&config, "documents = []\n").unwrap_or_else(|_| unreachable!());

    multidoc()
        .arg("--config")
        .arg(&config)
        .arg("documents")
        .assert()
        .success()
        .stdout("No documents declared.\n");
}

#[test]
fn init_prompts_writes_templates() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());

    multidoc()
        .arg("init-prompts")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 9 prompt template(s)"));
    assert!(dir.path().join("react_system.md").exists());

    multidoc()
        .arg("init-prompts")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn ask_without_api_key_fails() {
    multidoc()
        .env_remove("OPENAI_API_KEY")
        .env_remove("MULTIDOC_API_KEY")
        .args(["ask", "Who may donate an organ?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn ask_requires_a_question() {
    multidoc().arg("ask").assert().failure();
}
