//! Binary-level tests for the `kb` CLI exit-code contract.
//!
//! These run the built binary directly and avoid anything that would reach
//! the network: misconfiguration, a missing store, and an ingest run over
//! an empty notes directory (no documents means no embedding calls).

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn kb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("kb");
    path
}

fn run_kb(envs: &[(&str, &str)], cwd: &TempDir, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(kb_binary())
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .envs(envs.iter().copied())
        .current_dir(cwd.path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run kb binary: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_ingest_fails_without_configuration() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_kb(&[], &tmp, &["ingest"]);
    assert!(!success, "ingest must fail with no configuration");
    assert!(stderr.contains("OPENAI_API_KEY"), "stderr: {}", stderr);
}

#[test]
fn test_chat_fails_without_prior_ingest() {
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("notes");
    let store = tmp.path().join("vectors");
    std::fs::create_dir_all(&notes).unwrap();

    let envs = [
        ("OPENAI_API_KEY", "sk-test"),
        ("LOCAL_FILES_DIR", notes.to_str().unwrap()),
        ("VECTOR_DB_DIR", store.to_str().unwrap()),
    ];
    let (_, stderr, success) = run_kb(&envs, &tmp, &["chat"]);
    assert!(!success, "chat must fail before any ingest");
    assert!(stderr.contains("kb ingest"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_empty_directory_succeeds() {
    // No supported files means no documents and no embedding API calls;
    // the run still exits 0 and reports zero counts.
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("notes");
    let store = tmp.path().join("vectors");
    std::fs::create_dir_all(&notes).unwrap();

    let envs = [
        ("OPENAI_API_KEY", "sk-test"),
        ("LOCAL_FILES_DIR", notes.to_str().unwrap()),
        ("VECTOR_DB_DIR", store.to_str().unwrap()),
    ];
    let (stdout, stderr, success) = run_kb(&envs, &tmp, &["ingest"]);
    assert!(success, "stdout={} stderr={}", stdout, stderr);
    assert!(stdout.contains("documents indexed: 0"));
    assert!(store.join("kb.sqlite").exists());
}

#[test]
fn test_mismatched_wiki_variables_rejected() {
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("notes");
    let store = tmp.path().join("vectors");
    std::fs::create_dir_all(&notes).unwrap();

    let envs = [
        ("OPENAI_API_KEY", "sk-test"),
        ("LOCAL_FILES_DIR", notes.to_str().unwrap()),
        ("VECTOR_DB_DIR", store.to_str().unwrap()),
        ("WIKI_API_KEY", "secret-without-root-page"),
    ];
    let (_, stderr, success) = run_kb(&envs, &tmp, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("WIKI_ROOT_PAGE_ID"), "stderr: {}", stderr);
}
