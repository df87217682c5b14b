//! Runs the compiled `ragify` binary against a temporary workspace with
//! embeddings and the language model disabled.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ragify_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ragify"))
}

fn setup_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("notes.txt"), "The warranty period is 24 months.").unwrap();

    let config_content = format!(
        r#"[store]
path = "{root}/data/ragify.sqlite"

[uploads]
dir = "{root}/uploaded_files"

[chunking]
chunk_size = 400
overlap = 40
"#,
        root = root.display()
    );
    let config_path = config_dir.join("ragify.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ragify(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(ragify_binary())
        .arg("--config")
        .arg(config_path)
        .arg("-q")
        .args(args)
        .env_remove("RAGIFY_LOG")
        .output()
        .expect("failed to run ragify binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_env();
    let (stdout, stderr, success) = run_ragify(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized"));
    assert!(tmp.path().join("data").join("ragify.sqlite").exists());

    // idempotent
    let (_, stderr, success) = run_ragify(&config, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_stats_on_empty_store() {
    let (_tmp, config) = setup_env();
    run_ragify(&config, &["init"]);
    let (stdout, stderr, success) = run_ragify(&config, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("documents: 0"));
    assert!(stdout.contains("chunks:    0"));
}

#[test]
fn test_greeting_answered_without_providers() {
    let (_tmp, config) = setup_env();
    let (stdout, stderr, success) = run_ragify(&config, &["ask", "Hello there"]);
    assert!(success, "ask failed: {}", stderr);
    assert!(stdout.contains("Hello and welcome to the DeepSeek Chatbot!"));
}

#[test]
fn test_question_with_disabled_embeddings_fails_politely() {
    let (_tmp, config) = setup_env();
    let (_, stderr, success) = run_ragify(&config, &["ask", "What is the warranty period?"]);
    assert!(!success);
    assert!(stderr.contains("Sorry"), "stderr: {}", stderr);
    assert!(stderr.contains("embedding provider is disabled"));
}

#[test]
fn test_index_with_disabled_embeddings_reports_error() {
    let (tmp, config) = setup_env();
    let notes = tmp.path().join("notes.txt");
    let (_, stderr, success) = run_ragify(&config, &["index", notes.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("embedding"), "stderr: {}", stderr);
}

#[test]
fn test_upload_rejects_non_pdf() {
    let (tmp, config) = setup_env();
    let notes = tmp.path().join("notes.txt");
    let (_, stderr, success) = run_ragify(&config, &["upload", notes.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("only PDF uploads are accepted"), "stderr: {}", stderr);
    assert!(!tmp.path().join("uploaded_files").join("notes.txt").exists());
}

#[test]
fn test_reset_succeeds_on_fresh_store() {
    let (_tmp, config) = setup_env();
    let (stdout, stderr, success) = run_ragify(&config, &["reset"]);
    assert!(success, "reset failed: {}", stderr);
    assert!(stdout.contains("Vector store cleared."));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_env();
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(&bad, "[chunking]\nchunk_size = 10\noverlap = 10\n").unwrap();
    let (_, stderr, success) = run_ragify(&bad, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("chunk_size (10) must be greater than overlap (10)"));
}

#[test]
fn test_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_ragify(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
