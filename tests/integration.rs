use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn intake_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("intake");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    // Archive of snippets for `import`; copy.txt repeats alpha.md's content.
    let archive = root.join("archive");
    fs::create_dir_all(archive.join("nested")).unwrap();
    fs::write(
        archive.join("alpha.md"),
        "Alpha snippet about Rust programming.",
    )
    .unwrap();
    fs::write(
        archive.join("nested").join("copy.txt"),
        "ALPHA   snippet about rust programming.",
    )
    .unwrap();
    fs::write(
        archive.join("gamma.html"),
        "<html><head><title>Gamma</title></head><body><p>Gamma notes on deployment.</p></body></html>",
    )
    .unwrap();
    fs::write(archive.join("ignored.csv"), "a,b,c").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/intake.sqlite"

[extract]
max_file_bytes = 1000000
timeout_secs = 30
yt_dlp_timeout_secs = 20

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = root.join("config").join("intake.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_intake(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = intake_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run intake binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Pulls the id out of `stored <id> (category: ...)`.
fn stored_id(stdout: &str) -> String {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("stored "))
        .and_then(|rest| rest.split_whitespace().next())
        .map(|s| s.to_string())
        .unwrap_or_else(|| panic!("no stored id in output: {}", stdout))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_intake(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/intake.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_intake(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_intake(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_intake(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "got: {}", stderr);
}

#[test]
fn test_add_file_then_duplicate() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("hello.txt");
    fs::write(&file, "Hello World").unwrap();

    run_intake(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_intake(&config_path, &["add", "--file", file.to_str().unwrap()]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("category: unclassified"));
    assert!(stdout.contains("RECEIVED -> EXTRACTED -> NORMALIZED -> DEDUP_CHECKED -> STORED"));
    let id = stored_id(&stdout);

    let (stdout, _, success) = run_intake(&config_path, &["add", "--file", file.to_str().unwrap()]);
    assert!(success, "duplicate add must exit successfully");
    assert!(
        stdout.contains(&format!("duplicate of {}", id)),
        "expected duplicate of {}, got: {}",
        id,
        stdout
    );
    assert!(stdout.contains("REJECTED_DUPLICATE"));
}

#[test]
fn test_get_entry() {
    let (_tmp, config_path) = setup_test_env();

    run_intake(&config_path, &["init"]);
    let (stdout, _, _) = run_intake(
        &config_path,
        &["add", "--text", "Notes from the planning call.", "--title", "Planning"],
    );
    let id = stored_id(&stdout);

    let (stdout, _, success) = run_intake(&config_path, &["get", &id]);
    assert!(success, "get should succeed");
    assert!(stdout.contains("Entry"));
    assert!(stdout.contains(&id));
    assert!(stdout.contains("Planning"));
    assert!(stdout.contains("source:       manual"));
    assert!(stdout.contains("Notes from the planning call."));
}

#[test]
fn test_get_missing_entry() {
    let (_tmp, config_path) = setup_test_env();

    run_intake(&config_path, &["init"]);

    let (_, stderr, success) = run_intake(&config_path, &["get", "nonexistent-id"]);
    assert!(!success, "get with missing ID should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_set_category_and_list() {
    let (_tmp, config_path) = setup_test_env();

    run_intake(&config_path, &["init"]);
    let (first, _, _) = run_intake(&config_path, &["add", "--text", "First snippet"]);
    let (second, _, _) = run_intake(
        &config_path,
        &["add", "--text", "Second snippet", "--category", "augment"],
    );
    let first_id = stored_id(&first);
    let second_id = stored_id(&second);

    let (stdout, stderr, success) =
        run_intake(&config_path, &["set-category", &first_id, "new-tasks"]);
    assert!(success, "set-category failed: {}", stderr);
    assert!(stdout.contains("new_tasks"));

    let (stdout, _, success) = run_intake(&config_path, &["list", "--category", "new_tasks"]);
    assert!(success);
    assert!(stdout.contains(&first_id));
    assert!(!stdout.contains(&second_id));

    let (stdout, _, _) = run_intake(&config_path, &["list"]);
    assert!(stdout.contains(&first_id));
    assert!(stdout.contains(&second_id));
}

#[test]
fn test_set_category_unknown_entry_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_intake(&config_path, &["init"]);
    let (_, stderr, success) = run_intake(&config_path, &["set-category", "missing", "replace"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "got: {}", stderr);
}

#[test]
fn test_unknown_category_is_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_intake(&config_path, &["add", "--text", "x", "--category", "misc"]);
    assert!(!success);
    assert!(stderr.contains("unknown category"), "got: {}", stderr);
}

#[test]
fn test_add_requires_exactly_one_source() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_intake(&config_path, &["add"]);
    assert!(!success);

    let (_, _, success) = run_intake(
        &config_path,
        &["add", "--text", "x", "--url", "https://example.org"],
    );
    assert!(!success);
}

#[test]
fn test_add_empty_text_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_intake(&config_path, &["init"]);
    let (_, stderr, success) = run_intake(&config_path, &["add", "--text", "   "]);
    assert!(!success);
    assert!(stderr.contains("empty_content"), "got: {}", stderr);

    let (stdout, _, _) = run_intake(&config_path, &["list"]);
    assert!(stdout.contains("No entries."));
}

#[test]
fn test_add_unsupported_file_fails() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("archive").join("ignored.csv");

    run_intake(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_intake(&config_path, &["add", "--file", file.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("unsupported_format"), "got: {}", stderr);
    assert!(stdout.contains("FAILED(unsupported_format)"));
}

#[test]
fn test_stats_counts_by_category() {
    let (_tmp, config_path) = setup_test_env();

    run_intake(&config_path, &["init"]);
    run_intake(&config_path, &["add", "--text", "One", "--category", "replace"]);
    run_intake(&config_path, &["add", "--text", "Two"]);

    let (stdout, _, success) = run_intake(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Entries:     2"), "got: {}", stdout);
    assert!(stdout.contains("replace"));
    assert!(stdout.contains("human_only"));
}

#[test]
fn test_import_directory() {
    let (tmp, config_path) = setup_test_env();
    let archive = tmp.path().join("archive");

    run_intake(&config_path, &["init"]);
    let (stdout, stderr, success) = run_intake(
        &config_path,
        &["import", archive.to_str().unwrap(), "--category", "augment"],
    );
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Found 3 file(s)"), "got: {}", stdout);
    assert!(
        stdout.contains("2 stored, 1 duplicate(s), 0 failed"),
        "got: {}",
        stdout
    );

    let (stdout, _, _) = run_intake(&config_path, &["list", "--category", "augment"]);
    assert!(stdout.contains("Gamma"));

    // Re-importing stores nothing new.
    let (stdout, _, _) = run_intake(&config_path, &["import", archive.to_str().unwrap()]);
    assert!(
        stdout.contains("0 stored, 3 duplicate(s), 0 failed"),
        "got: {}",
        stdout
    );
}

#[test]
fn test_import_dry_run() {
    let (tmp, config_path) = setup_test_env();
    let archive = tmp.path().join("archive");

    run_intake(&config_path, &["init"]);
    let (stdout, _, success) = run_intake(
        &config_path,
        &["import", archive.to_str().unwrap(), "--dry-run"],
    );
    assert!(success);
    assert!(stdout.contains("alpha.md"));
    assert!(!stdout.contains("ignored.csv"));
    assert!(stdout.contains("Dry run"));

    let (stdout, _, _) = run_intake(&config_path, &["list"]);
    assert!(stdout.contains("No entries."));
}
