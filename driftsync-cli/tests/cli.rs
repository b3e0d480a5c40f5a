use std::fs;
use std::path::Path;
use assert_cmd::Command;

use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn driftsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("driftsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

const GREETING_DIFF: &str = "\
diff --git a/hello.txt b/hello.txt
--- a/hello.txt
+++ b/hello.txt
@@ -1,2 +1,2 @@
 hello
-world
+there
diff --git a/notes/new.md b/notes/new.md
new file mode 100644
--- /dev/null
+++ b/notes/new.md
@@ -0,0 +1,2 @@
+# Notes
+first
";

fn workspace_with_greeting() -> (TempDir, TempDir) {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("hello.txt"), "hello\nworld\n").expect("seed");
    fs::write(root.path().join("changes.diff"), GREETING_DIFF).expect("diff");
    (home, root)
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

#[test]
fn apply_writes_files_and_reports_table() {
    let (home, root) = workspace_with_greeting();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(contains("2 applied, 0 failed"))
        .stdout(contains("modified"))
        .stdout(contains("created"));

    assert_eq!(
        fs::read_to_string(root.path().join("hello.txt")).unwrap(),
        "hello\nthere\n"
    );
    assert_eq!(
        fs::read_to_string(root.path().join("notes/new.md")).unwrap(),
        "# Notes\nfirst"
    );
}

#[test]
fn apply_dry_run_leaves_tree_untouched() {
    let (home, root) = workspace_with_greeting();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"));

    assert_eq!(
        fs::read_to_string(root.path().join("hello.txt")).unwrap(),
        "hello\nworld\n"
    );
    assert!(!root.path().join("notes/new.md").exists());
}

#[test]
fn apply_conflict_exits_non_zero_and_keeps_file() {
    let (home, root) = workspace_with_greeting();
    fs::write(root.path().join("hello.txt"), "hello\nsomeone else\n").unwrap();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stdout(contains("failed"))
        .stderr(contains("1 of 2 files failed to apply"));

    assert_eq!(
        fs::read_to_string(root.path().join("hello.txt")).unwrap(),
        "hello\nsomeone else\n"
    );
    // The other file in the batch still lands.
    assert!(root.path().join("notes/new.md").exists());
}

#[test]
fn apply_json_reads_stdin() {
    let (home, root) = workspace_with_greeting();

    let assert = driftsync_cmd(home.path())
        .args(["apply", "-", "--json", "--root"])
        .arg(root.path())
        .write_stdin(GREETING_DIFF)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    let statuses: Vec<&str> = json["outcomes"]
        .as_array()
        .expect("outcomes")
        .iter()
        .map(|o| o["status"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(statuses, ["modified", "created"]);
}

#[test]
fn strict_flag_and_config_control_whitespace() {
    let (home, root) = workspace_with_greeting();
    fs::write(root.path().join("hello.txt"), "  hello\nworld\n").unwrap();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .args(["--strict", "--dry-run"])
        .assert()
        .failure();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .arg("--dry-run")
        .assert()
        .success();

    fs::create_dir_all(home.path().join(".driftsync")).unwrap();
    fs::write(
        home.path().join(".driftsync/config.yaml"),
        "whitespace: strict\n",
    )
    .unwrap();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .arg("--dry-run")
        .assert()
        .failure();
}

#[test]
fn corrupt_config_is_reported() {
    let (home, root) = workspace_with_greeting();
    fs::create_dir_all(home.path().join(".driftsync")).unwrap();
    fs::write(home.path().join(".driftsync/config.yaml"), "whitespace: [").unwrap();

    driftsync_cmd(home.path())
        .arg("apply")
        .arg(root.path().join("changes.diff"))
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(contains("config.yaml"));
}

// ---------------------------------------------------------------------------
// parse / diff / summarize
// ---------------------------------------------------------------------------

#[test]
fn parse_lists_patches() {
    let (home, root) = workspace_with_greeting();

    driftsync_cmd(home.path())
        .arg("parse")
        .arg(root.path().join("changes.diff"))
        .assert()
        .success()
        .stdout(contains("hello.txt"))
        .stdout(contains("notes/new.md"))
        .stdout(contains("@@ -0,0 +1,2 @@"));
}

#[test]
fn parse_of_prose_finds_nothing() {
    let home = TempDir::new().expect("home");

    driftsync_cmd(home.path())
        .args(["parse", "-"])
        .write_stdin("no diff in here\n")
        .assert()
        .success()
        .stdout(contains("No file changes found"));
}

#[test]
fn diff_output_applies_back() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("old.txt"), "a\nb\nc\n").unwrap();
    fs::write(root.path().join("new.txt"), "a\nB\nc\n").unwrap();
    fs::write(root.path().join("target.txt"), "a\nb\nc\n").unwrap();

    let assert = driftsync_cmd(home.path())
        .arg("diff")
        .arg(root.path().join("old.txt"))
        .arg(root.path().join("new.txt"))
        .args(["--path", "target.txt"])
        .assert()
        .success()
        .stdout(contains("-b").and(contains("+B")));
    let diff_text = assert.get_output().stdout.clone();

    driftsync_cmd(home.path())
        .args(["apply", "-", "--root"])
        .arg(root.path())
        .write_stdin(diff_text)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(root.path().join("target.txt")).unwrap(),
        "a\nB\nc\n"
    );
}

#[test]
fn summarize_prints_delta_record() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("v1.txt"), "line1\nline2\nline3").unwrap();
    fs::write(root.path().join("v2.txt"), "line1\nlineTWO\nline3").unwrap();

    let assert = driftsync_cmd(home.path())
        .arg("summarize")
        .arg(root.path().join("v1.txt"))
        .arg(root.path().join("v2.txt"))
        .args(["--path", "notes.txt", "--language", "plaintext"])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert_eq!(json["kind"], "delta");
    assert_eq!(json["path"], "notes.txt");
    assert_eq!(json["language_id"], "plaintext");
    assert_eq!(json["start"], 10);
    assert_eq!(json["delete_count"], 1);
    assert_eq!(json["insert_text"], "TWO");
}

#[test]
fn summarize_threshold_flag_forces_resync() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("v1.txt"), "abcdefghij").unwrap();
    fs::write(root.path().join("v2.txt"), "abcdefghiJ").unwrap();

    driftsync_cmd(home.path())
        .arg("summarize")
        .arg(root.path().join("v1.txt"))
        .arg(root.path().join("v2.txt"))
        .args(["--threshold", "0.1"])
        .assert()
        .success()
        .stdout(contains("resync_required"));
}

#[test]
fn diff_from_dev_null_is_a_creation() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("new.txt"), "fresh\n").unwrap();

    driftsync_cmd(home.path())
        .args(["diff", "/dev/null"])
        .arg(root.path().join("new.txt"))
        .args(["--path", "new.txt"])
        .assert()
        .success()
        .stdout(contains("--- /dev/null"))
        .stdout(contains("+++ b/new.txt"))
        .stdout(contains("+fresh"));
}
