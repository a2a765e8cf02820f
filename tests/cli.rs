//! End-to-end tests driving the `issue` binary against a temporary base
//! directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn run_issue(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_issue"))
        .arg("--dir")
        .arg(dir)
        .args(args)
        .env_remove("ISSUE_BASE_DIR")
        .env_remove("ISSUE_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start issue binary");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for issue binary")
}

fn issue(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let output = run_issue(dir, args, stdin);
    assert!(
        output.status.success(),
        "issue {:?} failed:\nSTDOUT:\n{}\nSTDERR:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn json_ids(dir: &Path, args: &[&str]) -> Vec<String> {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let value: serde_json::Value = serde_json::from_str(&stdout(&issue(dir, &full, ""))).unwrap();
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap().to_string())
        .collect()
}

fn create(dir: &Path, name: &str, urge: u32) -> String {
    let urge = urge.to_string();
    let args = ["--json", "-n", "--name", name, "--info", "details", "--urge", urge.as_str()];
    let out = issue(dir, &args, "");
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    value["id"].as_str().unwrap().to_string()
}

#[test]
fn empty_store_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let out = issue(dir.path(), &["-l"], "");
    assert_eq!(stdout(&out), "There are no issues available.\n");
    assert!(!dir.path().join("issues").exists());
}

#[test]
fn interactive_create_then_show() {
    let dir = TempDir::new().unwrap();
    let out = issue(dir.path(), &["-n"], "Fix bug\nNPE on save\n7\n");
    let text = stdout(&out);

    assert!(text.contains("** A new issue written to file '"), "{}", text);
    assert!(text.contains("Fix bug - '"), "{}", text);
    assert!(text.contains("    URGE: 7°"), "{}", text);

    let ids = json_ids(dir.path(), &["-l"]);
    assert_eq!(ids.len(), 1);
    assert!(dir.path().join("issues").join(format!("{}.is", ids[0])).is_file());

    let shown = stdout(&issue(dir.path(), &["--id", &ids[0]], ""));
    assert!(shown.starts_with("Fix bug - '"), "{}", shown);
    assert!(shown.contains("    INFO: NPE on save"));
}

#[test]
fn unknown_id_is_reported_not_failed() {
    let dir = TempDir::new().unwrap();
    let out = issue(dir.path(), &["--id", "2000-01-01 00:00:00"], "");
    assert_eq!(stdout(&out), "No issue file with id 2000-01-01 00:00:00 found.\n");
}

#[test]
fn interrupted_create_is_cancelled() {
    let dir = TempDir::new().unwrap();
    let out = issue(dir.path(), &["-n"], "only a name\n");
    assert!(stdout(&out).contains("Operation cancelled."));
    assert!(!dir.path().join("issues").exists());
}

#[test]
fn duplicate_name_declined_keeps_original() {
    let dir = TempDir::new().unwrap();
    let original = create(dir.path(), "dup", 3);

    let out = issue(dir.path(), &["-n"], "dup\nn\n");
    assert!(stdout(&out).contains("Operation cancelled."));
    assert_eq!(json_ids(dir.path(), &["-l"]), vec![original]);
}

#[test]
fn urgency_filters_and_sorting() {
    let dir = TempDir::new().unwrap();
    for (name, urge) in [("a", 2), ("b", 5), ("c", 7), ("d", 4)] {
        create(dir.path(), name, urge);
    }

    let value: serde_json::Value =
        serde_json::from_str(&stdout(&issue(dir.path(), &["--json", "-l"], ""))).unwrap();
    let urges: Vec<u64> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["urge"].as_u64().unwrap())
        .collect();
    assert_eq!(urges, vec![7, 5, 4, 2]);

    assert_eq!(json_ids(dir.path(), &["-u", "5"]).len(), 2);
    assert_eq!(json_ids(dir.path(), &["-U", "4"]).len(), 1);
    assert!(json_ids(dir.path(), &["-U", "3"]).is_empty());
}

#[test]
fn close_and_delete_closed() {
    let dir = TempDir::new().unwrap();
    let ids: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|name| create(dir.path(), name, 1))
        .collect();

    let out = issue(dir.path(), &["-c", &ids[0], &ids[2], "missing"], "");
    assert_eq!(
        stdout(&out),
        "The following issues were closed: ['one', 'three']\n"
    );

    let listed = stdout(&issue(dir.path(), &["-l"], ""));
    assert_eq!(listed.matches("STATUS: CLOSED").count(), 2);

    issue(dir.path(), &["-D"], "");
    assert_eq!(json_ids(dir.path(), &["-l"]), vec![ids[1].clone()]);
}

#[test]
fn delete_by_id() {
    let dir = TempDir::new().unwrap();
    let id = create(dir.path(), "short lived", 0);

    let out = issue(dir.path(), &["-d", "nothing here"], "");
    assert!(stdout(&out).contains("No issue file with id nothing here found."));
    assert_eq!(json_ids(dir.path(), &["-l"]).len(), 1);

    issue(dir.path(), &["-d", &id], "");
    assert!(json_ids(dir.path(), &["-l"]).is_empty());
    assert!(!dir.path().join("issues").join(format!("{}.is", id)).exists());
}

#[test]
fn unusable_store_exits_with_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("issues"), "not a directory").unwrap();

    let out = run_issue(dir.path(), &["-c", "x"], "");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("Error:"), "{}", stderr);
    assert!(stderr.contains("Issue store unavailable"), "{}", stderr);
}

#[test]
fn no_flags_prints_help() {
    let dir = TempDir::new().unwrap();
    let out = issue(dir.path(), &[], "");
    assert!(stdout(&out).contains("Usage:"));
}
