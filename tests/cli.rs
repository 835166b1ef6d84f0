use std::fs;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

const DOC: &str = r#"{
  "kind": "panelLayout",
  "id": "root",
  "children": [
    {
      "kind": "panelRow",
      "sizes": [30, 70],
      "children": [
        { "kind": "panel", "activePaneId": "notes", "children": [
          { "kind": "pane", "id": "sheet", "location": "characterSheet:id=7" },
          { "kind": "pane", "id": "notes", "location": "notesTool:noteId=1" }
        ] },
        { "kind": "panel", "children": [
          { "kind": "pane", "location": "mapTool" }
        ] }
      ]
    }
  ]
}"#;

fn run(args: &[&str]) -> Output {
    test_bin::get_test_bin("panel-layout")
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run panel-layout")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_owned()
}

fn stdout(output: &Output) -> String { String::from_utf8_lossy(&output.stdout).into_owned() }

fn stderr(output: &Output) -> String { String::from_utf8_lossy(&output.stderr).into_owned() }

#[test]
fn validate_accepts_a_good_document() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "layout.json", DOC);

    let output = run(&["validate", &file]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("valid layout with 3 panes"), "{}", stdout(&output));
}

#[test]
fn validate_rejects_a_bad_document() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(
        &dir,
        "bad.json",
        r#"{ "kind": "panelLayout", "children": [
            { "kind": "panelRow", "sizes": [50], "children": [] }
        ] }"#,
    );

    let output = run(&["validate", &file]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.starts_with("error:"), "{err}");
    assert!(err.contains("bad.json"), "{err}");
}

#[test]
fn validate_reports_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let output = run(&["validate", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("missing.json"));
}

fn check_normalized(doc: &Value) {
    let row = &doc["children"][0];
    assert!(row["id"].is_string());
    assert_eq!(row["sizes"], serde_json::json!([30.0, 70.0]));
    assert_eq!(doc["sizes"], serde_json::json!([100.0]));

    let generated = &row["children"][1];
    assert!(generated["id"].is_string());
    assert!(generated["activePaneId"].is_string());
    assert_eq!(generated["activePaneId"], generated["children"][0]["id"]);
    assert_eq!(row["children"][0]["activePaneId"], "notes");
}

#[test]
fn normalize_fills_in_ids_and_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "layout.json", DOC);

    let output = run(&["normalize", &file]);
    assert!(output.status.success(), "{}", stderr(&output));
    let doc: Value = serde_json::from_str(&stdout(&output)).unwrap();
    check_normalized(&doc);
}

#[test]
fn normalize_writes_to_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "layout.json", DOC);
    let out = dir.path().join("out/normalized.json");

    let output = run(&["normalize", &file, "--output", out.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).is_empty());

    let written = fs::read_to_string(&out).unwrap();
    check_normalized(&serde_json::from_str(&written).unwrap());

    // Normalizing a normalized document changes nothing.
    let again = dir.path().join("again.json");
    let output = run(&["normalize", out.to_str().unwrap(), "-o", again.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read_to_string(&again).unwrap(), written);
}

#[test]
fn stats_counts_nodes_and_marks_active_panes() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "layout.json", DOC);

    let output = run(&["stats", &file]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["layouts", "1"]);
    assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), ["rows", "1"]);
    assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), ["panels", "2"]);
    assert_eq!(lines[3].split_whitespace().collect::<Vec<_>>(), ["panes", "3"]);
    assert_eq!(lines[4].split_whitespace().collect::<Vec<_>>(), ["depth", "4"]);

    assert!(lines.iter().any(|l| l.starts_with("* notes") && l.ends_with("notesTool:noteId=1")));
    assert!(lines.iter().any(|l| l.starts_with("  sheet")));
    assert!(lines.iter().any(|l| l.starts_with("* ") && l.ends_with("mapTool")));
}

#[test]
fn config_file_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir, "layout.json", DOC);

    let config = write(&dir, "config.toml", "[layout]\nmin_size_percent = 10.0\nid_strategy = \"sequential\"\n");
    let output = run(&["--config", &config, "normalize", &file]);
    assert!(output.status.success(), "{}", stderr(&output));
    let doc: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let generated = doc["children"][0]["children"][1]["id"].as_str().unwrap();
    assert!(generated.starts_with("panel-"), "{generated}");

    let bad = write(&dir, "bad.toml", "[layout]\nmin_size_percent = 10.0\nunknown = 1\n");
    let output = run(&["--config", &bad, "validate", &file]);
    assert_eq!(output.status.code(), Some(1));
}
