//! Integration tests for the complete import pipeline
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Project config loading and transform document merging
//! - Field-copy formats and expressions over real CSV rows
//! - File sink output as JSON lines
//! - Error reporting with file and row context

use eventloom_core::{Config, Error, Importer, MemorySink};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Helper to create a temporary project directory with standard structure.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("transforms")).unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    dir
}

fn write(dir: &TempDir, path: &str, content: &str) {
    std::fs::write(dir.path().join(path), content).unwrap();
}

fn read_jsonl(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// =============================================================================
// Complete Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_complete_pipeline_to_file_sink() {
    let dir = setup_project();

    write(
        &dir,
        "eventloom.yaml",
        r#"
name: users-import
table: users
transforms:
  - transforms/users.yaml
files:
  - data/users.csv
sink:
  type: file
  path: out/users.jsonl
"#,
    );
    write(
        &dir,
        "transforms/users.yaml",
        r#"
fields:
  id: "ID:integer"
  name: "Name"
  score: "Score:float"
  active: "Active:boolean"
  joined: "Joined:timestamp:%d/%m/%Y %H:%M"
  label: "{ upper(Name) + '#' + ID }"
  tier: "{ int(Score) >= 90 ? 'gold' : 'standard' }"
"#,
    );
    write(
        &dir,
        "data/users.csv",
        "ID,Name,Score,Active,Joined\n\
         1,alice,93.5,yes,01/02/2024 09:30\n\
         2,bob,71,no,15/06/2023 18:05\n",
    );

    let config = Config::load(dir.path()).unwrap();
    let mut importer = Importer::from_config(&config).unwrap();
    let stats = importer.import_configured().await.unwrap();
    assert_eq!(stats.files, 1);
    assert_eq!(stats.records, 2);

    let records = read_jsonl(&dir.path().join("out/users.jsonl"));
    assert_eq!(
        records,
        vec![
            json!({
                "id": 1,
                "name": "alice",
                "score": 93.5,
                "active": true,
                "joined": "2024-02-01T09:30:00Z",
                "label": "ALICE#1",
                "tier": "gold"
            }),
            json!({
                "id": 2,
                "name": "bob",
                "score": 71.0,
                "active": false,
                "joined": "2023-06-15T18:05:00Z",
                "label": "BOB#2",
                "tier": "standard"
            }),
        ]
    );
}

#[tokio::test]
async fn test_output_keys_follow_translator_order() {
    let dir = setup_project();
    write(&dir, "transforms/t.yaml", "fields:\n  z: a\n  m: b\n  a: c\n");
    write(&dir, "data/in.csv", "a,b,c\n1,2,3\n");

    let sink = MemorySink::new();
    let mut importer = Importer::new(Box::new(sink.clone()), "t");
    importer
        .load_transform_file(dir.path().join("transforms/t.yaml"))
        .unwrap();
    importer.import([dir.path().join("data/in.csv")]).await.unwrap();

    let records = sink.records();
    let keys: Vec<&str> = records[0].1.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "m", "a"]);
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[tokio::test]
async fn test_missing_transform_file_fails_from_config() {
    let dir = setup_project();
    write(
        &dir,
        "eventloom.yaml",
        "name: t\ntable: t\ntransforms: [transforms/missing.yaml]\n",
    );

    let config = Config::load(dir.path()).unwrap();
    let result = Importer::from_config(&config);
    assert!(matches!(result, Err(Error::FileAccess { .. })));
}

#[tokio::test]
async fn test_strict_mode_reports_row() {
    let dir = setup_project();
    write(
        &dir,
        "eventloom.yaml",
        "name: t\ntable: t\nstrict: true\ntransforms: [transforms/t.yaml]\nfiles: [data/in.csv]\n",
    );
    write(&dir, "transforms/t.yaml", "fields:\n  email: Email\n");
    write(&dir, "data/in.csv", "Name\nada\n");

    let config = Config::load(dir.path()).unwrap();
    let sink = MemorySink::new();
    let mut importer = Importer::from_config_with_sink(&config, Box::new(sink.clone())).unwrap();
    let err = importer.import_configured().await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("in.csv"));
    assert!(message.contains("row 1"));
    assert!(matches!(err.root(), Error::MissingField { field } if field == "Email"));
    assert!(sink.is_empty());
}
