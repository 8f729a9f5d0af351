//! CLI integration tests for db-etl.
//!
//! These tests verify argument parsing, help output, exit codes, and a few
//! end-to-end runs against SQLite files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, TempDir};

/// Get a command for the db-etl binary.
fn cmd() -> Command {
    Command::cargo_bin("db-etl").unwrap()
}

/// Write a config file with the given loading section into `dir`.
fn write_config(dir: &Path, query: &str, loading: &str) -> std::path::PathBuf {
    let target = dir.join("target.db");
    let yaml = format!(
        r#"source_db:
  type: sqlite
  connection_params:
    database: ":memory:"
target_db:
  type: sqlite
  connection_params:
    database: "{}"
extraction:
  query: "{}"
loading:
{}
"#,
        target.display(),
        query,
        loading
    );
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

const TWO_ROWS: &str = "SELECT 1 AS id, 'Ana' AS nome UNION ALL SELECT 2, 'Bruno'";

const CREATE_CLIENTES: &str = r#"  target_table: clientes
  create_table: true
  column_definitions:
    id: INTEGER PRIMARY KEY
    nome: TEXT"#;

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_help_shows_global_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--progress"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--batch-size"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("db-etl"));
}

#[test]
fn test_missing_subcommand_fails() {
    cmd().assert().failure();
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[test]
fn test_missing_config_file_exits_7() {
    cmd()
        .args(["--config", "/nonexistent/config.yaml", "validate"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_1() {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "source_db: [unclosed").unwrap();

    cmd()
        .arg("--config")
        .arg(file.path())
        .arg("validate")
        .assert()
        .code(1);
}

#[test]
fn test_unsupported_extension_exits_1() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "x = 1").unwrap();

    cmd()
        .arg("--config")
        .arg(file.path())
        .arg("validate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported config file format"));
}

#[test]
fn test_create_table_without_definitions_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        TWO_ROWS,
        "  target_table: clientes\n  create_table: true",
    );

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("column_definitions"));
}

#[test]
fn test_zero_batch_size_override_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), TWO_ROWS, CREATE_CLIENTES);

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["run", "--batch-size", "0"])
        .assert()
        .code(1);
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_validate_succeeds_without_connecting() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), TWO_ROWS, CREATE_CLIENTES);

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));

    assert!(!dir.path().join("target.db").exists());
}

#[test]
fn test_health_check_sqlite() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), TWO_ROWS, CREATE_CLIENTES);

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("health-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Health check passed"));
}

#[test]
fn test_run_sqlite_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), TWO_ROWS, CREATE_CLIENTES);

    let output = cmd()
        .arg("--config")
        .arg(&config)
        .args(["--output-json", "run", "--batch-size", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["succeeded"], true);
    assert_eq!(report["rows_extracted"], 2);
    assert_eq!(report["rows_loaded"], 2);
    assert_eq!(report["batches"], 2);
    assert_eq!(report["table_created"], true);
    assert_eq!(report["final_state"], "done");
}

#[test]
fn test_run_text_report() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), TWO_ROWS, CREATE_CLIENTES);

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transfer completed!"))
        .stdout(predicate::str::contains("Rows: 2 loaded / 2 extracted"));
}

#[test]
fn test_progress_prints_json_lines() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), TWO_ROWS, CREATE_CLIENTES);

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["--progress", "run"])
        .assert()
        .success()
        .stderr(predicate::str::contains(r#""event":"batch_committed""#))
        .stderr(predicate::str::contains(r#""event":"finished""#));
}

#[test]
fn test_bad_query_exits_3() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "SELEC 1", CREATE_CLIENTES);

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("QueryError"));
}

#[test]
fn test_rejected_batch_exits_5_and_keeps_first_batch() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "SELECT 1 AS id, 30 AS idade UNION ALL SELECT 2, 60",
        r#"  target_table: pessoas
  create_table: true
  batch_size: 1
  column_definitions:
    id: INTEGER PRIMARY KEY
    idade: INTEGER CHECK (idade < 50)"#,
    );

    let output = cmd()
        .arg("--config")
        .arg(&config)
        .args(["--output-json", "run"])
        .assert()
        .code(5)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["succeeded"], false);
    assert_eq!(report["error"], "load");
    assert_eq!(report["batches"], 1);
    assert_eq!(report["batches_expected"], 2);
    assert_eq!(report["rows_loaded"], 1);
}
