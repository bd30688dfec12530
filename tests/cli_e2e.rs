//! End-to-end CLI tests for the pdfharvest binary.

#![allow(deprecated)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const PDF_BODY: &[u8] = b"%PDF-1.4\n%%EOF\n";

/// Binary with an isolated config home and none of the env-backed flags set.
fn pdfharvest(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pdfharvest").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("PDF_OUTPUT_DIR")
        .env_remove("DOWNLOAD_TIMEOUT")
        .env_remove("MAX_RETRIES")
        .env("RUST_LOG", "warn");
    cmd
}

async fn mount_ok_and_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ok.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(PDF_BODY.to_vec())
                .insert_header("Content-Type", "application/pdf"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[test]
fn test_binary_help_displays_usage() {
    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pdfharvest"))
        .stdout(predicate::str::contains("--on-existing"));
}

#[test]
fn test_binary_version_displays_version() {
    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pdfharvest"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .arg("--invalid-flag")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_empty_stdin_exits_zero() {
    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn test_binary_dry_run_shows_resolved_filenames() {
    let tempdir = TempDir::new().unwrap();
    let out_dir = tempdir.path().join("out");

    pdfharvest(tempdir.path())
        .arg("--dry-run")
        .arg("-o")
        .arg(&out_dir)
        .write_stdin(
            "AI in Healthcare | https://example.com/a.pdf\n\
             AI in Healthcare | https://example.com/a.pdf\n\
             Broken | ftp://example.com/b.pdf\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run preview: 3 request(s)."))
        .stdout(predicate::str::contains("[fetch] https://example.com/a.pdf"))
        .stdout(predicate::str::contains("AI_in_Healthcare_"))
        .stdout(predicate::str::contains("[duplicate]"))
        .stdout(predicate::str::contains("[invalid] ftp://example.com/b.pdf"));

    assert!(!out_dir.exists(), "dry run must not create the output dir");
}

#[test]
fn test_binary_missing_input_file_fails() {
    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .arg(tempdir.path().join("does-not-exist.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist.txt"));
}

#[test]
fn test_binary_explicit_missing_config_fails() {
    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .arg("--config")
        .arg(tempdir.path().join("nope.toml"))
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_binary_invalid_default_config_fails() {
    let tempdir = TempDir::new().unwrap();
    let config_dir = tempdir.path().join("pdfharvest");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "concurrency = 99\n").unwrap();

    pdfharvest(tempdir.path())
        .write_stdin("https://example.com/a.pdf\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_binary_rejected_env_values_exit_one() {
    for (name, value) in [
        ("DOWNLOAD_TIMEOUT", "0"),
        ("DOWNLOAD_TIMEOUT", "abc"),
        ("MAX_RETRIES", "11"),
    ] {
        let tempdir = TempDir::new().unwrap();
        pdfharvest(tempdir.path())
            .env(name, value)
            .write_stdin("")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("invalid value"));
    }
}

#[tokio::test]
async fn test_binary_repeated_missing_link_exits_one() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;

    let tempdir = TempDir::new().unwrap();
    let line = format!("Gone | {}/missing.pdf\n", mock_server.uri());
    pdfharvest(tempdir.path())
        .arg("-o")
        .arg(tempdir.path().join("papers"))
        .write_stdin(format!("{line}{line}"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Summary: 2 total, 0 succeeded, 0 skipped, 2 failed",
        ));
}

#[tokio::test]
async fn test_binary_partial_success_exits_two() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;

    let tempdir = TempDir::new().unwrap();
    let out_dir = tempdir.path().join("papers");
    let input = format!(
        "AI in Healthcare | {uri}/ok.pdf\nAI in Healthcare | {uri}/missing.pdf\n",
        uri = mock_server.uri()
    );

    pdfharvest(tempdir.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--backoff-base-ms")
        .arg("0")
        .write_stdin(input)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("[Success] AI in Healthcare"))
        .stdout(predicate::str::contains("[Failed] AI in Healthcare: HTTPError"))
        .stdout(predicate::str::contains(
            "Summary: 2 total, 1 succeeded, 0 skipped, 1 failed",
        ));

    let written: Vec<_> = std::fs::read_dir(&out_dir).unwrap().collect();
    assert_eq!(written.len(), 1);
}

#[tokio::test]
async fn test_binary_all_failed_exits_one() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;

    let tempdir = TempDir::new().unwrap();
    pdfharvest(tempdir.path())
        .arg("-o")
        .arg(tempdir.path().join("papers"))
        .write_stdin(format!("Gone | {}/missing.pdf\n", mock_server.uri()))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failure summary by kind:"));
}

#[tokio::test]
async fn test_binary_json_report_from_input_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;

    let tempdir = TempDir::new().unwrap();
    let input_path = tempdir.path().join("links.json");
    let input = serde_json::json!([
        { "title": "Good Paper", "url": format!("{}/ok.pdf", mock_server.uri()) }
    ]);
    std::fs::write(&input_path, input.to_string()).unwrap();

    let assert = pdfharvest(tempdir.path())
        .arg("--json")
        .arg("-o")
        .arg(tempdir.path().join("papers"))
        .arg(&input_path)
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["summary"]["succeeded"], 1);
    assert_eq!(report["results"][0]["status"], "Success");
    let local_path = report["results"][0]["local_path"].as_str().unwrap();
    assert!(local_path.contains("Good_Paper_"));
    assert!(local_path.ends_with(".pdf"));
}

#[tokio::test]
async fn test_binary_second_run_reports_skipped() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&mock_server).await;

    let tempdir = TempDir::new().unwrap();
    let out_dir = tempdir.path().join("papers");
    let input = format!("Good Paper | {}/ok.pdf\n", mock_server.uri());

    pdfharvest(tempdir.path())
        .arg("-o")
        .arg(&out_dir)
        .write_stdin(input.clone())
        .assert()
        .success();

    pdfharvest(tempdir.path())
        .arg("-o")
        .arg(&out_dir)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("[Skipped] Good Paper"));
}
