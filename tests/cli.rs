// End-to-end tests of the topictag binary's stdout and exit codes.
//
// None of these need model files: they cover the paths that finish before
// inference (missing argument, model load failure).

use std::path::PathBuf;
use std::process::{Command, Output};

fn topictag(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_topictag"))
        .args(args)
        .env_remove("TOPICTAG_MODEL_DIR")
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run topictag")
}

fn missing_model_dir() -> PathBuf {
    std::env::temp_dir().join("topictag-cli-test-no-model")
}

#[test]
fn no_argument_prints_error_json_and_exits_1() {
    let out = topictag(&[]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "{\"error\": \"No article content provided\"}\n"
    );
}

#[test]
fn no_argument_output_is_valid_json() {
    let out = topictag(&[]);
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["error"], "No article content provided");
}

#[test]
fn model_load_failure_exits_1_without_stdout() {
    let dir = missing_model_dir();
    let out = topictag(&["--model-dir", dir.to_str().unwrap(), "Some article"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        out.stdout.is_empty(),
        "nothing should reach stdout, got: {}",
        String::from_utf8_lossy(&out.stdout)
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("Error loading model"),
        "stderr should carry the diagnostic, got: {stderr}"
    );
}

#[test]
fn model_load_failure_names_download_command() {
    let dir = missing_model_dir();
    let out = topictag(&["--model-dir", dir.to_str().unwrap(), "Some article"]);
    assert!(String::from_utf8_lossy(&out.stderr).contains("--download-model"));
}

/// Runs with a lone argument, pointing the model directory at nothing via
/// the environment so the only way to pass is the load-failure path.
fn topictag_without_model(arg: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_topictag"))
        .arg(arg)
        .env("TOPICTAG_MODEL_DIR", missing_model_dir())
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run topictag")
}

fn assert_load_failure(out: &Output) {
    assert_eq!(out.status.code(), Some(1));
    assert!(
        out.stdout.is_empty(),
        "expected no stdout, got: {}",
        String::from_utf8_lossy(&out.stdout)
    );
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error loading model"));
}

#[test]
fn lone_help_flag_is_classified_as_article() {
    assert_load_failure(&topictag_without_model("-h"));
}

#[test]
fn lone_download_flag_is_classified_as_article() {
    assert_load_failure(&topictag_without_model("--download-model"));
}

#[test]
fn lone_model_dir_flag_is_classified_as_article() {
    assert_load_failure(&topictag_without_model("--model-dir"));
}
