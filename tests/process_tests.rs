use std::{collections::BTreeMap, fs, path::PathBuf};

use regex::Regex;
use spr::{CommandSpec, process::run_command};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("spr-process-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn sh(name: &str, script: &str, regex: Option<&str>) -> CommandSpec {
    CommandSpec::new(
        name,
        vec!["sh".into(), "-c".into(), script.into()],
        regex.map(|r| Regex::new(r).expect("valid pattern")),
    )
}

#[tokio::test]
async fn exit_code_gives_success_flag() {
    let root = temp_root();
    let env = BTreeMap::new();

    let ok = run_command(&sh("ok", "echo noise; exit 0", None), &root, &env)
        .await
        .expect("run");
    let ko = run_command(&sh("ko", "exit 3", None), &root, &env)
        .await
        .expect("run");

    assert_eq!(ok.values(), vec![1]);
    assert_eq!(ko.values(), vec![0]);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn commands_run_inside_the_given_directory() {
    let root = temp_root();
    fs::write(root.join("marker"), "").expect("write marker");

    let result = run_command(&sh("marker", "test -f marker", None), &root, &BTreeMap::new())
        .await
        .expect("run");
    assert!(result.success());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn stderr_is_scanned_and_last_match_wins() {
    let root = temp_root();
    let spec = sh(
        "tests",
        "echo 'score 3/10'; echo 'score 8/10' 1>&2; echo done; exit 1",
        Some(r"score (\d+)/(\d+)"),
    );

    let result = run_command(&spec, &root, &BTreeMap::new())
        .await
        .expect("run");
    assert_eq!(result.values(), vec![0, 8, 10]);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn environment_overrides_are_visible() {
    let root = temp_root();
    let env = BTreeMap::from([("SPR_TEST_VALUE".to_string(), "17".to_string())]);
    let spec = sh("env", "echo \"value $SPR_TEST_VALUE\"", Some(r"value (\d+)"));

    let result = run_command(&spec, &root, &env).await.expect("run");
    assert_eq!(result.values(), vec![1, 17]);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn unmatched_pattern_only_reports_the_flag() {
    let root = temp_root();
    let spec = sh("coverage", "echo 'no coverage data'", Some(r"coverage: (\d+)%"));

    let result = run_command(&spec, &root, &BTreeMap::new())
        .await
        .expect("run");
    assert_eq!(result.values(), vec![1]);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn non_integer_capture_is_fatal() {
    let root = temp_root();
    let spec = sh("coverage", "echo 'coverage: high'", Some(r"coverage: (\w+)"));

    assert!(run_command(&spec, &root, &BTreeMap::new()).await.is_err());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn unknown_program_is_an_error() {
    let root = temp_root();
    let spec = CommandSpec::new("missing", vec!["spr-no-such-program".into()], None);

    assert!(run_command(&spec, &root, &BTreeMap::new()).await.is_err());

    let _ = fs::remove_dir_all(root);
}
