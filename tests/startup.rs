// tests/startup.rs

mod common;

use std::fs;
use std::io::Write;
use std::path::Path;

use cdt::config::load_and_validate;
use cdt::config::user::{DEFAULT_USER_CONFIG, USER_CONFIG_FILE_NAME};
use cdt::errors::CdtError;
use cdt_test_utils::builders::{TaskBuilder, TasksFileBuilder, TestEnv};
use cdt_test_utils::init_runtime;
use cdt_test_utils::mock_os::MockOs;
use common::{TestResult, default_env, green, red};
use serde_json::json;
use tempfile::NamedTempFile;

#[test]
fn missing_tasks_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");

    match load_and_validate(&path) {
        Err(CdtError::TasksConfigNotFound(p)) => assert!(p.ends_with("nope.json")),
        other => panic!("expected TasksConfigNotFound, got {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{\"cdt_tasks\": [").unwrap();

    match load_and_validate(file.path()) {
        Err(err @ CdtError::ConfigParse { .. }) => {
            assert!(err.to_string().starts_with("Failed to parse "));
        }
        other => panic!("expected ConfigParse, got {other:?}"),
    }
}

#[test]
fn every_validation_error_is_returned_at_once() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"cdt_tasks": [
            {{"name": "a", "command": "a", "pre_tasks": ["missing"]}},
            {{"name": "b"}},
            {{"name": "c", "command": "c", "pre_tasks": ["c"]}}
        ]}}"#
    )
    .unwrap();

    let err = load_and_validate(file.path()).unwrap_err();
    let errors = err.config_errors();
    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(errors.contains(&"task #2: 'command': must be a string".to_string()));
    assert!(errors.contains(&"task #1: references task 'missing' that does not exist".to_string()));
    assert!(errors.iter().any(|e| e.ends_with("c -> c")));

    let message = err.to_string();
    assert!(message.contains(" is invalid:\n"));
    assert!(message.contains("task #2: 'command': must be a string"));
}

#[tokio::test]
async fn invalid_tasks_config_prints_nothing() -> TestResult {
    let tasks = json!({"cdt_tasks": [{"name": "broken"}]});
    let env = TestEnv::new(&tasks)?;
    let os = MockOs::new();
    let handle = os.handle();

    let result = init_runtime(&env, os);

    assert!(matches!(result, Err(CdtError::InvalidTasksConfig { .. })));
    assert_eq!(handle.output(), "");
    Ok(())
}

#[tokio::test]
async fn banner_lists_tasks_and_moves_into_config_dir() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new();
    let handle = os.handle();

    let runtime = init_runtime(&env, os)?;

    let expected = format!(
        "Type {} to see list of all the user commands.\n{}\n\
         1 \"hello world\"\n2 \"primary task\"\n3 \"pre task 1\"\n4 \"pre task 2\"\n\
         5 \"pre pre task 1\"\n6 \"pre pre task 2\"\n7 \"run tests\"\n8 \"restart\"\n",
        green("h"),
        green("Tasks:")
    );
    assert_eq!(handle.output(), expected);
    assert_eq!(handle.cwd_changes(), vec![env.dir.path().to_path_buf()]);
    assert_eq!(runtime.cdt().tasks().len(), 8);
    assert!(runtime.cdt().is_idle());
    Ok(())
}

#[tokio::test]
async fn relative_tasks_config_is_resolved_against_cwd() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new();
    let handle = os.handle();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let os = os.home(&env.home).cwd(env.dir.path());

    cdt::engine::Runtime::init(os, Path::new("tasks.json"), tx, rx)?;

    assert_eq!(handle.cwd_changes(), vec![env.dir.path().to_path_buf()]);
    Ok(())
}

#[tokio::test]
async fn missing_user_config_is_created_with_examples() -> TestResult {
    let tasks = TasksFileBuilder::new()
        .with_task(TaskBuilder::new("hello", "echo hello"))
        .build();
    let env = TestEnv::new(&tasks)?;
    let os = MockOs::new();
    let handle = os.handle();

    init_runtime(&env, os)?;

    let created = fs::read_to_string(env.home.join(USER_CONFIG_FILE_NAME))?;
    assert_eq!(created, DEFAULT_USER_CONFIG);
    assert!(!handle.output().contains("\x1b[31m"));
    Ok(())
}

#[tokio::test]
async fn malformed_user_config_fields_are_warnings() -> TestResult {
    let tasks = TasksFileBuilder::new()
        .with_task(TaskBuilder::new("hello", "echo hello"))
        .build();
    let env = TestEnv::new(&tasks)?.with_user_config(&json!({
        "open_in_editor_command": "subl",
        "debug_command": 42,
        "execute_in_new_terminal_tab_command": "terminal -- {}",
    }))?;
    let os = MockOs::new();
    let handle = os.handle();

    let runtime = init_runtime(&env, os)?;

    let output = handle.output();
    assert!(output.starts_with(&red(
        "'open_in_editor_command': must be a string in format: 'notepad++ {}', where {} will be replaced with a file name"
    )));
    assert!(output.contains(&red(
        "'debug_command': must be a string in format: 'gdb --args {}', where {} will be replaced with a command to debug"
    )));
    assert!(runtime.cdt().tasks()[0].name == "hello");
    Ok(())
}
