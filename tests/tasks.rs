// tests/tasks.rs

mod common;

use cdt::commands::write_help;
use cdt::engine::ExecutionState;
use cdt_test_utils::mock_os::{MockOs, ProcessExec};
use cdt_test_utils::{init_runtime, init_tracing, run_cdt, with_timeout};
use common::{
    TestResult, assert_in_order, complete, default_env, failed, green, magenta, running,
    running_pre_task,
};

#[tokio::test]
async fn task_output_is_streamed() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new()
        .process("echo hello world", ProcessExec::new().stdout(["hello world"]))
        .input("t1");
    let handle = os.handle();

    run_cdt(&env, os).await?;

    assert_in_order(
        &handle.output(),
        &[&running("hello world"), "hello world\n", &complete("hello world")],
    );
    assert_eq!(handle.cmds_executed(), vec!["echo hello world"]);
    Ok(())
}

#[tokio::test]
async fn pre_tasks_run_dependency_first() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new()
        .process("echo pre task 1", ProcessExec::new().stdout(["quiet pre task"]))
        .process("echo primary task", ProcessExec::new().stdout(["loud primary"]))
        .input("t2");
    let handle = os.handle();

    run_cdt(&env, os).await?;

    assert_eq!(
        handle.cmds_executed(),
        vec![
            "echo pre pre task 1",
            "echo pre pre task 2",
            "echo pre task 1",
            "echo pre task 2",
            "echo primary task",
        ]
    );
    let output = handle.output();
    assert_in_order(
        &output,
        &[
            &running_pre_task("pre pre task 1"),
            &running_pre_task("pre pre task 2"),
            &running_pre_task("pre task 1"),
            &running_pre_task("pre task 2"),
            &running("primary task"),
            "loud primary\n",
            &complete("primary task"),
        ],
    );
    // Successful pre-tasks are silent.
    assert!(!output.contains("quiet pre task"));
    assert!(!output.contains(&complete("pre task 1")));
    Ok(())
}

#[tokio::test]
async fn failed_pre_task_aborts_the_batch() -> TestResult {
    init_tracing();
    let env = default_env()?;
    let os = MockOs::new()
        .process(
            "echo pre task 1",
            ProcessExec::new().stdout(["compiling"]).stderr(["error: boom"]).exit_code(3),
        )
        .input("t2");
    let handle = os.handle();
    let mut runtime = init_runtime(&env, os)?;

    with_timeout(runtime.run()).await?;

    assert_eq!(
        handle.cmds_executed(),
        vec!["echo pre pre task 1", "echo pre pre task 2", "echo pre task 1"]
    );
    assert_in_order(
        &handle.output(),
        &[
            &running_pre_task("pre task 1"),
            "compiling\n",
            "error: boom\n",
            &failed("pre task 1", 3),
        ],
    );
    let history: Vec<(&str, ExecutionState)> = runtime
        .cdt()
        .history()
        .map(|e| (e.name.as_str(), e.state))
        .collect();
    assert_eq!(
        history,
        vec![
            ("pre task 1", ExecutionState::Failed),
            ("pre pre task 2", ExecutionState::Complete),
            ("pre pre task 1", ExecutionState::Complete),
        ]
    );
    assert!(runtime.cdt().is_idle());
    Ok(())
}

#[tokio::test]
async fn command_that_cannot_start_fails_with_minus_one() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new()
        .process("echo hello world", ProcessExec::new().fail_to_exec())
        .input("t1");
    let handle = os.handle();

    run_cdt(&env, os).await?;

    assert_in_order(
        &handle.output(),
        &[
            &running("hello world"),
            "Failed to exec: echo hello world: command not found\n",
            &failed("hello world", -1),
        ],
    );
    Ok(())
}

#[tokio::test]
async fn task_index_out_of_range_lists_tasks() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new().inputs(&["t", "t99"]);
    let handle = os.handle();

    run_cdt(&env, os).await?;

    let output = handle.output();
    // Once in the banner and once per command.
    assert_eq!(output.matches(&green("Tasks:")).count(), 3);
    assert!(handle.cmds_executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_command_prints_help() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new().inputs(&["wat", "h"]);
    let handle = os.handle();

    run_cdt(&env, os).await?;

    let mut help = Vec::new();
    write_help(&mut help)?;
    let help = String::from_utf8(help)?;
    assert_eq!(handle.output().matches(&help).count(), 2);
    assert!(help.starts_with(&format!("{}\nt<ind>\t\tExecute the task", green("User commands:"))));
    assert!(help.contains("exec<ind>\tChange currently selected execution"));
    assert!(help.contains("\ns\t\tSearch through output"));
    Ok(())
}

#[tokio::test]
async fn empty_line_repeats_last_command() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new().inputs(&["t1", "", " "]);
    let handle = os.handle();

    run_cdt(&env, os).await?;

    assert_eq!(handle.cmds_executed(), vec!["echo hello world"; 3]);
    Ok(())
}

#[tokio::test]
async fn repeat_runs_whole_batch_until_failure() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new()
        .process("echo pre task 1", ProcessExec::new())
        .process("echo pre task 1", ProcessExec::new())
        .process("echo pre task 1", ProcessExec::new().exit_code(1))
        .input("tr3");
    let handle = os.handle();

    run_cdt(&env, os).await?;

    let batch = ["echo pre pre task 1", "echo pre pre task 2", "echo pre task 1"];
    assert_eq!(handle.cmds_executed(), batch.repeat(3));
    let output = handle.output();
    assert_eq!(output.matches(&complete("pre task 1")).count(), 2);
    assert!(output.contains(&failed("pre task 1", 1)));
    Ok(())
}

#[tokio::test]
async fn execution_history_and_selection() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new()
        .process("echo hello world", ProcessExec::new().stdout(["hello world"]))
        .process("echo pre task 2", ProcessExec::new().stdout(["pre task 2"]))
        .inputs(&["exec", "t1", "t4", "exec", "exec2", "s", "hello", "exec1", "s", "hello"]);
    let handle = os.handle();

    run_cdt(&env, os).await?;

    assert_in_order(
        &handle.output(),
        &[
            &green("No task has been executed yet"),
            &green("Execution history:"),
            "   2 12:30:15 \"hello world\"\n",
            "-> 1 12:30:15 \"pre task 2\"\n",
            &magenta("Selected execution \"hello world\""),
            &magenta("1:"),
            "\x1b[32mhello\x1b[0m world\n",
            &magenta("Selected execution reset"),
            &green("No matches found"),
        ],
    );
    Ok(())
}

#[tokio::test]
async fn interrupt_at_the_search_prompt_exits() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new()
        .inputs(&["t1", "s"])
        .interrupt()
        .inputs(&["hello", "t4"]);
    let handle = os.handle();

    run_cdt(&env, os).await?;

    let output = handle.output();
    assert!(output.ends_with(&green("Regular expression: ")));
    assert_eq!(handle.cmds_executed(), vec!["echo hello world"]);
    Ok(())
}

#[tokio::test]
async fn debug_needs_templates() -> TestResult {
    let env = default_env()?.with_user_config(&serde_json::json!({}))?;
    let os = MockOs::new().input("d1");
    let handle = os.handle();

    run_cdt(&env, os).await?;

    let output = handle.output();
    assert!(output.contains("'debug_command' is not specified in "));
    assert!(output.contains("'execute_in_new_terminal_tab_command' is not specified in "));
    assert!(handle.cmds_executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn debug_wraps_command_in_templates() -> TestResult {
    let env = default_env()?;
    let os = MockOs::new().input("d2");
    let handle = os.handle();

    run_cdt(&env, os).await?;

    let cmds = handle.cmds_executed();
    assert_eq!(cmds.last().map(String::as_str), Some("terminal -- gdb --args echo primary task"));
    // Pre-tasks run as usual.
    assert_eq!(cmds[0], "echo pre pre task 1");
    assert_in_order(
        &handle.output(),
        &[&magenta("Debugger started"), &complete("primary task")],
    );
    Ok(())
}
