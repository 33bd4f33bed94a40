#![allow(dead_code)]

use cdt::output::colors::{BLUE, GREEN, MAGENTA, RED, RESET};
use cdt_test_utils::builders::{TaskBuilder, TasksFileBuilder, TestEnv};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn red(s: &str) -> String {
    format!("{RED}{s}{RESET}")
}

pub fn green(s: &str) -> String {
    format!("{GREEN}{s}{RESET}")
}

pub fn magenta(s: &str) -> String {
    format!("{MAGENTA}{s}{RESET}")
}

pub fn running(name: &str) -> String {
    magenta(&format!("Running \"{name}\""))
}

pub fn running_pre_task(name: &str) -> String {
    format!("{BLUE}Running \"{name}\"...{RESET}")
}

pub fn complete(name: &str) -> String {
    magenta(&format!("'{name}' complete: return code: 0"))
}

pub fn failed(name: &str, code: i32) -> String {
    red(&format!("'{name}' failed: return code: {code}"))
}

/// Assert that `needles` show up in `haystack` in this order.
pub fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut rest = haystack;
    for needle in needles {
        match rest.find(needle) {
            Some(i) => rest = &rest[i + needle.len()..],
            None => panic!("{needle:?} not found in order in output:\n{haystack}"),
        }
    }
}

/// A project with a plain task chain, a google test task and a restart.
///
/// 1 "hello world" (`echo hello world`)
/// 2 "primary task" after "pre task 1" and "pre task 2"
/// 3 "pre task 1" after "pre pre task 1" and "pre pre task 2"
/// 4 "pre task 2"
/// 5 "pre pre task 1"
/// 6 "pre pre task 2"
/// 7 "run tests", google tests in `./tests`, after "pre task 2"
/// 8 "restart"
pub fn default_env() -> anyhow::Result<TestEnv> {
    let tasks = TasksFileBuilder::new()
        .with_task(TaskBuilder::new("hello world", "echo hello world"))
        .with_task(
            TaskBuilder::new("primary task", "echo primary task")
                .pre_tasks(&["pre task 1", "pre task 2"]),
        )
        .with_task(
            TaskBuilder::new("pre task 1", "echo pre task 1")
                .pre_tasks(&["pre pre task 1", "pre pre task 2"]),
        )
        .with_task(TaskBuilder::new("pre task 2", "echo pre task 2"))
        .with_task(TaskBuilder::new("pre pre task 1", "echo pre pre task 1"))
        .with_task(TaskBuilder::new("pre pre task 2", "echo pre pre task 2"))
        .with_task(
            TaskBuilder::new("run tests", "./tests")
                .gtest()
                .pre_tasks(&["pre task 2"]),
        )
        .with_task(TaskBuilder::new("restart", "restart").restart())
        .build();
    TestEnv::new(&tasks)?.with_full_user_config()
}
