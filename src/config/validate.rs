// src/config/validate.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::DfsPostOrder;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::model::{ConfigErrors, RawTasksFile, Task, TasksConfig};

const GTEST_PREFIX: &str = "__gtest";
const RESTART_PREFIX: &str = "__restart";

impl TryFrom<RawTasksFile> for TasksConfig {
    type Error = ConfigErrors;

    fn try_from(raw: RawTasksFile) -> std::result::Result<Self, Self::Error> {
        let mut errors = Vec::new();
        let Some(Value::Array(items)) = raw.cdt_tasks else {
            return Err(ConfigErrors(vec![
                "'cdt_tasks': must be an array of task objects".to_string(),
            ]));
        };

        let tasks = read_tasks(&items, &mut errors);
        validate_unique_names(&tasks, &mut errors);
        let direct = resolve_pre_task_names(&tasks, &mut errors);
        let names: Vec<&str> = tasks.iter().flatten().map(|t| t.name.as_str()).collect();
        let (pre_tasks, cycle_errors) = flatten_pre_tasks(&names, &direct);
        errors.extend(cycle_errors);

        if !errors.is_empty() {
            return Err(ConfigErrors(errors));
        }

        let tasks: Vec<Task> = tasks.into_iter().flatten().collect();
        debug!(count = tasks.len(), "task config validated");
        Ok(TasksConfig::new_unchecked(tasks, pre_tasks))
    }
}

/// Read every task object. Invalid tasks keep their slot as `None` so that
/// later messages still use the position the user wrote them at.
fn read_tasks(items: &[Value], errors: &mut Vec<String>) -> Vec<Option<Task>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(obj) => read_task(i + 1, obj, errors),
            _ => {
                errors.push(format!("task #{}: must be an object", i + 1));
                None
            }
        })
        .collect()
}

fn read_task(number: usize, obj: &Map<String, Value>, errors: &mut Vec<String>) -> Option<Task> {
    let mut valid = true;
    let name = non_empty_string(obj.get("name"));
    if name.is_none() {
        errors.push(format!("task #{number}: 'name': must be a string"));
        valid = false;
    }
    let command = non_empty_string(obj.get("command"));
    if command.is_none() {
        errors.push(format!("task #{number}: 'command': must be a string"));
        valid = false;
    }
    let pre_tasks = match obj.get("pre_tasks") {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| n.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>(),
        Some(_) => None,
    };
    if pre_tasks.is_none() {
        errors.push(format!(
            "task #{number}: 'pre_tasks': must be an array of other task names"
        ));
        valid = false;
    }
    if !valid {
        return None;
    }

    let mut task = Task {
        name: name?,
        command: command?,
        is_gtest: flag(obj, "is_gtest"),
        is_restart: flag(obj, "is_restart"),
        pre_tasks: pre_tasks?,
    };
    migrate_legacy_command(&mut task);
    Some(task)
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// `"__gtest ./tests"` and `"__restart"` bodies predate the boolean flags.
fn migrate_legacy_command(task: &mut Task) {
    if let Some(rest) = task.command.strip_prefix(GTEST_PREFIX) {
        task.is_gtest = true;
        task.command = rest.trim().to_string();
    } else if let Some(rest) = task.command.strip_prefix(RESTART_PREFIX) {
        task.is_restart = true;
        task.command = rest.trim().to_string();
    }
}

fn validate_unique_names(tasks: &[Option<Task>], errors: &mut Vec<String>) {
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, task) in tasks.iter().enumerate() {
        if let Some(task) = task {
            by_name.entry(task.name.as_str()).or_default().push(i + 1);
        }
    }
    for (i, task) in tasks.iter().enumerate() {
        let Some(task) = task else { continue };
        let number = i + 1;
        for other in &by_name[task.name.as_str()] {
            if *other != number {
                errors.push(format!(
                    "task #{number}: name '{}' is already used by task #{other}",
                    task.name
                ));
            }
        }
    }
}

/// Map each task's pre-task names to indices among the valid tasks.
fn resolve_pre_task_names(tasks: &[Option<Task>], errors: &mut Vec<String>) -> Vec<Vec<usize>> {
    let valid: Vec<&Task> = tasks.iter().flatten().collect();
    let index_of: HashMap<&str, usize> = valid
        .iter()
        .enumerate()
        .rev()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut direct = Vec::with_capacity(valid.len());
    for (i, task) in tasks.iter().enumerate() {
        let Some(task) = task else { continue };
        let mut deps = Vec::new();
        for name in &task.pre_tasks {
            match index_of.get(name.as_str()) {
                Some(idx) => deps.push(*idx),
                None => errors.push(format!(
                    "task #{}: references task '{name}' that does not exist",
                    i + 1
                )),
            }
        }
        direct.push(deps);
    }
    direct
}

/// Flatten every task's pre-task tree into a dependency-first list.
///
/// Each pre-task appears once, at the first position something needs it.
/// Pre-tasks of the same task keep the order they are listed in. A task
/// that reaches a cycle gets an empty chain and one error spelling out the
/// call stack as `a -> b -> a`.
///
/// `names` and `direct` are indexed the same way.
pub fn flatten_pre_tasks(names: &[&str], direct: &[Vec<usize>]) -> (Vec<Vec<usize>>, Vec<String>) {
    // Edge direction: task -> pre-task. The post-order walk explores the
    // most recently added edge first, so pre-tasks are added last to first.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for task in 0..direct.len() {
        graph.add_node(task);
    }
    for (task, deps) in direct.iter().enumerate() {
        let mut seen = HashSet::new();
        let deps: Vec<usize> = deps.iter().copied().filter(|d| seen.insert(*d)).collect();
        for dep in deps.into_iter().rev() {
            graph.add_edge(task, dep, ());
        }
    }

    let on_cycle: HashSet<usize> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();

    let mut chains = Vec::with_capacity(direct.len());
    let mut errors = Vec::new();
    for root in 0..direct.len() {
        let mut walk = DfsPostOrder::new(&graph, root);
        let mut chain = Vec::new();
        let mut reaches_cycle = false;
        while let Some(task) = walk.next(&graph) {
            reaches_cycle |= on_cycle.contains(&task);
            if task != root {
                chain.push(task);
            }
        }
        if reaches_cycle {
            if let Some(path) = cycle_call_stack(root, direct) {
                let path: Vec<&str> = path.iter().map(|&t| names[t]).collect();
                errors.push(format!(
                    "task '{}' has a circular dependency in it's 'pre_tasks':\n{}",
                    names[root],
                    path.join(" -> ")
                ));
            }
            chain.clear();
        }
        chains.push(chain);
    }

    (chains, errors)
}

/// Walk the pre-tasks of `root` depth-first in listed order and return the
/// call stack at the first task that is entered while already on it.
fn cycle_call_stack(root: usize, direct: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut on_stack = vec![false; direct.len()];
    let mut done = vec![false; direct.len()];
    // (task, index of its next pre-task to enter)
    let mut stack = vec![(root, 0)];
    on_stack[root] = true;

    while let Some((task, next)) = stack.last_mut() {
        let task = *task;
        let Some(&pre_task) = direct[task].get(*next) else {
            on_stack[task] = false;
            done[task] = true;
            stack.pop();
            continue;
        };
        *next += 1;
        if on_stack[pre_task] {
            let mut path: Vec<usize> = stack.iter().map(|(t, _)| *t).collect();
            path.push(pre_task);
            return Some(path);
        }
        if !done[pre_task] {
            on_stack[pre_task] = true;
            stack.push((pre_task, 0));
        }
    }
    None
}
