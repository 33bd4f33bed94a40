// tests/process_supervision.rs
#![cfg(unix)]

use cdt::engine::{EventReceiver, ExecutionEvent};
use cdt::entity::{Entities, Entity};
use cdt::exec::spawn_supervised;
use cdt_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Collected {
    stdout: String,
    stderr: String,
    exit: Option<i32>,
}

async fn collect_until_exit(exec: Entity, rx: &mut EventReceiver) -> Collected {
    let mut collected = Collected::default();
    while let Some(event) = rx.recv().await {
        match event {
            ExecutionEvent::Stdout { exec: e, data } if e == exec => collected.stdout.push_str(&data),
            ExecutionEvent::Stderr { exec: e, data } if e == exec => collected.stderr.push_str(&data),
            ExecutionEvent::Exit { exec: e, code } if e == exec => {
                collected.exit = Some(code);
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    collected
}

#[tokio::test]
async fn output_and_exit_code_are_forwarded() {
    init_tracing();
    let exec = Entities::new().create();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _kill = spawn_supervised(exec, "echo out; echo err 1>&2; exit 3", tx).unwrap();
    let collected = with_timeout(collect_until_exit(exec, &mut rx)).await;

    assert_eq!(collected.stdout, "out\n");
    assert_eq!(collected.stderr, "err\n");
    assert_eq!(collected.exit, Some(3));
}

#[tokio::test]
async fn kill_reports_minus_one() {
    init_tracing();
    let exec = Entities::new().create();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let kill = spawn_supervised(exec, "echo started; exec sleep 30", tx).unwrap();
    let first = with_timeout(rx.recv()).await;
    assert_eq!(
        first,
        Some(ExecutionEvent::Stdout {
            exec,
            data: "started\n".to_string()
        })
    );
    kill.send(()).unwrap();
    let collected = with_timeout(collect_until_exit(exec, &mut rx)).await;

    assert_eq!(collected.exit, Some(-1));
}

#[tokio::test]
async fn character_split_between_writes_is_kept_whole() {
    init_tracing();
    let exec = Entities::new().create();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _kill = spawn_supervised(exec, r"printf 'ab\303'; sleep 0.3; printf '\251\n'", tx).unwrap();
    let collected = with_timeout(collect_until_exit(exec, &mut rx)).await;

    assert_eq!(collected.stdout, "ab\u{e9}\n");
    assert_eq!(collected.exit, Some(0));
}
