pub mod builders;
pub mod gtest_output;
pub mod mock_os;

use std::sync::Once;

use cdt::engine::Runtime;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use crate::builders::TestEnv;
use crate::mock_os::MockOs;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Initialise a runtime for `env` on top of `os`, the same way `cdt::run`
/// does for the real OS.
pub fn init_runtime(env: &TestEnv, os: MockOs) -> cdt::errors::Result<Runtime<MockOs>> {
    let (tx, rx) = mpsc::unbounded_channel();
    os.set_event_sender(tx.clone());
    let os = os.home(&env.home).cwd(env.dir.path());
    Runtime::init(os, &env.tasks_config, tx, rx)
}

/// Initialise a runtime and run it until the scripted input is exhausted.
pub async fn run_cdt(env: &TestEnv, os: MockOs) -> cdt::errors::Result<()> {
    init_tracing();
    let mut runtime = init_runtime(env, os)?;
    with_timeout(runtime.run()).await
}
