#![allow(dead_code)]

use std::time::Duration;

pub use webdag_test_utils::builders::{ConfigFileBuilder, ProjectDir};
pub use webdag_test_utils::recording::{Recorder, recording_orchestrator, recording_table};
pub use webdag_test_utils::{init_tracing, with_timeout};

/// Give spawned listeners a moment to drain their channel.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
