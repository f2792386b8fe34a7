//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use tempfile::TempDir;
use wad_server::config::{AppState, ServerConfig};

/// Lowest cost bcrypt accepts
pub const TEST_BCRYPT_COST: u32 = 4;

/// State backed by a fresh temp directory. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn test_state() -> (TempDir, AppState) {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::with_base_dir(dir.path());
    config.bcrypt_cost = TEST_BCRYPT_COST;
    config.bind_addr = "127.0.0.1:0".parse().unwrap();

    let state = wad_server::build_state(config).await.unwrap();
    (dir, state)
}

/// Poll `check` until it holds, failing the test after a few seconds
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}
