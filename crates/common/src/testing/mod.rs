//! Testing utilities for crates built on the OAuth core
//!
//! - **[`mocks`]**: in-memory token store and a scripted OAuth client
//! - **[`temp`]**: self-cleaning temp directories for on-disk caches
//! - [`poll_until`]: wait for a background task to reach a condition

pub mod mocks;
pub mod temp;

use std::future::Future;
use std::time::Duration;

pub use mocks::{InMemoryTokenStore, MockOAuthClient};
pub use temp::TempDir;

/// Polls `condition` every `interval` until it holds or `timeout` elapses.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }

    false
}
