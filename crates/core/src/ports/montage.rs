//! Photo montage host port

use actionarc_domain::{ActionResult, MontageAction, Result};
use async_trait::async_trait;

/// Executes montage actions in the external montage process.
#[async_trait]
pub trait MontageHost: Send + Sync {
    async fn send(&self, action: &MontageAction) -> Result<ActionResult>;
}
