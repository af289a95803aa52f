//! Photo montage agent: validation in front of the montage process

use std::sync::Arc;

use actionarc_domain::{parse_action, ActionResult, MontageAction, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::Agent;
use crate::ports::MontageHost;

const ACTIONS: &[&str] =
    &["createMontage", "addPhotos", "removePhotos", "showMontage", "deleteMontage", "listMontages"];

pub struct MontageAgent {
    host: Arc<dyn MontageHost>,
}

impl MontageAgent {
    pub fn new(host: Arc<dyn MontageHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Agent for MontageAgent {
    fn name(&self) -> &'static str {
        "montage"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: Value) -> Result<ActionResult> {
        let action: MontageAction = parse_action(action)?;
        action.validate()?;
        debug!(?action, "forwarding montage action");
        self.host.send(&action).await
    }
}
