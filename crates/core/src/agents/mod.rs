//! Agents: typed action handlers over the ports
//!
//! Each agent decodes `{ "actionName", "parameters" }` into its own action
//! enum and answers with an [`ActionResult`]. Agents hold no provider
//! specifics; everything external goes through `crate::ports`.

pub mod calendar;
pub mod email;
pub mod montage;
pub mod player;
pub mod taskflow;

use std::sync::Arc;

use actionarc_domain::{ActionResult, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub use calendar::CalendarAgent;
pub use email::EmailAgent;
pub use montage::MontageAgent;
pub use player::PlayerAgent;
pub use taskflow::TaskFlowAgent;

#[async_trait]
pub trait Agent: Send + Sync {
    /// Routing prefix, e.g. `"calendar"` in `"calendar.addEvent"`.
    fn name(&self) -> &'static str;

    /// Action names this agent understands, for help output.
    fn action_names(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, action: Value) -> Result<ActionResult>;
}

/// Source of "now"; swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
