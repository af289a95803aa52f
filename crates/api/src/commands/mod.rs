//! CLI command handlers
//!
//! Handlers write user-facing output to the supplied writer; diagnostics go
//! through `tracing`.

pub mod actions;
pub mod auth;
pub mod sync;

pub use actions::{list_recipes, run_action};
pub use auth::{login, logout};
pub use sync::{serve, sync_now};
