//! # ActionArc App
//!
//! Composition root and command-line front end.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Action dispatcher routing `"<agent>.<actionName>"` to agents
//! - CLI commands and logging setup
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod cli;
pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod utils;

// Re-export for convenience
pub use context::*;
pub use dispatcher::ActionDispatcher;
