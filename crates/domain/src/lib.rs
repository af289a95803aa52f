//! # ActionArc Domain
//!
//! Business domain types and models for ActionArc.
//!
//! This crate contains:
//! - Provider-agnostic DTOs (calendar events, mail messages, tracks)
//! - Agent action schemas emitted by the dispatcher
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other ActionArc crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
