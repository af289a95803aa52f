//! # ActionArc Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Configuration loading (TOML/JSON files plus environment overrides)
//! - HTTP client with retry and backoff
//! - OAuth token managers and the loopback callback server
//! - Provider adapters (Microsoft Graph, Google, Spotify, OpenAI)
//! - Calendar sync worker, montage child process host, recipe loader
//!
//! ## Architecture
//! - Implements traits defined in `actionarc-core`
//! - Depends on `actionarc-domain`, `actionarc-common` and `actionarc-core`
//! - Contains all "impure" code (network, filesystem, child processes)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::*;
