//! Shared OAuth 2.0 infrastructure for ActionArc crates.
//!
//! # Feature Tiers
//!
//! - `auth` (default): token types, PKCE, token endpoint client, device-code
//!   flow, on-disk token cache and the refreshing token manager
//! - `test-utils`: in-memory token store, mock OAuth client and temp dir
//!   helpers for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "auth")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

#[cfg(feature = "auth")]
pub use auth::{
    FileTokenStore, OAuthClient, OAuthClientError, OAuthConfig, TokenManager, TokenManagerError,
    TokenSet, TokenStore, TokenStoreError,
};
