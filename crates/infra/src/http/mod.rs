//! HTTP plumbing shared by the REST integrations

pub mod client;
pub mod response;

pub use client::{HttpClient, HttpClientBuilder};
pub use response::{ensure_success, read_json};
