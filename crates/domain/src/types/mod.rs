//! Domain types and models
//!
//! Provider-agnostic shapes for the payloads the agents exchange with
//! Microsoft Graph, Google and Spotify, plus the action schemas emitted by
//! the dispatcher.

pub mod actions;
pub mod calendar;
pub mod email;
pub mod music;

pub use actions::*;
pub use calendar::*;
pub use email::*;
pub use music::*;
