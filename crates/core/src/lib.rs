//! # ActionArc Core
//!
//! Provider-independent agent logic.
//!
//! This crate contains:
//! - Port interfaces (traits) for calendar, mail, music, embeddings,
//!   montage and taste persistence
//! - Matching heuristics and pagination helpers
//! - The calendar working-set cache and embedding index
//! - The agents and the TaskFlow recipe interpreter
//!
//! ## Architecture Principles
//! - Only depends on `actionarc-domain`
//! - No HTTP, filesystem or process code
//! - All external dependencies via traits

pub mod agents;
pub mod calendar;
pub mod matching;
pub mod pagination;
pub mod ports;
pub mod taskflow;
pub mod taste;

pub use agents::{
    Agent, CalendarAgent, Clock, EmailAgent, MontageAgent, PlayerAgent, TaskFlowAgent,
};
pub use calendar::{
    shared_cache, shared_index, CacheDiff, EmbeddingIndex, EventCache, SharedEmbeddingIndex,
    SharedEventCache,
};
pub use pagination::{get_k, get_k_cursor, Page};
pub use ports::{
    AccessTokenSource, CalendarProvider, Embedder, EmailProvider, MontageHost, MusicService,
    PlayRequest, TasteStore,
};
pub use taskflow::{Interpreter, Recipe, RecipeRun, StepExecutor};
pub use taste::UserTaste;
