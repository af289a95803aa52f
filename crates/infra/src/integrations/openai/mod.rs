/// OpenAI text embeddings for calendar subject search
///
/// `EmbeddingClient` calls `/v1/embeddings` through the retrying
/// [`HttpClient`](crate::http::HttpClient) and returns one vector per input,
/// in input order.
pub mod client;
pub mod types;

pub use client::EmbeddingClient;
