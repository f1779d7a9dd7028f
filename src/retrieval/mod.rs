//! Document retrieval seam.
//!
//! The ingestion side (chunking, embedding, vector upsert) lives outside this
//! service; the orchestrator only consumes ranked passages for a query.

mod http;

pub use http::HttpRetriever;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A retrieved text passage with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub score: f32,
}

/// Errors from the retrieval backend.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("retrieval api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("retrieval timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Semantic search over the ingested document corpus.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the top-`k` passages for `query`, highest score first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError>;
}
