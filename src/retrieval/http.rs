//! HTTP adapter for an external retrieval service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Passage, RetrievalError, Retriever};

/// Calls a retrieval endpoint that embeds the query and searches the vector
/// index on our behalf: `POST {base_url}/search {"query", "top_k"}`.
pub struct HttpRetriever {
    client: Client,
    base_url: String,
}

impl HttpRetriever {
    #[must_use]
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    text: String,
    score: f32,
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest { query, top_k: k })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Api { status, message });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .map(|hit| Passage {
                text: hit.text,
                score: hit.score,
            })
            .collect())
    }
}
