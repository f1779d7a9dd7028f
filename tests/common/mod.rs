//! Common test utilities.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use parley::booking::{BookingEngine, MemoryBookingStore};
use parley::config::BookingPolicy;
use parley::conversation::{
    AnswerGenerator, IntentClassifier, Orchestrator, OrchestratorSettings,
};
use parley::llm::{ChatRequest, ChatResponse, LlmError, LlmProvider};
use parley::retrieval::{Passage, RetrievalError, Retriever};
use parley::server::{self, AppState};
use parley::session::MemorySessionStore;

/// Provider whose answer depends on the request shape: classifier calls
/// (max_tokens = 5) get "OTHER", everything else gets a fixed answer.
pub struct ScriptedLlm;

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let content = if request.max_tokens == Some(5) {
            "OTHER"
        } else {
            "Here is what the documents say."
        };
        Ok(serde_json::from_str(&format!(
            r#"{{"id":"c","choices":[{{"index":0,"message":{{"role":"assistant","content":"{content}"}},"finish_reason":"stop"}}]}}"#
        ))
        .unwrap())
    }
}

pub struct StaticRetriever;

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Passage>, RetrievalError> {
        Ok(vec![Passage {
            text: "chunk".to_string(),
            score: 0.9,
        }])
    }
}

/// Create a test app backed by in-memory stores and a scripted provider.
pub fn test_app() -> Router {
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm);
    let classifier =
        IntentClassifier::new(provider.clone(), "m".to_string(), Duration::from_secs(5));
    let generator =
        AnswerGenerator::new(provider, "m".to_string(), None, None, Duration::from_secs(5));
    let booking = BookingEngine::new(
        Arc::new(MemoryBookingStore::new()),
        BookingPolicy::default(),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(MemorySessionStore::new()),
        Some(Arc::new(StaticRetriever)),
        classifier,
        generator,
        booking,
        OrchestratorSettings {
            session_ttl: Duration::from_secs(3600),
            history_window: 6,
            top_k: 5,
            retrieval_timeout: Duration::from_secs(5),
        },
    ));

    server::build_app(AppState { orchestrator }, 300)
}
