//! Answer generation for the document Q&A path.
//!
//! Builds the chat request from the query, the retrieved passages, and a
//! window of recent turns, then calls the LLM provider with a deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::llm::{ChatRequest, LlmError, LlmProvider, Message, Role};
use crate::retrieval::Passage;
use crate::session::{Turn, TurnRole};

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about \
    the user's uploaded documents. Ground your answer in the provided context passages. \
    If the context does not contain the answer, say so plainly instead of guessing.";

pub struct AnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    call_timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model,
            temperature,
            max_tokens,
            call_timeout,
        }
    }

    /// Generate an answer for `query` supported by `passages` and recent
    /// `history`, oldest turn first.
    pub async fn generate(
        &self,
        query: &str,
        passages: &[Passage],
        history: &[Turn],
    ) -> Result<String, LlmError> {
        let request = ChatRequest::new(
            &self.model,
            build_messages(query, passages, history),
            self.temperature,
            self.max_tokens,
        );

        let response = timeout(self.call_timeout, self.provider.chat(request))
            .await
            .map_err(|_| LlmError::Timeout(self.call_timeout))??;

        response
            .first_content()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }
}

fn build_messages(query: &str, passages: &[Passage], history: &[Turn]) -> Vec<Message> {
    let mut system = String::from(ANSWER_SYSTEM_PROMPT);
    if passages.is_empty() {
        system.push_str("\n\nNo context passages were retrieved for this question.");
    } else {
        system.push_str("\n\nContext passages:");
        for (i, passage) in passages.iter().enumerate() {
            system.push_str(&format!("\n\n[{}] {}", i + 1, passage.text));
        }
    }

    let mut messages = vec![Message::system(system)];
    for turn in history {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        };
        messages.push(Message {
            role,
            content: turn.content.clone(),
        });
    }
    messages.push(Message::user(query));
    messages
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::llm::ChatResponse;
    use crate::session::Session;

    use super::*;

    struct Echo;

    #[async_trait]
    impl LlmProvider for Echo {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
            Ok(serde_json::from_str(
                r#"{"id":"c","choices":[{"index":0,"message":{"role":"assistant","content":"the answer"},"finish_reason":"stop"}]}"#,
            )
            .unwrap())
        }
    }

    struct Stuck;

    #[async_trait]
    impl LlmProvider for Stuck {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn passages() -> Vec<Passage> {
        vec![
            Passage {
                text: "Refunds are processed within 14 days.".to_string(),
                score: 0.92,
            },
            Passage {
                text: "Contact support for escalations.".to_string(),
                score: 0.71,
            },
        ]
    }

    #[test]
    fn messages_carry_context_history_and_query() {
        let mut session = Session::new("s1");
        session.push_turn(TurnRole::User, "earlier question");
        session.push_turn(TurnRole::Assistant, "earlier answer");

        let messages = build_messages("what about refunds?", &passages(), session.recent_turns(6));

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("[1] Refunds are processed"));
        assert!(messages[0].content.contains("[2] Contact support"));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages.last().unwrap().content, "what about refunds?");
    }

    #[test]
    fn empty_passages_are_stated_in_system_prompt() {
        let messages = build_messages("hi", &[], &[]);
        assert!(messages[0].content.contains("No context passages"));
    }

    #[tokio::test]
    async fn generate_returns_answer_text() {
        let generator = AnswerGenerator::new(
            Arc::new(Echo),
            "m".to_string(),
            None,
            None,
            Duration::from_secs(5),
        );
        let answer = generator.generate("q", &passages(), &[]).await.unwrap();
        assert_eq!(answer, "the answer");
    }

    #[tokio::test(start_paused = true)]
    async fn generate_times_out() {
        let generator = AnswerGenerator::new(
            Arc::new(Stuck),
            "m".to_string(),
            None,
            None,
            Duration::from_secs(30),
        );
        let err = generator.generate("q", &[], &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }
}
