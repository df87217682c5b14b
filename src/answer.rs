//! Question answering: greeting fast-path, retrieval, one model call.

use std::sync::Arc;

use serde::Serialize;

use ragify_core::embedding::Embedder;
use ragify_core::greeting::GreetingFilter;
use ragify_core::llm::Generator;
use ragify_core::models::ScoredChunk;
use ragify_core::prompt::build_prompt;
use ragify_core::store::VectorStore;

use crate::error::AnswerError;

/// An assistant reply and the context it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Retrieved chunks passed to the model, best first.
    pub sources: Vec<ScoredChunk>,
    /// Whether any context reached the prompt.
    pub grounded: bool,
    /// The canned greeting reply was returned without retrieval.
    pub greeting: bool,
}

pub struct Responder {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    greeting: GreetingFilter,
    greeting_reply: String,
    top_k: usize,
    min_score: Option<f32>,
}

impl Responder {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        greeting: GreetingFilter,
        greeting_reply: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            greeting,
            greeting_reply: greeting_reply.into(),
            top_k,
            min_score: None,
        }
    }

    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Answer `question`.
    ///
    /// Greetings short-circuit to the configured reply. Anything else is
    /// embedded, matched against the store, and sent to the model once; an
    /// empty store still produces a prompt, marked as having no context.
    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        if self.greeting.is_greeting(question) {
            tracing::debug!("greeting fast-path");
            return Ok(Answer {
                text: self.greeting_reply.clone(),
                sources: Vec::new(),
                grounded: false,
                greeting: true,
            });
        }

        let context = self.retrieve(question).await?;
        let prompt = build_prompt(question, &context);
        let text = self.generator.generate(&prompt).await?;

        tracing::info!(
            model = self.generator.model_name(),
            context_chunks = context.len(),
            "answered question"
        );

        Ok(Answer {
            text,
            grounded: !context.is_empty(),
            sources: context,
            greeting: false,
        })
    }

    /// Top-k chunks for `question`, after the `min_score` cut-off.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>, AnswerError> {
        let vector = self.embedder.embed(question).await?;
        let mut hits = self.store.query(&vector, self.top_k).await?;
        if let Some(min) = self.min_score {
            hits.retain(|h| h.score >= min);
        }
        tracing::debug!(
            hits = hits.len(),
            best = hits.first().map(|h| h.score),
            "retrieved context"
        );
        Ok(hits)
    }
}
