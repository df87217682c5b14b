//! Language-model capability trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenerationError;

/// A fully assembled prompt: system instructions plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Produces an answer for a prompt with a single model call.
///
/// Implementations do not retry; failures surface as [`GenerationError`].
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"deepseek-r1:7b"`).
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}
