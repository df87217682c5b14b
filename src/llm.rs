//! Concrete [`Generator`] implementations.
//!
//! Two wire formats are supported: OpenAI-compatible chat completions
//! (`POST {url}/chat/completions`) and Ollama chat (`POST {url}/api/chat`,
//! non-streaming). A disabled generator fails every call so a misconfigured
//! deployment reports an error instead of inventing answers.
//!
//! Generators make exactly one request per call; there is no retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ragify_core::error::GenerationError;
use ragify_core::llm::{Generator, Prompt};

use crate::config::LlmConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the generator selected by `llm.provider`.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

/// Remove `<think>...</think>` sections that reasoning models (DeepSeek-R1
/// and friends) prepend to their answer. An unterminated block swallows the
/// rest of the text.
pub fn strip_think_blocks(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        match rest[start..].find(CLOSE) {
            Some(end) => rest = &rest[start + end + CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Apply reasoning stripping and reject blank answers.
fn finish_answer(raw: String, strip_reasoning: bool) -> Result<String, GenerationError> {
    let text = if strip_reasoning {
        strip_think_blocks(&raw)
    } else {
        raw.trim().to_string()
    };
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

fn map_send_error(err: reqwest::Error, url: &str, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(timeout)
    } else {
        GenerationError::Unreachable(format!("{}: {}", url, err))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn chat_messages(prompt: &Prompt) -> Vec<ChatMessage<'_>> {
    vec![
        ChatMessage {
            role: "system",
            content: &prompt.system,
        },
        ChatMessage {
            role: "user",
            content: &prompt.user,
        },
    ]
}

// ============ OpenAI-compatible ============

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    /// Null for some reasoning models.
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

pub struct OpenAIGenerator {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: Option<f32>,
    strip_reasoning: bool,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for OpenAI provider"))?;
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| GenerationError::MissingApiKey {
                env_var: config.api_key_env.clone(),
            })?;
        let base = config.url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            model,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            temperature: config.temperature,
            strip_reasoning: config.strip_reasoning,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let request = OpenAIRequest {
            model: &self.model,
            messages: chat_messages(prompt),
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, &self.endpoint, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAIErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_send_error(e, &self.endpoint, self.timeout))?;
        let content = parse_openai_content(&body)?;
        finish_answer(content, self.strip_reasoning)
    }
}

fn parse_openai_content(body: &str) -> Result<String, GenerationError> {
    let parsed: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(GenerationError::EmptyResponse)
}

// ============ Ollama ============

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

/// Generator backed by a local Ollama model such as `deepseek-r1:7b`.
pub struct OllamaGenerator {
    model: String,
    endpoint: String,
    temperature: Option<f32>,
    strip_reasoning: bool,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Ollama provider"))?;
        let base = config.url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            model,
            endpoint: format!("{}/api/chat", base.trim_end_matches('/')),
            temperature: config.temperature,
            strip_reasoning: config.strip_reasoning,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let request = OllamaRequest {
            model: &self.model,
            messages: chat_messages(prompt),
            stream: false,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, &self.endpoint, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        finish_answer(parsed.message.content, self.strip_reasoning)
    }
}
