//! TOML configuration.
//!
//! Every section has defaults, so an empty file is a valid configuration
//! (in-process SQLite store, embeddings and LLM disabled). See
//! `config/ragify.example.toml` for a complete example.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ragify_core::chunk::ChunkParams;
use ragify_core::greeting::{GreetingFilter, GreetingMatch, DEFAULT_GREETING_KEYWORDS};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub uploads: UploadsConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("./data/ragify.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadsConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploaded_files"),
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by neighbouring chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 80,
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.chunk_size, self.overlap).context("invalid [chunking] section")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Drop retrieved chunks scoring below this cosine similarity.
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `disabled`, `openai`, `ollama`, or `local`.
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    /// Base URL; provider-specific default when unset.
    pub url: Option<String>,
    /// Environment variable holding the API key (OpenAI-compatible providers).
    pub api_key_env: String,
    pub batch_size: usize,
    /// Extra attempts on 429/5xx/network errors. `0` fails immediately.
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size: 32,
            max_retries: 0,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// `disabled`, `openai`, or `ollama`.
    pub provider: String,
    pub model: Option<String>,
    pub url: Option<String>,
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
    /// Remove `<think>…</think>` blocks emitted by reasoning models.
    pub strip_reasoning: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: None,
            timeout_secs: 120,
            strip_reasoning: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// First assistant message of every session.
    pub welcome_message: String,
    /// Canned reply for greeting inputs.
    pub greeting_reply: String,
    pub greeting_keywords: Vec<String>,
    pub greeting_match: GreetingMatch,
}

pub const DEFAULT_WELCOME_MESSAGE: &str = "Welcome, get ready to be mind blown by AI";

pub const DEFAULT_GREETING_REPLY: &str = "🌟 Hello and welcome to the DeepSeek Chatbot!\n\n\
I'm your AI-powered assistant built on Retrieval-Augmented Generation (RAG), here to help you \
navigate knowledge with ease.\n\
📚 Just drop in your question \u{2014} whether it's from uploaded documents or your own curiosity \
\u{2014} and I'll dig deep to get you a smart, grounded answer.\n\n\
Ask me anything to get started! 🚀";

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            greeting_reply: DEFAULT_GREETING_REPLY.to_string(),
            greeting_keywords: DEFAULT_GREETING_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            greeting_match: GreetingMatch::Substring,
        }
    }
}

impl ChatConfig {
    pub fn greeting_filter(&self) -> GreetingFilter {
        GreetingFilter::new(&self.greeting_keywords, self.greeting_match)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    config.chunking.params()?;

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if let Some(min) = config.retrieval.min_score {
        if !(-1.0..=1.0).contains(&min) {
            bail!("retrieval.min_score must be in [-1.0, 1.0]");
        }
    }

    if config.uploads.max_bytes == 0 {
        bail!("uploads.max_bytes must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.provider != "local" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.llm.provider != "disabled" && config.llm.model.is_none() {
        bail!(
            "llm.model must be specified when provider is '{}'",
            config.llm.provider
        );
    }

    if config
        .chat
        .greeting_keywords
        .iter()
        .any(|k| k.trim().is_empty())
    {
        bail!("chat.greeting_keywords must not contain empty strings");
    }

    Ok(())
}
