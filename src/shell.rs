//! Chat shell: the boundary between users and the pipeline.
//!
//! Owns one store shared by the [`Indexer`] and the [`Responder`] and turns
//! pipeline errors into messages a user can read. Transcripts are owned by
//! the caller (one per session); the shell only appends to them.

use std::sync::Arc;

use anyhow::Result;

use ragify_core::embedding::Embedder;
use ragify_core::error::StoreError;
use ragify_core::llm::Generator;
use ragify_core::session::Transcript;
use ragify_core::store::VectorStore;

use crate::answer::{Answer, Responder};
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::error::{AnswerError, UploadFlowError};
use crate::ingest::{IndexReport, Indexer};
use crate::llm::create_generator;
use crate::store::open_store;
use crate::uploads::UploadDir;

pub struct ChatShell {
    store: Arc<dyn VectorStore>,
    indexer: Indexer,
    responder: Responder,
    uploads: UploadDir,
    welcome: String,
}

impl ChatShell {
    /// Build the shell with the providers and store named by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = open_store(&config.store).await?;
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.llm)?;
        Self::new(config, store, embedder, generator)
    }

    /// Build the shell around explicit capabilities.
    pub fn new(
        config: &Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let indexer = Indexer::new(
            store.clone(),
            embedder.clone(),
            config.chunking.params()?,
            config.embedding.batch_size,
        );
        let responder = Responder::new(
            store.clone(),
            embedder,
            generator,
            config.chat.greeting_filter(),
            config.chat.greeting_reply.clone(),
            config.retrieval.top_k,
        )
        .with_min_score(config.retrieval.min_score);

        Ok(Self {
            store,
            indexer,
            responder,
            uploads: UploadDir::new(&config.uploads.dir, config.uploads.max_bytes),
            welcome: config.chat.welcome_message.clone(),
        })
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn uploads(&self) -> &UploadDir {
        &self.uploads
    }

    /// A fresh transcript holding only the welcome message.
    pub fn new_transcript(&self) -> Transcript {
        Transcript::new(self.welcome.clone())
    }

    /// Save an uploaded PDF, then index it.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<IndexReport, UploadFlowError> {
        let path = self.uploads.save(filename, bytes).await?;
        let report = self.indexer.index_path(&path).await?;
        Ok(report)
    }

    /// Drop every indexed chunk. Uploaded files stay on disk.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.clear().await?;
        tracing::info!("vector store cleared");
        Ok(())
    }

    /// Record `input` as a user turn and answer it.
    ///
    /// On success exactly one assistant turn is appended. On failure the
    /// user turn stays and no assistant turn is added; render the error with
    /// [`ChatShell::apology`].
    pub async fn ask(&self, transcript: &mut Transcript, input: &str) -> Result<Answer, AnswerError> {
        transcript.push_user(input);
        match self.responder.answer(input).await {
            Ok(answer) => {
                transcript.push_assistant(answer.text.clone());
                Ok(answer)
            }
            Err(err) => {
                tracing::warn!(error = %err, "question failed");
                Err(err)
            }
        }
    }

    /// User-facing text for a failed question.
    pub fn apology(err: &AnswerError) -> String {
        let what = match err {
            AnswerError::Embedding(_) => "I couldn't reach the embedding service",
            AnswerError::Store(_) => "I couldn't search the uploaded documents",
            AnswerError::Generation(_) => "I couldn't get an answer from the language model",
        };
        format!("Sorry, {} ({}). Please try again.", what, err)
    }
}
