//! # Ragify Core
//!
//! Runtime-agnostic building blocks for ragify's retrieval-augmented chat:
//! data models, the overlapping text chunker, the embedding and generation
//! capability traits, the [`VectorStore`](store::VectorStore) trait with an
//! in-memory implementation, prompt assembly, the greeting fast-path, and
//! the chat transcript.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem code. Concrete
//! providers and the SQLite-backed store live in the `ragify` app crate.
//!
//! ```text
//! text ──▶ chunk ──▶ Embedder ──▶ VectorStore ◀── query vector ◀── question
//!                                     │
//!                                     ▼
//!                          prompt::build_prompt ──▶ Generator ──▶ answer
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod greeting;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod session;
pub mod store;
