//! # ragify
//!
//! Retrieval-augmented chat over uploaded documents.
//!
//! A PDF is saved under the uploads directory, its text is extracted,
//! chunked, embedded and stored in a vector store. Questions are embedded,
//! matched against the store, and sent with the best passages to a
//! language model. Greetings get a canned reply without any of that.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────┐   ┌─────────────┐
//! │  Upload  │──▶│ Indexer            │──▶│ VectorStore │
//! │ PDF/DOCX │   │ extract+chunk+embed│   │ SQLite/mem  │
//! └──────────┘   └────────────────────┘   └──────┬──────┘
//!                                                │
//!                      ┌─────────────────────────┤
//!                      ▼                         ▼
//!                 ┌──────────┐  ask  ┌──────────────────────┐
//!                 │ChatShell │──────▶│ Responder            │
//!                 │ CLI/HTTP │       │ retrieve+prompt+LLM  │
//!                 └──────────┘       └──────────────────────┘
//! ```
//!
//! Pure logic (chunking, prompt assembly, the store trait, transcripts)
//! lives in `ragify-core`; this crate adds I/O.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Indexing, answering, and upload errors |
//! | [`extract`] | PDF / DOCX / text extraction |
//! | [`embedding`] | OpenAI, Ollama, and local embedders |
//! | [`llm`] | OpenAI-compatible and Ollama generators |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`store`] | Store selection |
//! | [`ingest`] | Indexer |
//! | [`answer`] | Responder |
//! | [`uploads`] | Upload directory |
//! | [`shell`] | Chat shell |
//! | [`session`] | Session registry |
//! | [`server`] | HTTP server |

pub mod answer;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod server;
pub mod session;
pub mod shell;
pub mod sqlite_store;
pub mod store;
pub mod uploads;
