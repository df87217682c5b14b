//! # ragify CLI
//!
//! ## Usage
//!
//! ```bash
//! ragify --config ./config/ragify.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragify init` | Create the SQLite database and run schema migrations |
//! | `ragify upload <file.pdf>` | Copy a PDF into the uploads directory and index it |
//! | `ragify index <file>` | Index a PDF, DOCX, text, or markdown file in place |
//! | `ragify ask "<question>"` | Answer one question |
//! | `ragify chat` | Interactive chat session on stdin |
//! | `ragify reset` | Clear the vector store |
//! | `ragify stats` | Show indexed documents and chunk counts |
//! | `ragify serve` | Start the HTTP chat server |
//!
//! Logging goes to stderr and is controlled by `RAGIFY_LOG` (an `EnvFilter`
//! directive such as `ragify=debug`) or by `-v` / `-q`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use ragify::answer::Answer;
use ragify::config::{self, Config, StoreBackend};
use ragify::ingest::IndexReport;
use ragify::server;
use ragify::shell::ChatShell;
use ragify::sqlite_store::SqliteStore;
use ragify_core::store::VectorStore;

/// ragify: chat with your PDFs.
///
/// Upload documents, index them into a vector store, and ask questions that
/// are answered from the retrieved passages by a language model.
#[derive(Parser)]
#[command(
    name = "ragify",
    about = "ragify: smarter Q&A over your PDFs, fewer hallucinations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragify.toml")]
    config: PathBuf,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Save a PDF under the uploads directory, then index it.
    Upload {
        /// PDF file to upload.
        file: PathBuf,
    },

    /// Index a document without copying it.
    Index {
        /// File to index (.pdf, .docx, .txt, .md).
        path: PathBuf,
    },

    /// Answer a single question.
    Ask {
        question: String,

        /// Print the retrieved passages after the answer.
        #[arg(long)]
        sources: bool,
    },

    /// Interactive chat. Type `/upload <file>`, `/reset`, or `/quit`.
    Chat,

    /// Remove every indexed chunk from the vector store.
    Reset,

    /// Show what is indexed.
    Stats,

    /// Start the HTTP chat server on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("RAGIFY_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            if cfg.store.backend == StoreBackend::Memory {
                println!("Store backend is 'memory'; nothing to initialize.");
            } else {
                let store = SqliteStore::open(&cfg.store.path).await?;
                store.close().await;
                println!("Database initialized at {}", cfg.store.path.display());
            }
        }
        Commands::Upload { file } => {
            let shell = ChatShell::from_config(&cfg).await?;
            let report = upload_file(&shell, &file).await?;
            print_report(&report);
        }
        Commands::Index { path } => {
            let shell = ChatShell::from_config(&cfg).await?;
            let report = shell
                .indexer()
                .index_path(&path)
                .await
                .with_context(|| format!("Failed to index {}", path.display()))?;
            print_report(&report);
        }
        Commands::Ask { question, sources } => {
            let shell = ChatShell::from_config(&cfg).await?;
            let mut transcript = shell.new_transcript();
            match shell.ask(&mut transcript, &question).await {
                Ok(answer) => print_answer(&answer, sources),
                Err(e) => bail!(ChatShell::apology(&e)),
            }
        }
        Commands::Chat => {
            let shell = ChatShell::from_config(&cfg).await?;
            run_chat(&shell).await?;
        }
        Commands::Reset => {
            let shell = ChatShell::from_config(&cfg).await?;
            shell.reset().await?;
            println!("Vector store cleared.");
        }
        Commands::Stats => print_stats(&cfg).await?,
        Commands::Serve => server::run_server(&cfg).await?,
    }

    Ok(())
}

async fn upload_file(shell: &ChatShell, file: &Path) -> anyhow::Result<IndexReport> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("not a file: {}", file.display()))?;
    let report = shell.upload(&name, &bytes).await?;
    Ok(report)
}

fn print_report(report: &IndexReport) {
    println!("indexed {}", report.source);
    println!("  document:  {}", report.document_id);
    println!("  chunks:    {}", report.chunks);
    println!("  new:       {}", report.indexed);
    println!("  skipped:   {}", report.skipped);
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", answer.text);
    if show_sources && !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, hit) in answer.sources.iter().enumerate() {
            println!(
                "  [{}] {} (part {}) score {:.3}",
                i + 1,
                hit.metadata.source,
                hit.metadata.chunk_index + 1,
                hit.score
            );
        }
    }
}

async fn print_stats(cfg: &Config) -> anyhow::Result<()> {
    if cfg.store.backend == StoreBackend::Memory {
        println!("Store backend is 'memory'; it is empty at startup.");
        return Ok(());
    }
    let store = SqliteStore::open(&cfg.store.path).await?;
    let total = store.len().await?;
    let sources = store.sources().await?;

    println!("Store: {}", cfg.store.path.display());
    println!("  documents: {}", sources.len());
    println!("  chunks:    {}", total);
    for s in &sources {
        let short_id = &s.document_id[..12.min(s.document_id.len())];
        println!("  {:<40} {:>6} chunks  {}", s.source, s.entries, short_id);
    }
    store.close().await;
    Ok(())
}

async fn run_chat(shell: &ChatShell) -> anyhow::Result<()> {
    let mut transcript = shell.new_transcript();
    if let Some(welcome) = transcript.last() {
        println!("assistant> {}", welcome.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input == "/quit" || input == "/exit" {
            break;
        }
        if input == "/reset" {
            match shell.reset().await {
                Ok(()) => println!("Vector database cleared."),
                Err(e) => println!("Could not clear the vector database: {}", e),
            }
            continue;
        }
        if let Some(path) = input.strip_prefix("/upload ") {
            match upload_file(shell, Path::new(path.trim())).await {
                Ok(report) => println!(
                    "File '{}' indexed successfully ({} new chunks, {} already indexed).",
                    report.source, report.indexed, report.skipped
                ),
                Err(e) => println!("Error indexing file: {:#}", e),
            }
            continue;
        }

        match shell.ask(&mut transcript, input).await {
            Ok(answer) => println!("assistant> {}", answer.text),
            Err(e) => println!("assistant> {}", ChatShell::apology(&e)),
        }
    }

    Ok(())
}
