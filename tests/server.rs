//! HTTP server tests over a real socket.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use ragify::config::{Config, StoreBackend, DEFAULT_GREETING_REPLY, DEFAULT_WELCOME_MESSAGE};
use ragify::server;
use ragify::shell::ChatShell;
use ragify_core::embedding::Embedder;
use ragify_core::error::{EmbeddingError, GenerationError};
use ragify_core::llm::{Generator, Prompt};
use ragify_core::store::memory::InMemoryStore;

/// Two-dimensional embedding: does the text mention "warranty" or not.
struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    fn model_name(&self) -> &str {
        "topic"
    }

    fn dims(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("warranty") {
                    vec![1.0, 0.1]
                } else {
                    vec![0.1, 1.0]
                }
            })
            .collect())
    }
}

/// Answers with a fixed sentence, or fails for questions containing "fail".
struct ScriptedGenerator;

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        if prompt.user.contains("fail") {
            return Err(GenerationError::Unreachable("model offline".into()));
        }
        Ok("The warranty lasts 24 months.".to_string())
    }
}

fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

async fn start_server() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.store.backend = StoreBackend::Memory;
    config.uploads.dir = tmp.path().join("uploaded_files");
    config.uploads.max_bytes = 64 * 1024;

    let shell = ChatShell::new(
        &config,
        Arc::new(InMemoryStore::new()),
        Arc::new(TopicEmbedder),
        Arc::new(ScriptedGenerator),
    )
    .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server::serve(listener, Arc::new(shell)).await.unwrap();
    });

    (tmp, format!("http://{}", addr))
}

async fn create_session(client: &reqwest::Client, base: &str) -> String {
    let resp = client
        .post(format!("{}/sessions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_version() {
    let (_tmp, base) = start_server().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn session_starts_with_welcome_message() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/sessions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["messages"][0]["role"], "assistant");
    assert_eq!(body["messages"][0]["content"], DEFAULT_WELCOME_MESSAGE);
}

#[tokio::test]
async fn upload_then_ask_returns_grounded_answer() {
    let (tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/documents/manual.pdf", base))
        .body(minimal_pdf("Warranty: coverage lasts 24 months."))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["source"], "manual.pdf");
    assert_eq!(report["indexed"], 1);
    assert!(tmp.path().join("uploaded_files").join("manual.pdf").exists());

    let id = create_session(&client, &base).await;
    let resp = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .json(&serde_json::json!({ "content": "What is the warranty period?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"]["role"], "assistant");
    assert_eq!(body["message"]["content"], "The warranty lasts 24 months.");
    assert_eq!(body["grounded"], true);
    assert_eq!(body["sources"][0]["metadata"]["source"], "manual.pdf");

    let transcript: Value = client
        .get(format!("{}/sessions/{}/messages", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(transcript["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn greeting_gets_canned_reply() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let body: Value = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .json(&serde_json::json!({ "content": "Hey!" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"]["content"], DEFAULT_GREETING_REPLY);
    assert_eq!(body["grounded"], false);
}

#[tokio::test]
async fn generation_failure_is_502_and_keeps_user_turn() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .json(&serde_json::json!({ "content": "please fail now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "generation_failed");
    assert!(body["error"]["message"].as_str().unwrap().starts_with("Sorry"));

    let transcript: Value = client
        .get(format!("{}/sessions/{}/messages", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "please fail now");
}

#[tokio::test]
async fn corrupt_upload_is_unprocessable() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/documents/broken.pdf", base))
        .body("definitely not a pdf")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "extraction_failed");
}

#[tokio::test]
async fn upload_validation_errors() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/documents/notes.txt", base))
        .body("plain text")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .put(format!("{}/documents/huge.pdf", base))
        .body(vec![b'x'; 65 * 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "payload_too_large");
}

#[tokio::test]
async fn reset_clears_store() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();

    client
        .put(format!("{}/documents/manual.pdf", base))
        .body(minimal_pdf("Warranty: coverage lasts 24 months."))
        .send()
        .await
        .unwrap();

    let resp = client.post(format!("{}/reset", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let id = create_session(&client, &base).await;
    let body: Value = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .json(&serde_json::json!({ "content": "What is the warranty period?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["grounded"], false);
    assert!(body["sources"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleted_and_unknown_sessions_are_not_found() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .delete(format!("{}/sessions/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("{}/sessions/{}/messages", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client
        .get(format!("{}/sessions/not-a-uuid/messages", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn empty_question_is_bad_request() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .json(&serde_json::json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn malformed_question_body_gets_json_error() {
    let (_tmp, base) = start_server().await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());

    let resp = client
        .post(format!("{}/sessions/{}/messages", base, id))
        .body("{\"content\": \"hi\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}
