pub mod gemini;
pub mod stream;

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

pub use gemini::GeminiClient;

/// One structured block of a streamed blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum StreamChunk {
    Html(String),
    ImageSuggestion(String),
}

/// Finite, single-use sequence of content chunks. A fresh request is needed to regenerate.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    // Plain text completion
    async fn generate(&self, prompt: &str) -> Result<String>;

    // Completion constrained to a response schema, parsed as JSON
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Value>;

    // Newline-delimited JSON chunk stream
    async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream>;
}
