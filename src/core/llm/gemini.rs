use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::stream::{ChunkDecoder, SseFrameBuffer};
use super::{ChunkStream, StreamChunk, TextGenerator};
use crate::core::config::GeminiSettings;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

impl GenerationConfig {
    fn text() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: Some(40),
            response_mime_type: None,
            response_schema: None,
        }
    }

    fn json(schema: &Value) -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: None,
            response_mime_type: Some("application/json"),
            response_schema: Some(schema.clone()),
        }
    }

    fn streaming() -> Self {
        Self {
            temperature: 0.6,
            top_p: 0.95,
            top_k: Some(40),
            response_mime_type: None,
            response_schema: None,
        }
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResContent>,
}

#[derive(Deserialize)]
struct GeminiResContent {
    #[serde(default)]
    parts: Vec<GeminiResPart>,
}

#[derive(Deserialize)]
struct GeminiResPart {
    #[serde(default)]
    text: String,
}

impl GeminiResponse {
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default()
    }
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self, method: &str, extra_query: &str) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Gemini API key not set. Add it to config.toml or export GEMINI_API_KEY."
            ));
        }
        Ok(format!(
            "{}/models/{}:{}?{}key={}",
            self.base_url, self.model, method, extra_query, self.api_key
        ))
    }

    fn request(prompt: &str, generation_config: GenerationConfig) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
        }
    }

    async fn generate_content(&self, req: &GeminiRequest) -> Result<String> {
        let url = self.endpoint("generateContent", "")?;
        let res = self.client.post(&url).json(req).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(anyhow!(
                "Google Gemini API Error ({}): {}",
                status,
                res.text().await.unwrap_or_default()
            ));
        }
        let parsed: GeminiResponse = res.json().await?;
        Ok(parsed.into_text())
    }
}

/// Models occasionally fence JSON even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn decode_event(event: &str, decoder: &mut ChunkDecoder) -> Vec<StreamChunk> {
    match serde_json::from_str::<GeminiResponse>(event) {
        Ok(parsed) => decoder.push(&parsed.into_text()),
        Err(e) => {
            warn!("Skipping malformed stream event: {}", e);
            Vec::new()
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let req = Self::request(prompt, GenerationConfig::text());
        self.generate_content(&req).await
    }

    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let req = Self::request(prompt, GenerationConfig::json(schema));
        let text = self.generate_content(&req).await?;
        serde_json::from_str(strip_code_fence(&text))
            .with_context(|| format!("Model returned invalid JSON: {}", text))
    }

    async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream> {
        let url = self.endpoint("streamGenerateContent", "alt=sse&")?;
        let req = Self::request(prompt, GenerationConfig::streaming());
        let res = self.client.post(&url).json(&req).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(anyhow!(
                "Failed to generate content from AI ({}): {}",
                status,
                res.text().await.unwrap_or_default()
            ));
        }

        let (tx, rx) = mpsc::channel::<Result<StreamChunk>>(32);
        tokio::spawn(async move {
            let mut body = Box::pin(res.bytes_stream());
            let mut sse = SseFrameBuffer::new();
            let mut decoder = ChunkDecoder::new();

            while let Some(next) = body.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(anyhow!("Failed to generate content from AI: {}", e)))
                            .await;
                        return;
                    }
                };
                for event in sse.push(&bytes) {
                    for chunk in decode_event(&event, &mut decoder) {
                        if tx.send(Ok(chunk)).await.is_err() {
                            debug!("Content stream receiver dropped");
                            return;
                        }
                    }
                }
            }

            let mut tail = Vec::new();
            if let Some(event) = sse.finish() {
                tail.extend(decode_event(&event, &mut decoder));
            }
            tail.extend(decoder.finish());
            for chunk in tail {
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
