pub mod retry;
pub mod services;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

pub use retry::{RetryPolicy, resolve_images};
pub use services::{ImageSource, LoremFlickr, Picsum, Pollinations, Unsplash};

use crate::core::config::ImageSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Unknown ratios fall back to square.
    pub fn for_aspect_ratio(aspect_ratio: &str) -> Self {
        let (width, height) = match aspect_ratio {
            "16:9" => (768, 432),
            "4:3" => (640, 480),
            "3:4" => (480, 640),
            "9:16" => (432, 768),
            _ => (512, 512),
        };
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    pub style: String,
    pub negative_prompt: String,
}

impl ImageRequest {
    pub fn from_settings(settings: &ImageSettings) -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: settings.aspect_ratio.clone(),
            style: settings.style.clone(),
            negative_prompt: settings.negative_prompt.clone(),
        }
    }

    pub fn with_prompt(&self, prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            ..self.clone()
        }
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::for_aspect_ratio(&self.aspect_ratio)
    }
}

// Checked in order, first hit wins.
const KEYWORD_TABLE: &[(&str, &[&str])] = &[
    ("woman", &["woman", "portrait", "face"]),
    ("women", &["women", "group", "people"]),
    ("pakistani", &["woman", "beauty", "portrait"]),
    ("girl", &["woman", "young", "beauty"]),
    ("person", &["people", "portrait"]),
    ("skincare", &["skincare", "cosmetics", "beauty"]),
    ("serum", &["skincare", "cosmetics", "bottle"]),
    ("cream", &["cosmetics", "beauty", "jar"]),
    ("cleanser", &["skincare", "bottle", "beauty"]),
    ("moisturizer", &["cosmetics", "cream", "beauty"]),
    ("routine", &["beauty", "cosmetics", "lifestyle"]),
    ("glow", &["beauty", "skin", "radiant"]),
    ("radiant", &["beauty", "glow", "skin"]),
    ("clear", &["beauty", "skin", "clean"]),
    ("products", &["cosmetics", "beauty", "bottles"]),
    ("bottle", &["cosmetics", "product", "container"]),
    ("jar", &["cosmetics", "cream", "container"]),
    ("flat", &["flatlay", "cosmetics", "arrangement"]),
    ("arrangement", &["cosmetics", "beauty", "products"]),
    ("layout", &["flatlay", "arrangement", "beauty"]),
    ("natural", &["organic", "wellness", "health"]),
    ("organic", &["natural", "wellness", "green"]),
    ("wellness", &["health", "lifestyle", "beauty"]),
    ("health", &["wellness", "lifestyle", "natural"]),
    ("lifestyle", &["wellness", "health", "beauty"]),
];

const DEFAULT_KEYWORDS: &[&str] = &["beauty", "skincare", "wellness"];

/// Up to three search keywords for the keyword-driven photo services.
pub fn extract_keywords(prompt: &str) -> Vec<String> {
    let lower = prompt.to_lowercase();
    let found = KEYWORD_TABLE
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, keywords)| *keywords)
        .unwrap_or(DEFAULT_KEYWORDS);

    let mut unique: Vec<String> = Vec::new();
    for keyword in found {
        if !unique.iter().any(|k| k == keyword) {
            unique.push(keyword.to_string());
        }
    }
    unique.truncate(3);
    unique
}

pub fn placeholder_url(prompt: &str, aspect_ratio: &str) -> String {
    let dims = ImageDimensions::for_aspect_ratio(aspect_ratio);
    let text: String = prompt.chars().take(50).collect();
    format!(
        "https://via.placeholder.com/{}x{}/E8E8E8/666666?text={}",
        dims.width,
        dims.height,
        urlencoding::encode(&text)
    )
}

pub fn is_placeholder(url: &str) -> bool {
    url.contains("placeholder")
}

/// Produces an image URL for a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceProbe {
    pub service: String,
    pub available: bool,
}

/// Tries each free source in order and ends with the placeholder generator,
/// so `generate` never returns an error.
pub struct FreeImageChain {
    sources: Vec<Box<dyn ImageSource>>,
}

impl FreeImageChain {
    pub fn new(sources: Vec<Box<dyn ImageSource>>) -> Self {
        Self { sources }
    }

    pub fn from_settings(settings: &ImageSettings) -> Self {
        let probe_timeout = std::time::Duration::from_secs(settings.probe_timeout_secs.max(1));
        let client = reqwest::Client::new();
        let mut sources: Vec<Box<dyn ImageSource>> = Vec::new();
        for name in &settings.services {
            match name.trim().to_lowercase().as_str() {
                "picsum" => sources.push(Box::new(Picsum::new(client.clone(), probe_timeout))),
                "unsplash" => sources.push(Box::new(Unsplash::new(client.clone(), probe_timeout))),
                "loremflickr" => {
                    sources.push(Box::new(LoremFlickr::new(client.clone(), probe_timeout)))
                }
                "pollinations" => {
                    sources.push(Box::new(Pollinations::new(client.clone(), probe_timeout)))
                }
                other => warn!("Unknown image service '{}' in config, ignoring", other),
            }
        }
        Self::new(sources)
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn probe_services(&self) -> Vec<ServiceProbe> {
        let mut results = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let available = match source.probe().await {
                Ok(ok) => ok,
                Err(e) => {
                    warn!("{} probe failed: {}", source.name(), e);
                    false
                }
            };
            results.push(ServiceProbe {
                service: source.name().to_string(),
                available,
            });
        }
        results
    }
}

#[async_trait]
impl ImageGenerator for FreeImageChain {
    async fn generate(&self, request: &ImageRequest) -> Result<String> {
        let dims = request.dimensions();
        for source in &self.sources {
            match source.fetch(request, dims).await {
                Ok(url) => {
                    info!("{} produced an image for '{}'", source.name(), request.prompt);
                    return Ok(url);
                }
                Err(e) => warn!("{} failed, trying next service: {}", source.name(), e),
            }
        }
        info!("All image services failed, using placeholder");
        Ok(placeholder_url(&request.prompt, &request.aspect_ratio))
    }
}
