use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::autopilot::AutopilotConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Root data directory. `$BLOGPILOT_DATA_DIR` wins, then `~/.blogpilot`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BLOGPILOT_DATA_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".blogpilot"))
        .unwrap_or_else(|| PathBuf::from(".blogpilot"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub shopify: ShopifySettings,
    #[serde(default)]
    pub images: ImageSettings,
    #[serde(default)]
    pub content: ContentSettings,
    #[serde(default)]
    pub autopilot: AutopilotConfig,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifySettings {
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Overrides `https://{store}.myshopify.com/admin/api/{version}`
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_blog_title")]
    pub default_blog_title: String,
    #[serde(default = "default_true")]
    pub upload_featured_image: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "default_image_services")]
    pub services: Vec<String>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_style")]
    pub style: String,
    #[serde(default)]
    pub negative_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSettings {
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
    #[serde(default = "default_author_persona")]
    pub author_persona: String,
    #[serde(default = "default_content_template")]
    pub content_template: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_audience")]
    pub default_audience: String,
    #[serde(default = "default_trend_focus")]
    pub trend_focus: String,
    #[serde(default)]
    pub product_links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_true")]
    pub journal: bool,
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_api_version() -> String {
    "2024-07".to_string()
}
fn default_author() -> String {
    "AI Writer".to_string()
}
fn default_blog_title() -> String {
    "Our Blog".to_string()
}
fn default_true() -> bool {
    true
}
fn default_image_services() -> Vec<String> {
    vec![
        "picsum".to_string(),
        "unsplash".to_string(),
        "loremflickr".to_string(),
    ]
}
fn default_probe_timeout() -> u64 {
    3
}
fn default_aspect_ratio() -> String {
    "16:9".to_string()
}
fn default_image_style() -> String {
    "Default".to_string()
}
fn default_brand_name() -> String {
    "our skincare brand".to_string()
}
fn default_author_persona() -> String {
    "Beauty Guru".to_string()
}
fn default_content_template() -> String {
    "Standard Blog Post".to_string()
}
fn default_tone() -> String {
    "Professional and Informative".to_string()
}
fn default_audience() -> String {
    "Women aged 18-35 interested in skincare".to_string()
}
fn default_trend_focus() -> String {
    "skincare topics, ingredients, or concerns".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    18790
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

impl Default for ShopifySettings {
    fn default() -> Self {
        Self {
            store_name: String::new(),
            access_token: String::new(),
            api_version: default_api_version(),
            api_base: None,
            author: default_author(),
            default_blog_title: default_blog_title(),
            upload_featured_image: true,
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            services: default_image_services(),
            probe_timeout_secs: default_probe_timeout(),
            aspect_ratio: default_aspect_ratio(),
            style: default_image_style(),
            negative_prompt: String::new(),
        }
    }
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            brand_name: default_brand_name(),
            author_persona: default_author_persona(),
            content_template: default_content_template(),
            tone: default_tone(),
            default_audience: default_audience(),
            trend_focus: default_trend_focus(),
            product_links: Vec::new(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_token: None,
            journal: true,
        }
    }
}

impl AppConfig {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path).await?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?
        } else {
            info!("No {} found, using defaults.", CONFIG_FILE);
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.autopilot.normalize();
        Ok(config)
    }

    /// Secrets usually come from the environment rather than the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(model) = non_empty("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(store) = non_empty("SHOPIFY_STORE_NAME") {
            self.shopify.store_name = store;
        }
        if let Some(token) = non_empty("SHOPIFY_ACCESS_TOKEN") {
            self.shopify.access_token = token;
        }
    }

    pub fn journal_path(data_dir: &Path) -> PathBuf {
        data_dir.join("runs.db")
    }
}

pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# blogpilot configuration

[gemini]
# Prefer exporting GEMINI_API_KEY instead of storing the key here.
api_key = ""
model = "gemini-2.0-flash-exp"

[shopify]
# Also read from SHOPIFY_STORE_NAME / SHOPIFY_ACCESS_TOKEN.
store_name = ""
access_token = ""
api_version = "2024-07"
author = "AI Writer"
default_blog_title = "Our Blog"
upload_featured_image = true

[images]
# Tried in order; the placeholder generator is always the last resort.
services = ["picsum", "unsplash", "loremflickr"]
probe_timeout_secs = 3
aspect_ratio = "16:9"

[content]
author_persona = "Beauty Guru"
content_template = "Standard Blog Post"
tone = "Professional and Informative"
product_links = []

[autopilot]
enabled = false
interval_minutes = 10
max_retries = 3
image_retry_delay_seconds = 30
# fixed | exponential | jittered
retry_strategy = "fixed"

[server]
host = "127.0.0.1"
port = 18790
journal = true
"#;
