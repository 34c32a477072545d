use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ImageDimensions, ImageRequest, extract_keywords};

/// One free image backend.
#[async_trait]
pub trait ImageSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, request: &ImageRequest, dims: ImageDimensions) -> Result<String>;

    /// Whether the service currently answers at all.
    async fn probe(&self) -> Result<bool>;
}

async fn head_ok(client: &Client, url: &str, timeout: Duration) -> Result<()> {
    let res = client.head(url).timeout(timeout).send().await?;
    if !res.status().is_success() {
        return Err(anyhow!("HTTP {}", res.status()));
    }
    Ok(())
}

pub struct Picsum {
    client: Client,
    timeout: Duration,
}

impl Picsum {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Same prompt, same photo.
    pub fn seed(prompt: &str) -> u32 {
        let sum: u64 = prompt.chars().map(|c| c as u64).sum();
        (sum % 1000) as u32
    }
}

#[async_trait]
impl ImageSource for Picsum {
    fn name(&self) -> &'static str {
        "Picsum"
    }

    async fn fetch(&self, request: &ImageRequest, dims: ImageDimensions) -> Result<String> {
        Ok(format!(
            "https://picsum.photos/seed/{}/{}/{}",
            Self::seed(&request.prompt),
            dims.width,
            dims.height
        ))
    }

    async fn probe(&self) -> Result<bool> {
        Ok(head_ok(&self.client, "https://picsum.photos/64/64", self.timeout)
            .await
            .is_ok())
    }
}

pub struct Unsplash {
    client: Client,
    timeout: Duration,
}

impl Unsplash {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

const UNSPLASH_PHOTO: &str = "https://images.unsplash.com/photo-1556909114-f6e7ad7d3136";

#[async_trait]
impl ImageSource for Unsplash {
    fn name(&self) -> &'static str {
        "Unsplash"
    }

    async fn fetch(&self, request: &ImageRequest, dims: ImageDimensions) -> Result<String> {
        let keywords = extract_keywords(&request.prompt).join(",");
        Ok(format!(
            "{}?auto=format&fit=crop&w={}&h={}&q=80&keywords={}",
            UNSPLASH_PHOTO,
            dims.width,
            dims.height,
            urlencoding::encode(&keywords)
        ))
    }

    async fn probe(&self) -> Result<bool> {
        Ok(head_ok(&self.client, UNSPLASH_PHOTO, self.timeout).await.is_ok())
    }
}

pub struct LoremFlickr {
    client: Client,
    timeout: Duration,
}

impl LoremFlickr {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ImageSource for LoremFlickr {
    fn name(&self) -> &'static str {
        "LoremFlickr"
    }

    async fn fetch(&self, request: &ImageRequest, dims: ImageDimensions) -> Result<String> {
        let keywords = extract_keywords(&request.prompt).join(",");
        let url = format!(
            "https://loremflickr.com/{}/{}/{}",
            dims.width, dims.height, keywords
        );
        // HEAD is flaky here while GET usually works, so a failed probe is not fatal.
        if let Err(e) = head_ok(&self.client, &url, self.timeout).await {
            warn!("LoremFlickr probe failed, using the URL anyway: {}", e);
        }
        Ok(url)
    }

    async fn probe(&self) -> Result<bool> {
        Ok(
            head_ok(&self.client, "https://loremflickr.com/64/64", self.timeout)
                .await
                .is_ok(),
        )
    }
}

pub struct Pollinations {
    client: Client,
    timeout: Duration,
}

impl Pollinations {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn prompt_text(request: &ImageRequest) -> String {
        let mut prompt = request.prompt.clone();
        if !request.style.is_empty() && request.style != "Default" {
            prompt.push_str(&format!(", {} style", request.style));
        }
        if !request.negative_prompt.trim().is_empty() {
            prompt.push_str(&format!(", without {}", request.negative_prompt.trim()));
        }
        prompt
    }
}

#[async_trait]
impl ImageSource for Pollinations {
    fn name(&self) -> &'static str {
        "Pollinations"
    }

    async fn fetch(&self, request: &ImageRequest, dims: ImageDimensions) -> Result<String> {
        let seed: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let url = format!(
            "https://image.pollinations.ai/prompt/{}?width={}&height={}&seed={}",
            urlencoding::encode(&Self::prompt_text(request)),
            dims.width,
            dims.height,
            seed
        );
        head_ok(&self.client, &url, self.timeout)
            .await
            .map_err(|e| anyhow!("Pollinations image generation failed: {}", e))?;
        debug!("Pollinations URL verified");
        Ok(url)
    }

    async fn probe(&self) -> Result<bool> {
        Ok(head_ok(
            &self.client,
            "https://image.pollinations.ai/prompt/test?width=64&height=64",
            self.timeout,
        )
        .await
        .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ImageRequest {
        ImageRequest {
            prompt: prompt.to_string(),
            aspect_ratio: "1:1".to_string(),
            style: "Default".to_string(),
            negative_prompt: String::new(),
        }
    }

    #[test]
    fn picsum_seed_is_char_code_sum_mod_1000() {
        // 'a' = 97, 'b' = 98
        assert_eq!(Picsum::seed("ab"), 195);
        assert_eq!(Picsum::seed(&"z".repeat(20)), (122 * 20) % 1000);
        assert_eq!(Picsum::seed(""), 0);
    }

    #[tokio::test]
    async fn picsum_url_is_deterministic() {
        let source = Picsum::new(Client::new(), Duration::from_secs(1));
        let dims = ImageDimensions::for_aspect_ratio("4:3");
        let a = source.fetch(&request("serum bottle"), dims).await.unwrap();
        let b = source.fetch(&request("serum bottle"), dims).await.unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with("/640/480"));
    }

    #[tokio::test]
    async fn unsplash_url_carries_keywords() {
        let source = Unsplash::new(Client::new(), Duration::from_secs(1));
        let url = source
            .fetch(&request("moisturizer on a shelf"), ImageDimensions::for_aspect_ratio("1:1"))
            .await
            .unwrap();
        assert!(url.contains("w=512&h=512"));
        assert!(url.contains("keywords=cosmetics%2Ccream%2Cbeauty"));
    }

    #[test]
    fn pollinations_prompt_adds_style_and_negative() {
        let mut req = request("jar");
        assert_eq!(Pollinations::prompt_text(&req), "jar");
        req.style = "Watercolor".to_string();
        req.negative_prompt = "text".to_string();
        assert_eq!(Pollinations::prompt_text(&req), "jar, Watercolor style, without text");
    }
}
