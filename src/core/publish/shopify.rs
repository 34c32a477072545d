use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ArticleRef, Blog, Publisher, StoreCredentials};
use crate::core::config::ShopifySettings;
use crate::core::content::html::{extract_h1, first_image, slugify};

const UNTITLED: &str = "Untitled Post";
const FALLBACK_CDN: &str = "https://cdn.shopify.com/s/files/1/0000/0000/0000/files";

pub struct ShopifyClient {
    settings: ShopifySettings,
    client: Client,
}

#[derive(Deserialize)]
struct BlogsResponse {
    #[serde(default)]
    blogs: Vec<Blog>,
}

#[derive(Deserialize)]
struct BlogResponse {
    blog: Blog,
}

#[derive(Deserialize)]
struct ArticleResponse {
    article: ArticleRef,
}

impl ShopifyClient {
    pub fn new(settings: &ShopifySettings) -> Self {
        Self {
            settings: settings.clone(),
            client: Client::new(),
        }
    }

    fn base_url(&self, creds: &StoreCredentials) -> String {
        match self.settings.api_base.as_deref() {
            Some(base) if !base.trim().is_empty() => base.trim_end_matches('/').to_string(),
            _ => format!(
                "https://{}.myshopify.com/admin/api/{}",
                creds.store_name, self.settings.api_version
            ),
        }
    }

    async fn call(
        &self,
        creds: &StoreCredentials,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        if !creds.is_complete() {
            return Err(anyhow!("Shopify store name and access token are required."));
        }
        let url = format!("{}/{}", self.base_url(creds), path);
        info!("Shopify {} {}", method, path);

        let mut req = self
            .client
            .request(method, &url)
            .header("X-Shopify-Access-Token", &creds.access_token);
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req
            .send()
            .await
            .context("Failed to communicate with Shopify")?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Shopify API Error ({}): {}", status, text));
        }
        Ok(res.json().await?)
    }

    async fn upload_inner(
        &self,
        creds: &StoreCredentials,
        source_url: &str,
        filename: &str,
        alt: &str,
    ) -> Result<String> {
        let res = self.client.get(source_url).send().await?;
        if !res.status().is_success() {
            return Err(anyhow!("Failed to download image: {}", res.status()));
        }
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| "image/jpeg".to_string());
        let bytes = res.bytes().await?;
        info!("Downloaded {} bytes ({}) for upload", bytes.len(), content_type);

        let unique = format!(
            "{}-{}.{}",
            filename,
            chrono::Utc::now().timestamp_millis(),
            image_extension(&content_type)
        );
        let payload = json!({
            "file": {
                "filename": unique,
                "attachment": base64::engine::general_purpose::STANDARD.encode(&bytes),
                "content_type": content_type,
                "alt": alt,
            }
        });
        let response = self
            .call(creds, Method::POST, "files.json", Some(&payload))
            .await?;
        hosted_url(&response, &unique)
    }
}

fn image_extension(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/svg+xml" => "svg",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("jpg"),
    }
}

fn hosted_url(response: &Value, filename: &str) -> Result<String> {
    let file = response
        .get("file")
        .filter(|f| f.is_object())
        .ok_or_else(|| anyhow!("No file URL returned from Shopify"))?;
    for key in ["public_url", "url"] {
        if let Some(url) = file.get(key).and_then(Value::as_str)
            && !url.is_empty()
        {
            return Ok(url.to_string());
        }
    }
    Ok(format!("{}/{}", FALLBACK_CDN, filename))
}

fn article_payload(
    title: &str,
    author: &str,
    body_html: &str,
    featured_image: Option<&str>,
    meta_title: Option<&str>,
    meta_description: Option<&str>,
) -> Value {
    let mut article = json!({
        "title": title,
        "author": author,
        "body_html": body_html,
        "published": true,
    });

    if let Some(src) = featured_image {
        article["image"] = json!({ "src": src, "alt": title });
    }

    let mut metafields = Vec::new();
    for (key, value) in [("title_tag", meta_title), ("description_tag", meta_description)] {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            metafields.push(json!({
                "key": key,
                "namespace": "global",
                "value": value,
                "type": "single_line_text_field",
            }));
        }
    }
    if !metafields.is_empty() {
        article["metafields"] = Value::Array(metafields);
    }

    json!({ "article": article })
}

#[async_trait]
impl Publisher for ShopifyClient {
    async fn list_blogs(&self, creds: &StoreCredentials) -> Result<Vec<Blog>> {
        let value = self.call(creds, Method::GET, "blogs.json", None).await?;
        let listed: BlogsResponse = serde_json::from_value(value)?;
        if !listed.blogs.is_empty() {
            return Ok(listed.blogs);
        }

        info!("No blogs found, creating default blog...");
        match self
            .create_blog(creds, &self.settings.default_blog_title, None)
            .await
        {
            Ok(blog) => Ok(vec![blog]),
            Err(e) => {
                warn!("Failed to create default blog: {}", e);
                Err(anyhow!(
                    "No blogs found and unable to create one. Please create a blog in your Shopify admin first."
                ))
            }
        }
    }

    async fn create_blog(
        &self,
        creds: &StoreCredentials,
        title: &str,
        handle: Option<&str>,
    ) -> Result<Blog> {
        let handle = handle.map(str::to_string).unwrap_or_else(|| slugify(title));
        let payload = json!({ "blog": { "title": title, "handle": handle } });
        let value = self
            .call(creds, Method::POST, "blogs.json", Some(&payload))
            .await?;
        let created: BlogResponse = serde_json::from_value(value)?;
        Ok(created.blog)
    }

    async fn create_article(
        &self,
        creds: &StoreCredentials,
        blog_id: u64,
        html: &str,
        meta_title: Option<&str>,
        meta_description: Option<&str>,
    ) -> Result<ArticleRef> {
        let (title, body) = extract_h1(html);
        let title = title.unwrap_or_else(|| UNTITLED.to_string());

        let featured = match first_image(&body) {
            Some(img) if self.settings.upload_featured_image => {
                let alt = img.alt.clone().unwrap_or_else(|| title.clone());
                let filename = format!("featured-{}", slugify(&title));
                Some(self.upload_file(creds, &img.src, &filename, &alt).await)
            }
            Some(img) => Some(img.src),
            None => None,
        };

        let payload = article_payload(
            &title,
            &self.settings.author,
            &body,
            featured.as_deref(),
            meta_title,
            meta_description,
        );
        info!(
            "Creating article '{}' (featured image: {})",
            title,
            featured.is_some()
        );
        let path = format!("blogs/{}/articles.json", blog_id);
        let value = self
            .call(creds, Method::POST, &path, Some(&payload))
            .await?;
        let created: ArticleResponse = serde_json::from_value(value)?;
        Ok(created.article)
    }

    async fn upload_file(
        &self,
        creds: &StoreCredentials,
        source_url: &str,
        filename: &str,
        alt: &str,
    ) -> String {
        if !creds.has_usable_token() {
            info!("No usable Shopify token, keeping original image URL");
            return source_url.to_string();
        }
        match self.upload_inner(creds, source_url, filename, alt).await {
            Ok(url) => {
                info!("Image uploaded to Shopify: {}", url);
                url
            }
            Err(e) => {
                warn!("Failed to upload to Shopify, falling back to original URL: {}", e);
                source_url.to_string()
            }
        }
    }
}
