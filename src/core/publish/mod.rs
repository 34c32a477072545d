pub mod shopify;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use shopify::ShopifyClient;

use crate::core::config::ShopifySettings;

/// Sentinel some deployments ship instead of a real token.
const PLACEHOLDER_TOKEN_MARKER: &str = "PLACEHOLDER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub store_name: String,
    pub access_token: String,
}

impl StoreCredentials {
    pub fn from_settings(settings: &ShopifySettings) -> Self {
        Self {
            store_name: settings.store_name.trim().to_string(),
            access_token: settings.access_token.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.store_name.is_empty() && !self.access_token.is_empty()
    }

    pub fn has_usable_token(&self) -> bool {
        self.is_complete() && !self.access_token.contains(PLACEHOLDER_TOKEN_MARKER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: u64,
}

/// A single store's blogging surface.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Creates the default blog first when the store has none.
    async fn list_blogs(&self, creds: &StoreCredentials) -> Result<Vec<Blog>>;

    async fn create_blog(
        &self,
        creds: &StoreCredentials,
        title: &str,
        handle: Option<&str>,
    ) -> Result<Blog>;

    async fn create_article(
        &self,
        creds: &StoreCredentials,
        blog_id: u64,
        html: &str,
        meta_title: Option<&str>,
        meta_description: Option<&str>,
    ) -> Result<ArticleRef>;

    /// Hosted URL for the file, or `source_url` itself when anything goes wrong.
    async fn upload_file(
        &self,
        creds: &StoreCredentials,
        source_url: &str,
        filename: &str,
        alt: &str,
    ) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(store: &str, token: &str) -> StoreCredentials {
        StoreCredentials {
            store_name: store.to_string(),
            access_token: token.to_string(),
        }
    }

    #[test]
    fn usable_token_rules() {
        assert!(creds("shop", "shpat_real").has_usable_token());
        assert!(!creds("shop", "shpat_PLACEHOLDER_TOKEN_SET_IN_VERCEL_ENV").has_usable_token());
        assert!(!creds("", "shpat_real").has_usable_token());
        assert!(!creds("shop", "").has_usable_token());
        assert!(creds("shop", "shpat_PLACEHOLDER").is_complete());
    }

    #[test]
    fn settings_are_trimmed() {
        let settings = ShopifySettings {
            store_name: " my-shop ".to_string(),
            access_token: "tok\n".to_string(),
            ..ShopifySettings::default()
        };
        assert_eq!(StoreCredentials::from_settings(&settings), creds("my-shop", "tok"));
    }
}
