use anyhow::{Result, anyhow};
use rand::Rng;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::{Autopilot, AutopilotConfig, Stage};
use crate::core::content::html::{count_markers, image_marker, splice_images};
use crate::core::content::PostBrief;
use crate::core::images::{RetryPolicy, resolve_images};
use crate::core::llm::StreamChunk;

pub(super) struct Published {
    pub title: String,
    pub article_id: u64,
}

/// One "create and publish an article" run. `stage` always names the step
/// in progress, so a failure can be attributed to it.
pub(super) struct Job<'a> {
    autopilot: &'a Autopilot,
    config: &'a AutopilotConfig,
    run_id: &'a str,
    pub stage: Stage,
}

impl<'a> Job<'a> {
    pub fn new(autopilot: &'a Autopilot, config: &'a AutopilotConfig, run_id: &'a str) -> Self {
        Self {
            autopilot,
            config,
            run_id,
            stage: Stage::CreatingBlog,
        }
    }

    async fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.autopilot.set_stage(stage).await;
    }

    async fn checkpoint<T: Serialize>(&self, key: &str, payload: &T) {
        let Some(journal) = self.autopilot.services.journal.as_ref() else {
            return;
        };
        let value = serde_json::to_value(payload).unwrap_or(Value::Null);
        if let Err(e) = journal.checkpoint(self.run_id, key, &value).await {
            warn!("Could not checkpoint {} for run {}: {}", key, self.run_id, e);
        }
    }

    pub async fn run(&mut self) -> Result<Published> {
        let services = &self.autopilot.services;

        self.enter(Stage::SearchingTopics).await;
        let trends = services.writer.trending_topics().await?;
        if trends.topics.is_empty() {
            return Err(anyhow!("No trending topics found"));
        }
        let topic = {
            let index = rand::thread_rng().gen_range(0..trends.topics.len());
            trends.topics[index].clone()
        };
        info!("Selected trending topic: {}", topic.topic);
        self.checkpoint("topic", &topic).await;

        self.enter(Stage::GeneratingTitle).await;
        let title = services
            .writer
            .blog_title(&topic.topic, self.config.persona.as_ref())
            .await?;
        info!("Generated title: {}", title);
        self.checkpoint("title", &title).await;

        self.enter(Stage::CreatingOutline).await;
        let outline = services
            .writer
            .blog_outline(
                &title,
                &topic.topic,
                self.config.brand_voice_profile.as_deref(),
                self.config.persona.as_ref(),
            )
            .await?;
        info!("Created outline with {} sections", outline.len());
        self.checkpoint("outline", &outline).await;

        self.enter(Stage::WritingContent).await;
        let brief = PostBrief {
            title: title.clone(),
            topic: topic.topic.clone(),
            tone: services.content.tone.clone(),
            content_template: services.content.content_template.clone(),
            author_persona: services.content.author_persona.clone(),
            brand_voice: self.config.brand_voice_profile.clone(),
            persona: self.config.persona.clone(),
            outline,
        };
        let mut stream = services.writer.blog_post_stream(&brief).await?;
        let mut content = String::new();
        let mut image_prompts: Vec<String> = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Html(html) => content.push_str(&html),
                StreamChunk::ImageSuggestion(prompt) => {
                    content.push_str(&image_marker(&prompt));
                    image_prompts.push(prompt);
                }
            }
        }
        info!(
            "Generated {} characters of content with {} image suggestions",
            content.len(),
            image_prompts.len()
        );
        self.checkpoint(
            "content",
            &json!({ "html": content, "image_prompts": image_prompts }),
        )
        .await;

        self.enter(Stage::GeneratingImages).await;
        let policy = RetryPolicy::from_strategy(
            self.config.retry_strategy,
            self.config.image_retry_delay_seconds,
        );
        let images = resolve_images(
            &image_prompts,
            services.images.as_ref(),
            &services.image_request,
            self.config.max_retries,
            &policy,
        )
        .await;
        let resolved = images.iter().filter(|url| !url.is_empty()).count();
        if count_markers(&content) != images.len() {
            warn!(
                "Image markers ({}) and resolved slots ({}) differ, matching by position",
                count_markers(&content),
                images.len()
            );
        }
        let content = splice_images(&content, &images);
        info!("Resolved {}/{} images", resolved, images.len());
        self.checkpoint("images", &images).await;

        self.enter(Stage::GeneratingSeo).await;
        let seo = services
            .writer
            .seo_metadata(&content, &title, &topic.topic)
            .await?;
        info!("Generated SEO data with {} FAQ items", seo.faq.len());
        self.checkpoint("seo", &seo).await;

        self.enter(Stage::Publishing).await;
        let blogs = services.publisher.list_blogs(&services.credentials).await?;
        let blog = blogs
            .first()
            .ok_or_else(|| anyhow!("No blogs available to publish to"))?;
        let article = services
            .publisher
            .create_article(
                &services.credentials,
                blog.id,
                &content,
                seo.meta_titles.first().map(String::as_str),
                seo.meta_descriptions.first().map(String::as_str),
            )
            .await?;
        info!("Published article {} to blog '{}'", article.id, blog.title);
        self.checkpoint("published", &json!({ "blog_id": blog.id, "article_id": article.id }))
            .await;

        Ok(Published {
            title,
            article_id: article.id,
        })
    }
}
