pub mod html;
mod prompts;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::config::ContentSettings;
use crate::core::llm::{ChunkStream, TextGenerator};

const SEO_EXCERPT_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub topic: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendingTopicResult {
    pub topics: Vec<TrendingTopic>,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    pub id: String,
    pub heading: String,
    pub key_points: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    #[serde(default)]
    pub meta_titles: Vec<String>,
    #[serde(default)]
    pub meta_descriptions: Vec<String>,
    #[serde(default)]
    pub faq: Vec<FaqItem>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
}

/// Audience-targeting payload passed through to every text step untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerPersona {
    pub name: String,
    pub age: u32,
    pub occupation: String,
    pub location: String,
    pub skincare_goals: Vec<String>,
    pub pain_points: Vec<String>,
    pub motivations: Vec<String>,
    pub personality: String,
    pub bio: String,
}

/// Everything the content stream prompt needs.
#[derive(Debug, Clone)]
pub struct PostBrief {
    pub title: String,
    pub topic: String,
    pub tone: String,
    pub content_template: String,
    pub author_persona: String,
    pub brand_voice: Option<String>,
    pub persona: Option<CustomerPersona>,
    pub outline: Vec<OutlineSection>,
}

/// The text-generation stages a job walks through.
#[async_trait]
pub trait BlogWriter: Send + Sync {
    async fn trending_topics(&self) -> Result<TrendingTopicResult>;

    async fn blog_title(&self, topic: &str, persona: Option<&CustomerPersona>) -> Result<String>;

    async fn blog_outline(
        &self,
        title: &str,
        topic: &str,
        brand_voice: Option<&str>,
        persona: Option<&CustomerPersona>,
    ) -> Result<Vec<OutlineSection>>;

    async fn blog_post_stream(&self, brief: &PostBrief) -> Result<ChunkStream>;

    async fn seo_metadata(&self, html: &str, title: &str, topic: &str) -> Result<SeoMetadata>;
}

#[derive(Deserialize)]
struct TrendsEnvelope {
    #[serde(default)]
    trends: Vec<TrendingTopic>,
}

pub struct LlmBlogWriter {
    generator: Arc<dyn TextGenerator>,
    settings: ContentSettings,
}

impl LlmBlogWriter {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: ContentSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ContentSettings {
        &self.settings
    }
}

/// First non-empty line with wrapping quotes and markdown emphasis removed.
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_start_matches('#').trim();
    let line = line.trim_matches(|c| matches!(c, '"' | '\'' | '*' | '`')).trim();
    (!line.is_empty()).then(|| line.to_string())
}

#[async_trait]
impl BlogWriter for LlmBlogWriter {
    async fn trending_topics(&self) -> Result<TrendingTopicResult> {
        let prompt = prompts::trending_topics(&self.settings);
        let value = self
            .generator
            .generate_json(&prompt, &prompts::trends_schema())
            .await?;
        let envelope: TrendsEnvelope = serde_json::from_value(value)?;
        info!("Model suggested {} trending topics", envelope.trends.len());
        Ok(TrendingTopicResult {
            topics: envelope.trends,
            sources: Vec::new(),
        })
    }

    async fn blog_title(&self, topic: &str, persona: Option<&CustomerPersona>) -> Result<String> {
        let prompt = prompts::blog_title(&self.settings, topic, persona);
        let raw = self.generator.generate(&prompt).await?;
        clean_title(&raw).ok_or_else(|| anyhow!("Model returned an empty title"))
    }

    async fn blog_outline(
        &self,
        title: &str,
        topic: &str,
        brand_voice: Option<&str>,
        persona: Option<&CustomerPersona>,
    ) -> Result<Vec<OutlineSection>> {
        let prompt = prompts::blog_outline(&self.settings, title, topic, brand_voice, persona);
        let value = self
            .generator
            .generate_json(&prompt, &prompts::outline_schema())
            .await?;
        let mut outline: Vec<OutlineSection> = serde_json::from_value(value)?;
        for section in &mut outline {
            section.id = Uuid::new_v4().to_string();
        }
        Ok(outline)
    }

    async fn blog_post_stream(&self, brief: &PostBrief) -> Result<ChunkStream> {
        let prompt = prompts::blog_post(&self.settings, brief);
        self.generator.generate_stream(&prompt).await
    }

    async fn seo_metadata(&self, html: &str, title: &str, topic: &str) -> Result<SeoMetadata> {
        let text = html::plain_text_excerpt(html, SEO_EXCERPT_CHARS);
        let prompt = prompts::seo_metadata(&text, title, topic);
        let value = self
            .generator
            .generate_json(&prompt, &prompts::seo_schema())
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::StreamChunk;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio_stream::StreamExt;

    #[derive(Default)]
    struct ScriptedGenerator {
        texts: Mutex<VecDeque<String>>,
        json: Mutex<VecDeque<Value>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn with_text(text: &str) -> Self {
            let g = Self::default();
            g.texts.lock().unwrap().push_back(text.to_string());
            g
        }

        fn with_json(value: Value) -> Self {
            let g = Self::default();
            g.json.lock().unwrap().push_back(value);
            g
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.texts
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted text"))
        }

        async fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<Value> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.json
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted json"))
        }

        async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let chunks = vec![
                Ok(StreamChunk::Html("<h1>T</h1>".to_string())),
                Ok(StreamChunk::ImageSuggestion("jar".to_string())),
            ];
            Ok(Box::pin(tokio_stream::iter(chunks)))
        }
    }

    fn writer(generator: ScriptedGenerator) -> (Arc<ScriptedGenerator>, LlmBlogWriter) {
        let generator = Arc::new(generator);
        let writer = LlmBlogWriter::new(generator.clone(), ContentSettings::default());
        (generator, writer)
    }

    #[test]
    fn clean_title_takes_first_line_without_quotes() {
        assert_eq!(
            clean_title("\n  \"Monsoon Glow: 5 Tips\"\nextra").as_deref(),
            Some("Monsoon Glow: 5 Tips")
        );
        assert_eq!(clean_title("## **Bold**").as_deref(), Some("Bold"));
        assert_eq!(clean_title("  \n \"\" "), None);
    }

    #[tokio::test]
    async fn trending_topics_unwraps_the_trends_envelope() {
        let (_, writer) = writer(ScriptedGenerator::with_json(json!({
            "trends": [
                {"topic": "Monsoon Skincare", "reason": "seasonal demand"},
                {"topic": "Niacinamide", "reason": "viral on TikTok"}
            ]
        })));
        let result = writer.trending_topics().await.unwrap();
        assert_eq!(result.topics.len(), 2);
        assert_eq!(result.topics[0].topic, "Monsoon Skincare");
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn empty_title_is_an_error() {
        let (_, writer) = writer(ScriptedGenerator::with_text("   "));
        assert!(writer.blog_title("x", None).await.is_err());
    }

    #[tokio::test]
    async fn outline_ids_are_replaced_with_uuids() {
        let (generator, writer) = writer(ScriptedGenerator::with_json(json!([
            {"id": "1", "heading": "Intro", "keyPoints": "- a"},
            {"id": "1", "heading": "Body", "keyPoints": "- b"}
        ])));
        let outline = writer
            .blog_outline("Title", "Topic", Some("playful"), None)
            .await
            .unwrap();
        assert_eq!(outline.len(), 2);
        assert_ne!(outline[0].id, outline[1].id);
        assert!(Uuid::parse_str(&outline[0].id).is_ok());
        assert_eq!(outline[1].key_points, "- b");
        assert!(generator.last_prompt().contains("playful"));
    }

    #[tokio::test]
    async fn outline_rejects_missing_fields() {
        let (_, writer) = writer(ScriptedGenerator::with_json(json!([{"heading": "x"}])));
        assert!(writer.blog_outline("t", "k", None, None).await.is_err());
    }

    #[tokio::test]
    async fn seo_prompt_uses_plain_text_excerpt() {
        let (generator, writer) = writer(ScriptedGenerator::with_json(json!({
            "metaTitles": ["A"],
            "metaDescriptions": ["B"],
            "faq": [{"question": "Q", "answer": "A"}],
            "keyTakeaways": ["K"]
        })));
        let html = format!("<p>{}</p>", "word ".repeat(2000));
        let seo = writer.seo_metadata(&html, "Title", "Topic").await.unwrap();
        assert_eq!(seo.meta_titles, vec!["A".to_string()]);
        assert_eq!(seo.faq[0].answer, "A");
        let prompt = generator.last_prompt();
        assert!(!prompt.contains("<p>"));
        assert!(prompt.len() < html.len());
    }

    #[tokio::test]
    async fn post_stream_passes_chunks_through() {
        let (_, writer) = writer(ScriptedGenerator::default());
        let brief = PostBrief {
            title: "T".to_string(),
            topic: "K".to_string(),
            tone: "calm".to_string(),
            content_template: "Standard Blog Post".to_string(),
            author_persona: "Beauty Guru".to_string(),
            brand_voice: None,
            persona: None,
            outline: Vec::new(),
        };
        let chunks: Vec<_> = writer
            .blog_post_stream(&brief)
            .await
            .unwrap()
            .collect::<Vec<_>>()
            .await;
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn persona_round_trips_camel_case() {
        let persona: CustomerPersona = serde_json::from_value(json!({
            "name": "Ayesha",
            "age": 27,
            "skincareGoals": ["even tone"],
            "painPoints": ["humidity"]
        }))
        .unwrap();
        assert_eq!(persona.skincare_goals, vec!["even tone".to_string()]);
        assert!(persona.motivations.is_empty());
    }
}
