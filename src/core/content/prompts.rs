use serde_json::{Value, json};

use super::{CustomerPersona, PostBrief};
use crate::core::config::ContentSettings;

fn persona_block(persona: Option<&CustomerPersona>, lead: &str) -> String {
    persona
        .and_then(|p| serde_json::to_string_pretty(p).ok())
        .map(|p| format!("**Target Audience Persona:** {}\n{}", lead, p))
        .unwrap_or_default()
}

fn brand_voice_block(brand_voice: Option<&str>) -> String {
    brand_voice
        .filter(|v| !v.trim().is_empty())
        .map(|v| format!("**Brand Voice Profile:** Adhere strictly to this voice: {}", v))
        .unwrap_or_default()
}

pub fn trending_topics(settings: &ContentSettings) -> String {
    format!(
        "You are a market research analyst for {brand}.\n\
         Identify the top 5 trending {focus} right now.\n\
         For each trend, give a concise reason why it is trending (e.g. \"viral on TikTok\", \"seasonal demand\").\n\
         Return the response in the specified JSON format.",
        brand = settings.brand_name,
        focus = settings.trend_focus,
    )
}

pub fn blog_title(
    settings: &ContentSettings,
    topic: &str,
    persona: Option<&CustomerPersona>,
) -> String {
    format!(
        "You are a {author} writing for {brand}.\n\
         Suggest one compelling, SEO-friendly blog post title for a \"{template}\" about: \"{topic}\".\n\
         {persona}\n\
         Reply with the title only, no quotes and no commentary.",
        author = settings.author_persona,
        brand = settings.brand_name,
        template = settings.content_template,
        topic = topic,
        persona = persona_block(persona, "Write the title for this person:"),
    )
}

pub fn blog_outline(
    settings: &ContentSettings,
    title: &str,
    topic: &str,
    brand_voice: Option<&str>,
    persona: Option<&CustomerPersona>,
) -> String {
    format!(
        "You are a strategic content planner for {brand}. Your persona is: \"{author}\".\n\
         Create a detailed blog post outline.\n\n\
         **Blog Topic:** \"{title}\"\n\
         The article should target these SEO keywords: \"{topic}\".\n\
         {voice}\n\
         {persona}\n\n\
         Structure it as a \"{template}\": an introduction, several H2 sections and a conclusion.\n\
         Return a JSON array of objects with \"id\", \"heading\" and \"keyPoints\" (a markdown list of talking points).",
        brand = settings.brand_name,
        author = settings.author_persona,
        title = title,
        topic = topic,
        voice = brand_voice_block(brand_voice),
        persona = persona_block(persona, "Tailor the outline to resonate with this person:"),
        template = settings.content_template,
    )
}

pub fn blog_post(settings: &ContentSettings, brief: &PostBrief) -> String {
    let audience = match brief.persona.as_ref() {
        Some(persona) => persona_block(Some(persona), "Write directly to this person:"),
        None => format!("**Target Audience:** {}", settings.default_audience),
    };
    let outline = serde_json::to_string_pretty(&brief.outline).unwrap_or_else(|_| "[]".to_string());
    let products = if settings.product_links.is_empty() {
        String::new()
    } else {
        format!(
            "**Products to Feature:**\n{}",
            settings
                .product_links
                .iter()
                .map(|link| format!("- {}", link))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    format!(
        "You are an expert copywriter for {brand}. Your persona is: \"{author}\". \
         Write a detailed, SEO-friendly blog post that follows the outline exactly.\n\n\
         **Blog Topic:** \"{title}\"\n\
         {audience}\n\
         **Tone of Voice:** \"{tone}\"\n\
         {voice}\n\
         Incorporate these SEO keywords naturally: \"{keywords}\".\n\
         **Article Outline to Follow:**\n{outline}\n\
         {products}\n\n\
         **Output format:** a stream of JSON objects, one per line, never wrapped in an array.\n\
         - Text: {{\"type\": \"html\", \"content\": \"<h2>...</h2><p>...</p>\"}} using only h1, h2, p, ul, li and a tags. The first object holds the <h1> title.\n\
         - Images: at 2-3 logical places emit {{\"type\": \"image_suggestion\", \"content\": \"a detailed image generation prompt\"}}.\n\
         Aim for 500-700 words in total.",
        brand = settings.brand_name,
        author = brief.author_persona,
        title = brief.title,
        audience = audience,
        tone = brief.tone,
        voice = brand_voice_block(brief.brand_voice.as_deref()),
        keywords = brief.topic,
        outline = outline,
        products = products,
    )
}

pub fn seo_metadata(plain_text: &str, title: &str, topic: &str) -> String {
    format!(
        "Based on the following blog post, generate SEO metadata, an FAQ section and key takeaways.\n\
         **Blog Title:** \"{title}\"\n\
         The blog targets these SEO keywords: \"{topic}\". Align the meta title and description with them.\n\
         **Blog Content (Plain Text):**\n---\n{plain_text}\n---\n\
         1. metaTitles: 3 distinct options, each under 60 characters.\n\
         2. metaDescriptions: 3 distinct options, each under 160 characters.\n\
         3. faq: 3-4 questions with concise answers drawn from the post.\n\
         4. keyTakeaways: 2-4 short strings.\n\
         Return the response in the specified JSON format.",
    )
}

pub fn trends_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "trends": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "topic": { "type": "STRING" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["topic", "reason"]
                }
            }
        },
        "required": ["trends"]
    })
}

pub fn outline_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "heading": { "type": "STRING" },
                "keyPoints": { "type": "STRING" }
            },
            "required": ["id", "heading", "keyPoints"]
        }
    })
}

pub fn seo_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "metaTitles": { "type": "ARRAY", "items": { "type": "STRING" } },
            "metaDescriptions": { "type": "ARRAY", "items": { "type": "STRING" } },
            "faq": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "answer": { "type": "STRING" }
                    },
                    "required": ["question", "answer"]
                }
            },
            "keyTakeaways": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["metaTitles", "metaDescriptions", "faq", "keyTakeaways"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::OutlineSection;

    fn persona() -> CustomerPersona {
        CustomerPersona {
            name: "Ayesha".to_string(),
            age: 27,
            ..CustomerPersona::default()
        }
    }

    #[test]
    fn outline_schema_requires_all_fields() {
        let schema = outline_schema();
        assert_eq!(schema["items"]["required"], json!(["id", "heading", "keyPoints"]));
    }

    #[test]
    fn post_prompt_carries_persona_voice_and_outline() {
        let settings = ContentSettings::default();
        let brief = PostBrief {
            title: "Monsoon Glow".to_string(),
            topic: "Monsoon Skincare".to_string(),
            tone: settings.tone.clone(),
            content_template: settings.content_template.clone(),
            author_persona: settings.author_persona.clone(),
            brand_voice: Some("warm and witty".to_string()),
            persona: Some(persona()),
            outline: vec![OutlineSection {
                id: "1".to_string(),
                heading: "Introduction".to_string(),
                key_points: "- hook".to_string(),
            }],
        };
        let prompt = blog_post(&settings, &brief);
        assert!(prompt.contains("Ayesha"));
        assert!(prompt.contains("warm and witty"));
        assert!(prompt.contains("\"keyPoints\": \"- hook\""));
        assert!(prompt.contains("image_suggestion"));
        assert!(!prompt.contains(&settings.default_audience));
    }

    #[test]
    fn post_prompt_falls_back_to_default_audience() {
        let settings = ContentSettings::default();
        let brief = PostBrief {
            title: "t".to_string(),
            topic: "k".to_string(),
            tone: "calm".to_string(),
            content_template: "Listicle".to_string(),
            author_persona: "Dermatologist".to_string(),
            brand_voice: None,
            persona: None,
            outline: Vec::new(),
        };
        let prompt = blog_post(&settings, &brief);
        assert!(prompt.contains(&settings.default_audience));
        assert!(!prompt.contains("Brand Voice Profile"));
        assert!(prompt.contains("Dermatologist"));
    }

    #[test]
    fn title_prompt_omits_persona_when_absent() {
        let prompt = blog_title(&ContentSettings::default(), "Niacinamide", None);
        assert!(prompt.contains("Niacinamide"));
        assert!(!prompt.contains("Persona:**"));
    }
}
