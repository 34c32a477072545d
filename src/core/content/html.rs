use regex::{Captures, Regex};
use std::sync::LazyLock;

static IMAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!-- IMAGE_SUGGESTION: (.*?) -->").unwrap()
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").unwrap());
static H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*"([^"]*)""#).unwrap()
});
static ALT_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\balt\s*=\s*"([^"]*)""#).unwrap()
});

const IMAGE_STYLE: &str =
    "width: 100%; max-width: 600px; height: auto; margin: 20px 0; border-radius: 8px;";

/// Inline placeholder left in the content where the model asked for an image.
/// The prompt is folded onto one line.
pub fn image_marker(prompt: &str) -> String {
    let prompt = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    // A literal "-->" inside the prompt would end the comment early.
    format!("<!-- IMAGE_SUGGESTION: {} -->", prompt.replace("-->", "- ->"))
}

/// Replace image markers, first to last, with the image at the same position.
/// Empty slots and markers past the end of `images` are dropped.
pub fn splice_images(html: &str, images: &[String]) -> String {
    let mut index = 0;
    IMAGE_MARKER
        .replace_all(html, |caps: &Captures| {
            let slot = images.get(index).filter(|url| !url.is_empty());
            index += 1;
            match slot {
                Some(url) => {
                    let prompt = &caps[1];
                    format!(
                        r#"<img src="{}" alt="{}" style="{}">"#,
                        escape_attr(url),
                        escape_attr(&truncate_chars(prompt, 100)),
                        IMAGE_STYLE
                    )
                }
                None => String::new(),
            }
        })
        .into_owned()
}

pub fn count_markers(html: &str) -> usize {
    IMAGE_MARKER.find_iter(html).count()
}

pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, " ").into_owned()
}

/// Plain-text rendering capped at `max_chars`, used to keep prompts bounded.
pub fn plain_text_excerpt(html: &str, max_chars: usize) -> String {
    truncate_chars(&strip_tags(html), max_chars)
}

/// Split the first `<h1>` out as the article title. Returns `(title, body_without_h1)`.
pub fn extract_h1(html: &str) -> (Option<String>, String) {
    match H1.captures(html) {
        Some(caps) => {
            let title = strip_tags(&caps[1]).split_whitespace().collect::<Vec<_>>().join(" ");
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let mut body = String::with_capacity(html.len());
            body.push_str(&html[..whole.start]);
            body.push_str(&html[whole.end..]);
            let title = (!title.is_empty()).then_some(title);
            (title, body)
        }
        None => (None, html.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    pub alt: Option<String>,
}

pub fn first_image(html: &str) -> Option<ImageRef> {
    let tag = IMG.find(html)?.as_str();
    let src = SRC_ATTR.captures(tag)?.get(1)?.as_str().to_string();
    if src.is_empty() {
        return None;
    }
    let alt = ALT_ATTR
        .captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| unescape_attr(m.as_str()))
        .filter(|a| !a.is_empty());
    Some(ImageRef {
        src: unescape_attr(&src),
        alt,
    })
}

pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn unescape_attr(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}
