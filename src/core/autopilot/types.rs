use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::core::content::CustomerPersona;

pub const MIN_INTERVAL_MINUTES: u64 = 5;
pub const MIN_RETRIES: u32 = 1;
pub const MIN_RETRY_DELAY_SECONDS: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
pub const MAX_RETRIES: u32 = 10;
pub const MAX_RETRY_DELAY_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    #[default]
    Fixed,
    Exponential,
    Jittered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub image_retry_delay_seconds: u64,
    #[serde(default)]
    pub retry_strategy: RetryStrategy,
    #[serde(default)]
    pub persona: Option<CustomerPersona>,
    #[serde(default)]
    pub brand_voice_profile: Option<String>,
}

fn default_interval() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    30
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_interval(),
            max_retries: default_max_retries(),
            image_retry_delay_seconds: default_retry_delay(),
            retry_strategy: RetryStrategy::Fixed,
            persona: None,
            brand_voice_profile: None,
        }
    }
}

impl AutopilotConfig {
    /// Clamp out-of-range values into their documented bounds.
    pub fn normalize(&mut self) {
        if self.interval_minutes < MIN_INTERVAL_MINUTES {
            warn!(
                "interval_minutes {} is below the minimum, using {}",
                self.interval_minutes, MIN_INTERVAL_MINUTES
            );
            self.interval_minutes = MIN_INTERVAL_MINUTES;
        } else if self.interval_minutes > MAX_INTERVAL_MINUTES {
            warn!(
                "interval_minutes {} is above the maximum, using {}",
                self.interval_minutes, MAX_INTERVAL_MINUTES
            );
            self.interval_minutes = MAX_INTERVAL_MINUTES;
        }
        if self.max_retries < MIN_RETRIES {
            warn!("max_retries {} is below the minimum, using {}", self.max_retries, MIN_RETRIES);
            self.max_retries = MIN_RETRIES;
        } else if self.max_retries > MAX_RETRIES {
            warn!("max_retries {} is above the maximum, using {}", self.max_retries, MAX_RETRIES);
            self.max_retries = MAX_RETRIES;
        }
        if self.image_retry_delay_seconds < MIN_RETRY_DELAY_SECONDS {
            warn!(
                "image_retry_delay_seconds {} is below the minimum, using {}",
                self.image_retry_delay_seconds, MIN_RETRY_DELAY_SECONDS
            );
            self.image_retry_delay_seconds = MIN_RETRY_DELAY_SECONDS;
        } else if self.image_retry_delay_seconds > MAX_RETRY_DELAY_SECONDS {
            warn!(
                "image_retry_delay_seconds {} is above the maximum, using {}",
                self.image_retry_delay_seconds, MAX_RETRY_DELAY_SECONDS
            );
            self.image_retry_delay_seconds = MAX_RETRY_DELAY_SECONDS;
        }
        if let Some(voice) = &self.brand_voice_profile
            && voice.trim().is_empty()
        {
            self.brand_voice_profile = None;
        }
    }
}

/// `null` on the wire clears the field, absence leaves it alone.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update for [`AutopilotConfig`]. Accepts snake_case or camelCase keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigPatch {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, alias = "intervalMinutes")]
    pub interval_minutes: Option<u64>,
    #[serde(default, alias = "maxRetries")]
    pub max_retries: Option<u32>,
    #[serde(default, alias = "imageRetryDelaySeconds")]
    pub image_retry_delay_seconds: Option<u64>,
    #[serde(default, alias = "retryStrategy")]
    pub retry_strategy: Option<RetryStrategy>,
    #[serde(default, deserialize_with = "double_option")]
    pub persona: Option<Option<CustomerPersona>>,
    #[serde(default, alias = "brandVoiceProfile", deserialize_with = "double_option")]
    pub brand_voice_profile: Option<Option<String>>,
}

impl ConfigPatch {
    pub fn apply(&self, config: &mut AutopilotConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(interval) = self.interval_minutes {
            config.interval_minutes = interval;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(delay) = self.image_retry_delay_seconds {
            config.image_retry_delay_seconds = delay;
        }
        if let Some(strategy) = self.retry_strategy {
            config.retry_strategy = strategy;
        }
        if let Some(persona) = &self.persona {
            config.persona = persona.clone();
        }
        if let Some(voice) = &self.brand_voice_profile {
            config.brand_voice_profile = voice.clone();
        }
        config.normalize();
    }
}

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Running,
    CreatingBlog,
    SearchingTopics,
    GeneratingTitle,
    CreatingOutline,
    WritingContent,
    GeneratingImages,
    GeneratingSeo,
    Publishing,
    Succeeded,
    Failed,
    WaitingForNextCycle,
    Stopped,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::CreatingBlog => "creating_blog",
            Self::SearchingTopics => "searching_topics",
            Self::GeneratingTitle => "generating_title",
            Self::CreatingOutline => "creating_outline",
            Self::WritingContent => "writing_content",
            Self::GeneratingImages => "generating_images",
            Self::GeneratingSeo => "generating_seo",
            Self::Publishing => "publishing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::WaitingForNextCycle => "waiting_for_next_cycle",
            Self::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub stage: Stage,
    pub detail: Option<String>,
}

impl Activity {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            detail: None,
        }
    }

    pub fn with_detail(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: Some(detail.into()),
        }
    }

    pub fn label(&self) -> String {
        let detail = self.detail.as_deref().unwrap_or_default();
        match self.stage {
            Stage::Idle => "Idle".to_string(),
            Stage::Running => "Running - Next blog creation scheduled".to_string(),
            Stage::CreatingBlog => "Creating new blog...".to_string(),
            Stage::SearchingTopics => "Searching for trending topics...".to_string(),
            Stage::GeneratingTitle => "Generating blog title...".to_string(),
            Stage::CreatingOutline => "Creating blog outline...".to_string(),
            Stage::WritingContent => "Writing blog content...".to_string(),
            Stage::GeneratingImages => "Generating images...".to_string(),
            Stage::GeneratingSeo => "Generating SEO metadata...".to_string(),
            Stage::Publishing => "Publishing to Shopify...".to_string(),
            Stage::Succeeded => format!("✅ Successfully created: \"{}\"", detail),
            Stage::Failed => format!("❌ Failed: {}", detail),
            Stage::WaitingForNextCycle => "Waiting for next cycle...".to_string(),
            Stage::Stopped => "Stopped".to_string(),
        }
    }
}

impl Serialize for Activity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Activity", 3)?;
        s.serialize_field("stage", &self.stage)?;
        s.serialize_field("detail", &self.detail)?;
        s.serialize_field("label", &self.label())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutopilotStats {
    pub total_blogs: u64,
    pub successful_blogs: u64,
    pub failed_blogs: u64,
    /// RFC 3339 timestamp of the last job start, or `"Never"`.
    pub last_run_time: String,
    /// Whether the timer is armed, not whether a job is executing.
    pub is_running: bool,
    pub current_activity: Activity,
}

impl Default for AutopilotStats {
    fn default() -> Self {
        Self {
            total_blogs: 0,
            successful_blogs: 0,
            failed_blogs: 0,
            last_run_time: "Never".to_string(),
            is_running: false,
            current_activity: Activity::new(Stage::Idle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Published {
        run_id: String,
        title: String,
        article_id: u64,
    },
    Failed {
        run_id: String,
        stage: Stage,
        reason: String,
    },
    /// Another job was already in flight.
    Skipped,
}
