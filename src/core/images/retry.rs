use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use super::{ImageGenerator, ImageRequest, is_placeholder};
use crate::core::autopilot::RetryStrategy;

/// Delay between image attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    Fixed { delay: Duration },
    Exponential { base: Duration, max: Duration },
    /// Exponential with the upper half randomized.
    Jittered { base: Duration, max: Duration },
}

const BACKOFF_CAP_FACTOR: u32 = 16;

impl RetryPolicy {
    pub fn from_strategy(strategy: RetryStrategy, delay_seconds: u64) -> Self {
        let base = Duration::from_secs(delay_seconds.max(1));
        let max = base.saturating_mul(BACKOFF_CAP_FACTOR);
        match strategy {
            RetryStrategy::Fixed => Self::Fixed { delay: base },
            RetryStrategy::Exponential => Self::Exponential { base, max },
            RetryStrategy::Jittered => Self::Jittered { base, max },
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Exponential { base, max } => exponential(*base, *max, attempt),
            Self::Jittered { base, max } => {
                let full = exponential(*base, *max, attempt);
                let half = full / 2;
                let spread = (full - half).as_millis() as u64;
                let jitter = rand::thread_rng().gen_range(0..=spread);
                half.saturating_add(Duration::from_millis(jitter))
            }
        }
    }
}

fn exponential(base: Duration, max: Duration, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << shift).min(max)
}

/// Resolve prompts one at a time. The output is index-aligned with `prompts`;
/// a slot whose attempts all failed holds an empty string.
pub async fn resolve_images(
    prompts: &[String],
    generator: &dyn ImageGenerator,
    template: &ImageRequest,
    max_retries: u32,
    policy: &RetryPolicy,
) -> Vec<String> {
    let max_retries = max_retries.max(1);
    let mut resolved = Vec::with_capacity(prompts.len());

    for (index, prompt) in prompts.iter().enumerate() {
        let request = template.with_prompt(prompt);
        let mut image_url = String::new();
        let mut attempts = 0;

        while attempts < max_retries && image_url.is_empty() {
            attempts += 1;
            info!(
                "Generating image {}/{} (attempt {}/{})",
                index + 1,
                prompts.len(),
                attempts,
                max_retries
            );
            match generator.generate(&request).await {
                Ok(url) if !url.is_empty() && !is_placeholder(&url) => {
                    image_url = url;
                    break;
                }
                Ok(_) => warn!("Image {} came back as a placeholder", index + 1),
                Err(e) => warn!("Image {} generation failed: {}", index + 1, e),
            }
            if attempts < max_retries {
                let delay = policy.delay_for(attempts);
                info!("Retrying image {} in {:?}", index + 1, delay);
                tokio::time::sleep(delay).await;
            }
        }

        if image_url.is_empty() {
            warn!(
                "Giving up on image {} after {} attempts",
                index + 1,
                attempts
            );
        }
        resolved.push(image_url);
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::images::placeholder_url;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Succeeds for a given prompt on its n-th call, placeholder otherwise.
    #[derive(Default)]
    struct FlakyGenerator {
        succeed_on: HashMap<String, usize>,
        errors: bool,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl FlakyGenerator {
        fn calls_for(&self, prompt: &str) -> usize {
            self.calls.lock().unwrap().get(prompt).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl ImageGenerator for FlakyGenerator {
        async fn generate(&self, request: &ImageRequest) -> Result<String> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(request.prompt.clone()).or_insert(0);
                *n += 1;
                *n
            };
            match self.succeed_on.get(&request.prompt) {
                Some(target) if n >= *target => Ok(format!("https://img/{}.jpg", request.prompt)),
                _ if self.errors => Err(anyhow!("service down")),
                _ => Ok(placeholder_url(&request.prompt, &request.aspect_ratio)),
            }
        }
    }

    fn template() -> ImageRequest {
        ImageRequest {
            prompt: String::new(),
            aspect_ratio: "16:9".to_string(),
            style: "Default".to_string(),
            negative_prompt: String::new(),
        }
    }

    fn fixed(secs: u64) -> RetryPolicy {
        RetryPolicy::Fixed {
            delay: Duration::from_secs(secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_results_exhaust_exactly_max_retries() {
        let generator = FlakyGenerator::default();
        let started = Instant::now();
        let out = resolve_images(&["a".to_string()], &generator, &template(), 3, &fixed(30)).await;
        assert_eq!(out, vec![String::new()]);
        assert_eq!(generator.calls_for("a"), 3);
        // two sleeps between three attempts, none after the last
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(60) && waited < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_count_as_failed_attempts() {
        let generator = FlakyGenerator {
            errors: true,
            ..FlakyGenerator::default()
        };
        let out = resolve_images(&["a".to_string()], &generator, &template(), 2, &fixed(1)).await;
        assert_eq!(out, vec![String::new()]);
        assert_eq!(generator.calls_for("a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn output_stays_index_aligned() {
        let generator = FlakyGenerator {
            succeed_on: [("b".to_string(), 1)].into_iter().collect(),
            ..FlakyGenerator::default()
        };
        let prompts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let out = resolve_images(&prompts, &generator, &template(), 2, &fixed(5)).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "");
        assert_eq!(out[1], "https://img/b.jpg");
        assert_eq!(out[2], "");
        assert_eq!(generator.calls_for("b"), 1);
        assert_eq!(generator.total_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_third_attempt_stops_retrying() {
        let generator = FlakyGenerator {
            succeed_on: [("a".to_string(), 3)].into_iter().collect(),
            ..FlakyGenerator::default()
        };
        let out = resolve_images(&["a".to_string()], &generator, &template(), 5, &fixed(1)).await;
        assert_eq!(out, vec!["https://img/a.jpg".to_string()]);
        assert_eq!(generator.calls_for("a"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_still_makes_one_attempt() {
        let generator = FlakyGenerator::default();
        let out = resolve_images(&["a".to_string()], &generator, &template(), 0, &fixed(1)).await;
        assert_eq!(out, vec![String::new()]);
        assert_eq!(generator.calls_for("a"), 1);
    }

    #[tokio::test]
    async fn empty_prompt_list_resolves_to_empty() {
        let generator = FlakyGenerator::default();
        let out = resolve_images(&[], &generator, &template(), 3, &fixed(1)).await;
        assert!(out.is_empty());
    }

    #[test]
    fn exponential_doubles_up_to_cap() {
        let policy = RetryPolicy::from_strategy(RetryStrategy::Exponential, 2);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(30), Duration::from_secs(32));
    }

    #[test]
    fn jittered_stays_within_upper_half() {
        let policy = RetryPolicy::from_strategy(RetryStrategy::Jittered, 10);
        for _ in 0..50 {
            let d = policy.delay_for(2);
            assert!(d >= Duration::from_secs(10) && d <= Duration::from_secs(20));
        }
    }

    #[test]
    fn huge_base_delay_saturates_instead_of_overflowing() {
        for strategy in [RetryStrategy::Exponential, RetryStrategy::Jittered] {
            let policy = RetryPolicy::from_strategy(strategy, u64::MAX / 2);
            let base = Duration::from_secs(u64::MAX / 2);
            assert!(policy.delay_for(1) <= base);
            assert!(policy.delay_for(5) >= base / 2);
        }
    }

    #[test]
    fn fixed_ignores_attempt_number() {
        let policy = RetryPolicy::from_strategy(RetryStrategy::Fixed, 0);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(9), Duration::from_secs(1));
    }
}
