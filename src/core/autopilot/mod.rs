mod pipeline;
mod types;


use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

pub use types::{
    Activity, AutopilotConfig, AutopilotStats, ConfigPatch, JobOutcome, RetryStrategy, Stage,
};

use crate::core::config::{AppConfig, ContentSettings};
use crate::core::content::{BlogWriter, LlmBlogWriter};
use crate::core::images::{FreeImageChain, ImageGenerator, ImageRequest};
use crate::core::journal::{RunJournal, RunStatus, RunSummary};
use crate::core::lifecycle::LifecycleComponent;
use crate::core::llm::GeminiClient;
use crate::core::publish::{Publisher, ShopifyClient, StoreCredentials};
use pipeline::Published;

const WAITING_RELABEL_DELAY: Duration = Duration::from_secs(5);

/// Collaborators a job talks to.
#[derive(Clone)]
pub struct AutopilotServices {
    pub writer: Arc<dyn BlogWriter>,
    pub images: Arc<dyn ImageGenerator>,
    pub publisher: Arc<dyn Publisher>,
    pub credentials: StoreCredentials,
    pub image_request: ImageRequest,
    pub content: ContentSettings,
    pub journal: Option<RunJournal>,
}

impl AutopilotServices {
    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &AppConfig, journal: Option<RunJournal>) -> Self {
        let generator = Arc::new(GeminiClient::new(&config.gemini));
        Self {
            writer: Arc::new(LlmBlogWriter::new(generator, config.content.clone())),
            images: Arc::new(FreeImageChain::from_settings(&config.images)),
            publisher: Arc::new(ShopifyClient::new(&config.shopify)),
            credentials: StoreCredentials::from_settings(&config.shopify),
            image_request: ImageRequest::from_settings(&config.images),
            content: config.content.clone(),
            journal,
        }
    }
}

struct AutopilotState {
    config: AutopilotConfig,
    stats: AutopilotStats,
}

/// Owns the recurring schedule and guarantees at most one job in flight.
pub struct Autopilot {
    services: AutopilotServices,
    scheduler: JobScheduler,
    state: Mutex<AutopilotState>,
    timer: Mutex<Option<Uuid>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the job ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Autopilot {
    pub fn new(
        services: AutopilotServices,
        scheduler: JobScheduler,
        mut config: AutopilotConfig,
    ) -> Self {
        config.normalize();
        Self {
            services,
            scheduler,
            state: Mutex::new(AutopilotState {
                config,
                stats: AutopilotStats::default(),
            }),
            timer: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn config(&self) -> AutopilotConfig {
        self.state.lock().await.config.clone()
    }

    pub async fn stats(&self) -> AutopilotStats {
        self.state.lock().await.stats.clone()
    }

    pub fn is_job_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Option<&RunJournal> {
        self.services.journal.as_ref()
    }

    async fn set_stage(&self, stage: Stage) {
        self.state.lock().await.stats.current_activity = Activity::new(stage);
    }

    /// Merge `patch`, run one job right away and arm the repeating timer.
    /// Calling it while already running replaces the timer.
    pub async fn start(self: &Arc<Self>, patch: ConfigPatch) -> Result<()> {
        let mut timer = self.timer.lock().await;

        let mut preview = self.state.lock().await.config.clone();
        patch.apply(&mut preview);
        let interval_minutes = preview.interval_minutes;

        // Nothing is committed until the new timer is registered.
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = Duration::from_secs(interval_minutes.saturating_mul(60));
        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(autopilot) = weak.upgrade() {
                    autopilot.run_cycle().await;
                }
            })
        })?;
        let id = self.scheduler.add(job).await?;

        if let Some(previous) = timer.replace(id)
            && let Err(e) = self.scheduler.remove(&previous).await
        {
            warn!("Could not remove previous autopilot timer: {}", e);
        }

        {
            let mut state = self.state.lock().await;
            patch.apply(&mut state.config);
            state.config.enabled = true;
            state.stats.is_running = true;
            state.stats.current_activity = Activity::new(Stage::Running);
        }
        info!("Autopilot started, creating a blog every {} minutes", interval_minutes);

        let first = Arc::clone(self);
        tokio::spawn(async move {
            first.run_cycle().await;
        });
        Ok(())
    }

    /// Disarm the timer. Safe to call repeatedly; an in-flight job still finishes.
    pub async fn stop(&self) {
        let mut timer = self.timer.lock().await;
        if let Some(id) = timer.take()
            && let Err(e) = self.scheduler.remove(&id).await
        {
            warn!("Could not remove autopilot timer: {}", e);
        }

        let mut state = self.state.lock().await;
        let was_running = state.stats.is_running;
        state.config.enabled = false;
        state.stats.is_running = false;
        state.stats.current_activity = Activity::new(Stage::Stopped);
        if was_running {
            info!("Autopilot stopped");
        }
    }

    /// Merge `patch` and reconcile the timer with the resulting `enabled` flag.
    pub async fn update_config(self: &Arc<Self>, patch: ConfigPatch) -> Result<()> {
        let enabled = {
            let mut state = self.state.lock().await;
            patch.apply(&mut state.config);
            state.config.enabled
        };
        let armed = self.timer.lock().await.is_some();

        if enabled && !armed {
            if let Err(e) = self.start(ConfigPatch::default()).await {
                self.state.lock().await.config.enabled = false;
                return Err(e);
            }
        } else if !enabled && armed {
            self.stop().await;
        }
        Ok(())
    }

    /// Run one job unless another is already in flight.
    pub async fn run_cycle(self: &Arc<Self>) -> JobOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Blog creation already in progress, skipping this cycle");
            return JobOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let run_id = Uuid::new_v4().to_string();
        let config = {
            let mut state = self.state.lock().await;
            state.stats.current_activity = Activity::new(Stage::CreatingBlog);
            state.stats.last_run_time = chrono::Utc::now().to_rfc3339();
            state.config.clone()
        };
        info!("Starting automated blog creation cycle {}", run_id);
        if let Some(journal) = self.journal()
            && let Err(e) = journal.begin_run(&run_id).await
        {
            warn!("Could not record run {}: {}", run_id, e);
        }

        let mut job = pipeline::Job::new(self, &config, &run_id);
        let result = job.run().await;
        let failed_stage = job.stage;

        let (outcome, status, summary) = match result {
            Ok(Published { title, article_id }) => {
                info!("Successfully published blog article ID: {}", article_id);
                let mut state = self.state.lock().await;
                state.stats.total_blogs += 1;
                state.stats.successful_blogs += 1;
                state.stats.current_activity = Activity::with_detail(Stage::Succeeded, &title);
                (
                    JobOutcome::Published {
                        run_id: run_id.clone(),
                        title: title.clone(),
                        article_id,
                    },
                    RunStatus::Succeeded,
                    RunSummary {
                        title: Some(title),
                        article_id: Some(article_id),
                        ..RunSummary::default()
                    },
                )
            }
            Err(e) => {
                let reason = e.to_string();
                error!(
                    "Autopilot blog creation failed at {}: {:#}",
                    failed_stage.as_str(),
                    e
                );
                let mut state = self.state.lock().await;
                state.stats.total_blogs += 1;
                state.stats.failed_blogs += 1;
                state.stats.current_activity = Activity::with_detail(Stage::Failed, &reason);
                (
                    JobOutcome::Failed {
                        run_id: run_id.clone(),
                        stage: failed_stage,
                        reason: reason.clone(),
                    },
                    RunStatus::Failed,
                    RunSummary {
                        error: Some(reason),
                        failed_stage: Some(failed_stage.as_str().to_string()),
                        ..RunSummary::default()
                    },
                )
            }
        };

        if let Some(journal) = self.journal()
            && let Err(e) = journal.finish_run(&run_id, status, &summary).await
        {
            warn!("Could not finish run {} in journal: {}", run_id, e);
        }

        if self.state.lock().await.stats.is_running {
            self.schedule_waiting_label();
        }
        outcome
    }

    fn schedule_waiting_label(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(WAITING_RELABEL_DELAY).await;
            let Some(autopilot) = weak.upgrade() else {
                return;
            };
            let mut state = autopilot.state.lock().await;
            // a newer job may already be reporting its own progress
            if state.stats.is_running && state.stats.current_activity.stage.is_terminal() {
                state.stats.current_activity = Activity::new(Stage::WaitingForNextCycle);
            }
        });
    }
}

/// Hooks the autopilot into the application lifecycle.
pub struct AutopilotComponent {
    autopilot: Arc<Autopilot>,
}

impl AutopilotComponent {
    pub fn new(autopilot: Arc<Autopilot>) -> Self {
        Self { autopilot }
    }
}

#[async_trait::async_trait]
impl LifecycleComponent for AutopilotComponent {
    async fn on_start(&mut self) -> Result<()> {
        if self.autopilot.config().await.enabled {
            self.autopilot.start(ConfigPatch::default()).await?;
        } else {
            info!("Autopilot is disabled; start it from the API or CLI");
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        self.autopilot.stop().await;
        Ok(())
    }
}
