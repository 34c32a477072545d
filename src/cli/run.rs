use anyhow::{Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_cron_scheduler::JobScheduler;

use super::open_journal;
use crate::core::autopilot::{Autopilot, AutopilotServices, JobOutcome};
use crate::core::config::AppConfig;
use crate::core::terminal::{GuideSection, print_info, print_step, print_warn};

/// Run a single job in the foreground and report how it ended.
pub async fn run_once(data_dir: PathBuf, config: AppConfig) -> Result<()> {
    let journal = open_journal(&data_dir, &config).await;
    if journal.is_some() {
        print_info(&format!(
            "Recording this run in {}",
            AppConfig::journal_path(&data_dir).display()
        ));
    }
    let services = AutopilotServices::from_config(&config, journal);
    let scheduler = JobScheduler::new().await?;
    let autopilot = Arc::new(Autopilot::new(
        services,
        scheduler,
        config.autopilot.clone(),
    ));

    print_step("Creating a blog post...");
    match autopilot.run_cycle().await {
        JobOutcome::Published {
            run_id,
            title,
            article_id,
        } => {
            GuideSection::new("Published")
                .status("Title", &title)
                .status("Article ID", &article_id.to_string())
                .status("Run", &run_id)
                .print();
            Ok(())
        }
        JobOutcome::Failed {
            run_id,
            stage,
            reason,
        } => Err(anyhow!(
            "Run {} failed during {}: {}",
            run_id,
            stage.as_str(),
            reason
        )),
        JobOutcome::Skipped => {
            print_warn("Another blog creation is already in progress.");
            Ok(())
        }
    }
}
