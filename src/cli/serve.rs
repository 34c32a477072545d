use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

use super::{ServeArgs, open_journal};
use crate::core::autopilot::{Autopilot, AutopilotComponent, AutopilotServices};
use crate::core::config::AppConfig;
use crate::core::images::FreeImageChain;
use crate::core::lifecycle::LifecycleManager;
use crate::core::terminal::{self, GuideSection, print_warn};
use crate::interfaces::web::{ApiServer, ApiServerConfig, auth};

pub async fn run_serve(
    data_dir: PathBuf,
    mut config: AppConfig,
    flags: ServeArgs,
    log_tx: broadcast::Sender<String>,
) -> Result<()> {
    config.server.host = flags.host;
    config.server.port = flags.port;
    if flags.autostart {
        config.autopilot.enabled = true;
    }

    let has_token = config
        .server
        .api_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_token && !auth::is_loopback(&config.server.host) {
        print_warn("No server.api_token set: every request will be refused on a non-loopback host.");
    }

    let journal = open_journal(&data_dir, &config).await;
    let images = Arc::new(FreeImageChain::from_settings(&config.images));
    let mut lifecycle = LifecycleManager::new().await?;
    let services = AutopilotServices::from_config(&config, journal);
    let autopilot = Arc::new(Autopilot::new(
        services,
        lifecycle.scheduler.clone(),
        config.autopilot.clone(),
    ));

    lifecycle.attach(Arc::new(Mutex::new(ApiServer::new(ApiServerConfig {
        autopilot: autopilot.clone(),
        images: images.clone(),
        log_tx,
        api_host: config.server.host.clone(),
        api_port: config.server.port,
        api_token: config.server.api_token.clone(),
    }))));
    lifecycle.attach(Arc::new(Mutex::new(AutopilotComponent::new(
        autopilot.clone(),
    ))));

    terminal::print_banner();
    lifecycle.start().await?;

    let api_url = format!("http://{}:{}", config.server.host, config.server.port);
    GuideSection::new("blogpilot is serving")
        .status("API", &api_url)
        .status("Data dir", &data_dir.display().to_string())
        .status(
            "Autopilot",
            if config.autopilot.enabled {
                "enabled"
            } else {
                "disabled (blogpilot autopilot start)"
            },
        )
        .status("Image services", &images.source_names().join(", "))
        .status(
            "Interval",
            &format!("{} minutes", autopilot.config().await.interval_minutes),
        )
        .blank()
        .text("Press Ctrl+C to stop.")
        .print();
    terminal::print_link("Live logs", &format!("{}/api/logs", api_url));

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await?;
    Ok(())
}
