mod autopilot;
mod images;
mod init;
mod run;
mod serve;

use anyhow::Result;
use console::style;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::config::{self, AppConfig};
use crate::core::journal::RunJournal;
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("serve", "Start the control API and the autopilot scheduler")
        .command("run", "Create and publish a single blog post now")
        .print();

    GuideSection::new("Autopilot")
        .command("autopilot start", "Start the autopilot on a running server")
        .command("autopilot stop", "Stop the autopilot on a running server")
        .command("autopilot status", "Show counters and current activity")
        .print();

    GuideSection::new("Setup")
        .command("init", "Write a default config.toml")
        .command("images", "Check which image services are reachable")
        .print();

    println!(
        "\n {} {} <command> [subcommand]\n",
        style("Usage:").bold(),
        style("blogpilot").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServeArgs {
    pub host: String,
    pub port: u16,
    pub autostart: bool,
}

pub(crate) fn parse_serve_flags(
    args: &[String],
    start: usize,
    host: String,
    port: u16,
) -> ServeArgs {
    let mut parsed = ServeArgs {
        host,
        port,
        autostart: false,
    };
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    parsed.port = args[i + 1].parse().unwrap_or(parsed.port);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--host" => {
                if i + 1 < args.len() {
                    parsed.host = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--autostart" => {
                parsed.autostart = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    parsed
}

/// Where a client command finds the running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientArgs {
    pub api_url: String,
    pub token: Option<String>,
    pub interval_minutes: Option<u64>,
}

pub(crate) fn parse_client_flags(args: &[String], start: usize, config: &AppConfig) -> ClientArgs {
    let mut parsed = ClientArgs {
        api_url: format!("http://{}:{}", config.server.host, config.server.port),
        token: config.server.api_token.clone().filter(|t| !t.trim().is_empty()),
        interval_minutes: None,
    };
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--api-url" => {
                if i + 1 < args.len() {
                    parsed.api_url = args[i + 1].trim_end_matches('/').to_string();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--token" => {
                if i + 1 < args.len() {
                    parsed.token = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--interval" => {
                if i + 1 < args.len() {
                    parsed.interval_minutes = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    parsed
}

pub(crate) async fn load_config() -> Result<(PathBuf, AppConfig)> {
    let data_dir = config::data_dir();
    let config = AppConfig::load(&data_dir).await?;
    Ok((data_dir, config))
}

/// The journal is optional: a broken database only costs run history.
pub(crate) async fn open_journal(data_dir: &Path, config: &AppConfig) -> Option<RunJournal> {
    if !config.server.journal {
        return None;
    }
    match RunJournal::open(AppConfig::journal_path(data_dir)).await {
        Ok(journal) => Some(journal),
        Err(e) => {
            warn!("Run journal unavailable, continuing without it: {}", e);
            None
        }
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("");

    match cmd {
        "serve" => {
            let log_tx = crate::logging::init(false);
            let (data_dir, config) = load_config().await?;
            let flags = parse_serve_flags(
                &args,
                2,
                config.server.host.clone(),
                config.server.port,
            );
            serve::run_serve(data_dir, config, flags, log_tx).await
        }
        "run" => {
            crate::logging::init(false);
            let (data_dir, config) = load_config().await?;
            run::run_once(data_dir, config).await
        }
        "autopilot" => {
            let (_, config) = load_config().await?;
            let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");
            let client = parse_client_flags(&args, 3, &config);
            autopilot::run_autopilot_command(sub_cmd, &client).await
        }
        "images" => {
            crate::logging::init(true);
            let (_, config) = load_config().await?;
            images::run_images_command(&config).await
        }
        "init" => {
            let force = args.iter().skip(2).any(|a| a == "--force");
            init::run_init(&config::data_dir(), force).await
        }
        "" | "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command '{}'", other));
            print_help();
            Ok(())
        }
    }
}
