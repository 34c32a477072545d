use anyhow::Result;
use console::style;

use crate::core::config::AppConfig;
use crate::core::images::FreeImageChain;
use crate::core::terminal::{GuideSection, print_warn};

pub async fn run_images_command(config: &AppConfig) -> Result<()> {
    let chain = FreeImageChain::from_settings(&config.images);
    let probes = chain.probe_services().await;
    if probes.is_empty() {
        print_warn("No image services configured; every image will be a placeholder.");
        return Ok(());
    }

    let mut section = GuideSection::new("Image services");
    for probe in &probes {
        let status = if probe.available {
            style("AVAILABLE").green().bold().to_string()
        } else {
            style("UNREACHABLE").red().bold().to_string()
        };
        section = section.status(&probe.service, &status);
    }
    section.print();

    if !probes.iter().any(|p| p.available) {
        print_warn("No service answered; posts will fall back to placeholder images.");
    }
    Ok(())
}
