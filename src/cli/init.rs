use anyhow::{Context, Result};
use std::path::Path;

use crate::core::config::{CONFIG_FILE, DEFAULT_CONFIG_TEMPLATE};
use crate::core::terminal::{GuideSection, print_success, print_warn};

pub async fn run_init(data_dir: &Path, force: bool) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() && !force {
        print_warn(&format!(
            "{} already exists. Pass --force to overwrite it.",
            path.display()
        ));
        return Ok(());
    }

    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("Could not create {}", data_dir.display()))?;
    tokio::fs::write(&path, DEFAULT_CONFIG_TEMPLATE).await?;
    print_success(&format!("Wrote {}", path.display()));

    GuideSection::new("Next steps")
        .command("export GEMINI_API_KEY=...", "Text generation key")
        .command("export SHOPIFY_STORE_NAME=...", "Store subdomain")
        .command("export SHOPIFY_ACCESS_TOKEN=...", "Admin API token")
        .command("blogpilot run", "Publish one post to check the setup")
        .print();
    Ok(())
}
