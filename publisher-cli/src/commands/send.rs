//! `publisher send` command - Post existing summaries to Telegram

use super::read_json;
use anyhow::{bail, Result};
use publisher_core::{Config, NotificationBatch, TelegramNotifier};
use std::path::Path;

pub async fn run(config: Config, file: &Path) -> Result<()> {
    config.validate_telegram()?;

    let batch: NotificationBatch = read_json(file)?;
    if batch.is_empty() {
        bail!("No summaries found in {}", file.display());
    }

    let notifier = TelegramNotifier::from_config(&config.telegram)?;
    if !notifier.send(&batch).await {
        bail!("Failed to send summaries to Telegram");
    }

    println!("✅ Sent {} summaries to Telegram", batch.len());
    Ok(())
}
