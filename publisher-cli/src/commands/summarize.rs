//! `publisher summarize` command - Summarize a random selection of articles

use super::{read_json, truncate};
use anyhow::{bail, Result};
use publisher_core::batch::DEFAULT_DELIVERY_SIZE;
use publisher_core::{
    pick_for_delivery, process_batch, select_articles, Article, Config, SummarizationPipeline,
    TelegramNotifier,
};
use std::path::Path;
use tracing::{debug, info};

pub async fn run(config: Config, file: &Path, count: usize, send: bool, json: bool) -> Result<()> {
    config.validate()?;
    if send {
        config.validate_telegram()?;
    }

    let articles: Vec<Article> = read_json(file)?;
    debug!("Loaded {} articles from {}", articles.len(), file.display());

    let mut rng = rand::rng();
    let selected = select_articles(&articles, count, &mut rng)?;

    let mut pipeline = SummarizationPipeline::from_config(&config)?;
    info!(
        "Summarizing {} articles with {} ({} of {} keys available)",
        selected.len(),
        config.gemini.model,
        pipeline.quota_mut().available_count(),
        pipeline.quota().len()
    );

    let report = process_batch(&mut pipeline, &selected).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        for (idx, result) in report.results.iter().enumerate() {
            let marker = if result.is_fallback() { " (fallback)" } else { "" };
            println!("── Summary {}: {}{}", idx + 1, truncate(&result.title, 60), marker);
            println!("{}\n", result.summary);
        }
        println!(
            "✅ {} summaries ({} generated, {} fallback)",
            report.results.len(),
            report.generated(),
            report.fallback()
        );
    }

    if send {
        let notifier = TelegramNotifier::from_config(&config.telegram)?;
        let batch = pick_for_delivery(&report.results, DEFAULT_DELIVERY_SIZE, &mut rng);

        if !notifier.send(&batch).await {
            bail!("Failed to send summaries to Telegram");
        }
        eprintln!("📱 Sent {} summaries to Telegram", batch.len());
    }

    Ok(())
}
