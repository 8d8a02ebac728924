//! Batch helpers for callers of the pipeline.
//!
//! Picks a random subset of articles, summarizes them one after another,
//! and picks a random few of the results for delivery.

use crate::gemini::TextGenerator;
use crate::model::{Article, NotificationBatch, SummaryResult, SummarySource};
use crate::pipeline::SummarizationPipeline;
use rand::seq::{index, IndexedRandom};
use rand::Rng;
use thiserror::Error;
use tracing::info;

/// How many summaries go out in one Telegram message by default
pub const DEFAULT_DELIVERY_SIZE: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Only {available} articles available, cannot select {requested}")]
    NotEnoughArticles { available: usize, requested: usize },

    #[error("At least one article must be selected")]
    EmptySelection,
}

/// Outcome of summarizing a batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<SummaryResult>,
}

impl BatchReport {
    /// Summaries produced by the generative API
    pub fn generated(&self) -> usize {
        self.count(SummarySource::Generated)
    }

    /// Summaries produced by the extractive fallback
    pub fn fallback(&self) -> usize {
        self.count(SummarySource::Fallback)
    }

    fn count(&self, source: SummarySource) -> usize {
        self.results.iter().filter(|r| r.source == source).count()
    }
}

/// Randomly choose `count` distinct articles
pub fn select_articles<'a, R: Rng + ?Sized>(
    articles: &'a [Article],
    count: usize,
    rng: &mut R,
) -> Result<Vec<&'a Article>, BatchError> {
    if count == 0 {
        return Err(BatchError::EmptySelection);
    }
    if articles.len() < count {
        return Err(BatchError::NotEnoughArticles {
            available: articles.len(),
            requested: count,
        });
    }

    Ok(index::sample(rng, articles.len(), count)
        .into_iter()
        .map(|i| &articles[i])
        .collect())
}

/// Summarize articles strictly in order, one at a time
pub async fn process_batch<G: TextGenerator>(
    pipeline: &mut SummarizationPipeline<G>,
    articles: &[&Article],
) -> BatchReport {
    let mut results = Vec::with_capacity(articles.len());

    for (idx, article) in articles.iter().enumerate() {
        info!(
            "Processing article {}/{}: {}",
            idx + 1,
            articles.len(),
            article.title
        );
        results.push(pipeline.summarize(article).await);
    }

    let report = BatchReport { results };
    info!(
        "Batch complete: {} generated, {} fallback",
        report.generated(),
        report.fallback()
    );
    report
}

/// Randomly choose at most `max` results to send
pub fn pick_for_delivery<R: Rng + ?Sized>(
    results: &[SummaryResult],
    max: usize,
    rng: &mut R,
) -> NotificationBatch {
    results
        .choose_multiple(rng, max.min(results.len()))
        .cloned()
        .collect()
}
