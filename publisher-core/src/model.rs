//! Shared data models for Smart Publisher.
//!
//! This module contains the types passed between the pipeline, the
//! batch helpers and the Telegram sender.

use serde::{Deserialize, Serialize};

/// An article to summarize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Accepts `Title` as well, matching spreadsheet-style exports
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(alias = "Content")]
    pub content: String,
}

impl Article {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Where a summary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Produced by the generative API (possibly served from cache)
    #[default]
    Generated,
    /// Produced by the extractive fallback
    Fallback,
}

impl std::fmt::Display for SummarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummarySource::Generated => write!(f, "generated"),
            SummarySource::Fallback => write!(f, "fallback"),
        }
    }
}

/// An article together with its summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub title: String,
    pub content: String,
    pub summary: String,
    #[serde(default)]
    pub source: SummarySource,
}

impl SummaryResult {
    pub fn new(article: &Article, summary: impl Into<String>, source: SummarySource) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            summary: summary.into(),
            source,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SummarySource::Fallback
    }
}

/// Summaries rendered into one outgoing message, numbered in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationBatch {
    items: Vec<SummaryResult>,
}

impl NotificationBatch {
    pub fn new(items: Vec<SummaryResult>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[SummaryResult] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<SummaryResult>> for NotificationBatch {
    fn from(items: Vec<SummaryResult>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<SummaryResult> for NotificationBatch {
    fn from_iter<I: IntoIterator<Item = SummaryResult>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_accepts_capitalized_fields() {
        let article: Article =
            serde_json::from_str(r#"{"Title": "Hello", "Content": "World"}"#).unwrap();
        assert_eq!(article, Article::new("Hello", "World"));
    }

    #[test]
    fn test_summary_source_display() {
        assert_eq!(SummarySource::Generated.to_string(), "generated");
        assert_eq!(SummarySource::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_batch_is_a_plain_json_array() {
        let batch: NotificationBatch = vec![SummaryResult::new(
            &Article::new("T", "C"),
            "S",
            SummarySource::Fallback,
        )]
        .into();

        let json = serde_json::to_value(&batch).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["source"], "fallback");

        // A missing source defaults to generated
        let parsed: NotificationBatch =
            serde_json::from_str(r#"[{"title": "T", "content": "C", "summary": "S"}]"#).unwrap();
        assert_eq!(parsed.items()[0].source, SummarySource::Generated);
        assert!(!parsed.items()[0].is_fallback());
    }
}
