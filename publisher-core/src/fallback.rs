//! Extractive summaries that need no API.
//!
//! Used whenever the generative path is unavailable. The output is a
//! deterministic function of the title and content.

use std::fmt::Write;

/// Sentence fragments this short or shorter are ignored
const MIN_SENTENCE_CHARS: usize = 20;

/// A body sentence must have more words than this to be picked
const MIN_KEY_SENTENCE_WORDS: usize = 10;

const MAX_KEY_SENTENCES: usize = 2;

const KEYWORDS: [&str; 5] = ["important", "significant", "key", "main", "crucial"];

/// Deterministic intro/key-points/conclusion summarizer
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSummarizer;

impl FallbackSummarizer {
    pub fn new() -> Self {
        Self
    }

    /// Summarize without ever failing. Internal errors become a
    /// diagnostic string naming the title.
    pub fn summarize(&self, title: &str, content: &str) -> String {
        match self.try_summarize(title, content) {
            Ok(summary) => summary,
            Err(e) => format!("Unable to summarize '{}' due to an error: {}", title, e),
        }
    }

    fn try_summarize(&self, title: &str, content: &str) -> Result<String, std::fmt::Error> {
        let sentences = qualifying_sentences(content);

        if sentences.len() <= 3 {
            return Ok(content.to_string());
        }

        let intro = sentences[0];
        let conclusion = sentences[sentences.len() - 1];
        let key_sentences = sentences[1..sentences.len() - 1]
            .iter()
            .copied()
            .filter(|s| is_key_sentence(s))
            .take(MAX_KEY_SENTENCES);

        let mut out = String::new();
        write!(out, "Summary of '{}': {}", title, intro)?;
        for sentence in key_sentences {
            write!(out, ". {}", sentence)?;
        }
        write!(out, ". {}.", conclusion)?;

        Ok(out)
    }
}

/// Period-delimited, trimmed fragments longer than [`MIN_SENTENCE_CHARS`]
fn qualifying_sentences(content: &str) -> Vec<&str> {
    content
        .split('.')
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

fn is_key_sentence(sentence: &str) -> bool {
    if sentence.split_whitespace().count() <= MIN_KEY_SENTENCE_WORDS {
        return false;
    }
    let lower = sentence.to_lowercase();
    KEYWORDS.iter().any(|kw| lower.contains(kw))
}
