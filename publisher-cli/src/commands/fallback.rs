//! `publisher fallback` command - Extractive summaries without the API

use super::read_json;
use anyhow::Result;
use publisher_core::{Article, FallbackSummarizer};
use std::path::Path;

pub fn run(file: &Path) -> Result<()> {
    let articles: Vec<Article> = read_json(file)?;
    let summarizer = FallbackSummarizer::new();

    for article in &articles {
        println!("── {}", article.title);
        println!("{}\n", summarizer.summarize(&article.title, &article.content));
    }

    Ok(())
}
