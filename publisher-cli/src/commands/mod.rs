//! CLI command implementations

pub mod config;
pub mod fallback;
pub mod send;
pub mod summarize;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read a JSON document from disk
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid JSON article list", path.display()))
}

/// Shorten for single-line display
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use publisher_core::Article;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn test_read_json_articles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(
            &path,
            r#"[{"title": "A", "content": "one"}, {"Title": "B", "Content": "two"}]"#,
        )
        .unwrap();

        let articles: Vec<Article> = read_json(&path).unwrap();
        assert_eq!(articles, vec![Article::new("A", "one"), Article::new("B", "two")]);

        let missing = read_json::<Vec<Article>>(&dir.path().join("missing.json"));
        assert!(missing.is_err());
    }
}
