//! Summarization pipeline.
//!
//! Wraps a [`TextGenerator`] with content cleaning, prompt rendering,
//! API key rotation, exponential backoff, memoization and the
//! extractive fallback. [`SummarizationPipeline::generate_summary`]
//! always returns a summary.

use crate::config::{Config, PipelineConfig};
use crate::fallback::FallbackSummarizer;
use crate::gemini::{classify, ErrorClass, GeminiClient, GeminiError, TextGenerator};
use crate::model::{Article, SummaryResult, SummarySource};
use crate::quota::{QuotaError, QuotaTracker};
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::time::Duration;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Inserted between the kept head and tail of over-long content
pub const TRUNCATION_MARKER: &str = "...\n[Content truncated]...\n";

/// Built-in summary prompt. Receives `title` and `content`.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"
Role: You are an expert and experienced content curator and writer who specializes in creating engaging, natural-sounding article summaries.

Task: Create a concise, engaging summary of the following article that sounds like it was written by a human writer, not an AI.
Article Title: {{ title }}
Guidelines:
- Write in a natural, conversational tone while maintaining professionalism
- Focus on the most interesting and important points
- Use varied sentence structures and transitions
- Include specific details and numbers when relevant
- Avoid formulaic or robotic language
- Keep the summary to 1-2 short paragraphs
- Add contextual insights where appropriate
- Use light narrative elements to make the summary more engaging
Remember: The summary should flow naturally and feel like it was written by a human journalist or content writer, not an AI system.

Content: {{ content }}

Please provide a summary that captures both the substance and the human interest of this article.
"#;

/// Errors raised while assembling a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Quota error: {0}")]
    Quota(#[from] QuotaError),

    #[error("Gemini error: {0}")]
    Gemini(#[from] GeminiError),
}

/// Cache key: the title plus a cheap fingerprint of the content.
///
/// The fingerprint is a 64-bit SipHash, not a cryptographic digest, so two
/// different contents under the same title can collide and share a summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    title: String,
    fingerprint: u64,
}

impl CacheKey {
    fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            fingerprint: fingerprint(content),
        }
    }
}

/// Non-cryptographic content fingerprint
pub fn fingerprint(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"http\S+").expect("valid URL pattern"))
}

fn disallowed_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s.,!?-]").expect("valid character pattern"))
}

/// Strip URLs and unusual characters, collapse whitespace, and cut the
/// middle out of anything longer than `max_content_length` characters.
pub fn clean_content(text: &str, settings: &PipelineConfig) -> String {
    let text = url_pattern().replace_all(text, "");
    let text = disallowed_chars().replace_all(&text, "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let total = text.chars().count();
    if total <= settings.max_content_length {
        return text;
    }

    let intro: String = text.chars().take(settings.intro_length).collect();
    let conclusion: String = text
        .chars()
        .skip(total.saturating_sub(settings.conclusion_length))
        .collect();

    debug!(
        "Truncated content from {} to {} + {} characters",
        total,
        intro.chars().count(),
        conclusion.chars().count()
    );

    format!("{}{}{}", intro, TRUNCATION_MARKER, conclusion)
}

/// Render a summary prompt from a Tera template
pub fn build_prompt(template: &str, content: &str, title: &str) -> Result<String, GeminiError> {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("content", content);

    Tera::one_off(template, &context, false).map_err(|e| GeminiError::Prompt(e.to_string()))
}

/// Generates summaries through a [`TextGenerator`], rotating API keys on
/// quota errors and falling back to [`FallbackSummarizer`].
pub struct SummarizationPipeline<G> {
    generator: G,
    quota: QuotaTracker,
    session_key: String,
    cache: HashMap<CacheKey, String>,
    settings: PipelineConfig,
    prompt_template: String,
    fallback: FallbackSummarizer,
}

impl SummarizationPipeline<GeminiClient> {
    /// Build a Gemini-backed pipeline from configuration
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let client = GeminiClient::new(
            &config.gemini.model,
            Duration::from_secs(config.gemini.timeout_secs),
        )?
        .with_api_base(&config.gemini.api_base);

        let quota = QuotaTracker::new(config.gemini.api_keys.clone())?
            .with_cooldown(config.quota.cooldown());

        let pipeline = Self::new(client, quota, config.pipeline.clone());
        Ok(match &config.gemini.prompt_template {
            Some(template) => pipeline.with_prompt_template(template),
            None => pipeline,
        })
    }
}

impl<G: TextGenerator> SummarizationPipeline<G> {
    pub fn new(generator: G, quota: QuotaTracker, settings: PipelineConfig) -> Self {
        let session_key = quota.current().to_string();
        Self {
            generator,
            quota,
            session_key,
            cache: HashMap::new(),
            settings,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            fallback: FallbackSummarizer::new(),
        }
    }

    /// Replace the built-in prompt template
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn quota_mut(&mut self) -> &mut QuotaTracker {
        &mut self.quota
    }

    /// Number of memoized summaries
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Summarize `content`. Never fails; degrades to the fallback summary.
    pub async fn generate_summary(&mut self, content: &str, title: &str) -> String {
        self.summarize_text(content, title).await.0
    }

    /// Summarize an article and report where the summary came from
    pub async fn summarize(&mut self, article: &Article) -> SummaryResult {
        let (summary, source) = self.summarize_text(&article.content, &article.title).await;
        SummaryResult::new(article, summary, source)
    }

    #[instrument(skip(self, content), fields(content_len = content.len()))]
    async fn summarize_text(&mut self, content: &str, title: &str) -> (String, SummarySource) {
        let key = CacheKey::new(title, content);
        if let Some(summary) = self.cache.get(&key) {
            debug!("Cache hit");
            return (summary.clone(), SummarySource::Generated);
        }

        match self.generate_with_retries(content, title).await {
            Some(summary) => {
                self.cache.insert(key, summary.clone());
                (summary, SummarySource::Generated)
            }
            None => {
                info!("Using fallback summary");
                (self.fallback.summarize(title, content), SummarySource::Fallback)
            }
        }
    }

    /// `None` means the caller should fall back
    async fn generate_with_retries(&mut self, content: &str, title: &str) -> Option<String> {
        let max_retries = self.settings.max_retries;
        let mut attempt: u32 = 0;
        // Each key may hit its quota at most once per call
        let mut quota_failures: usize = 0;

        while attempt < max_retries {
            let current = self.quota.current().to_string();
            if !self.quota.is_available(&current) {
                let next = self.quota.rotate_to_available()?;
                self.bind_session(next);
                continue;
            }

            let cleaned = clean_content(content, &self.settings);
            let result = match build_prompt(&self.prompt_template, &cleaned, title) {
                Ok(prompt) => self.generator.generate(&self.session_key, &prompt).await,
                Err(e) => Err(e),
            };

            let error = match result {
                Ok(summary) => return Some(summary),
                Err(e) => e,
            };

            match classify(&error) {
                ErrorClass::QuotaExceeded => {
                    warn!("Quota exceeded for current key: {}", error);
                    self.quota.mark_exhausted(&current);
                    quota_failures += 1;
                    if quota_failures >= self.quota.len() {
                        warn!("Every API key hit its quota during this call");
                        return None;
                    }
                    let next = self.quota.rotate_to_available()?;
                    self.bind_session(next);
                }
                ErrorClass::Transient => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!("Giving up after {} attempts: {}", attempt, error);
                        return None;
                    }

                    let backoff = self.backoff(attempt);
                    warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, max_retries, backoff, error
                    );
                    tokio::time::sleep(backoff).await;
                }
                ErrorClass::Fatal => {
                    warn!("Unrecoverable generation error: {}", error);
                    return None;
                }
            }
        }

        None
    }

    /// `initial_backoff * 2^attempt`
    fn backoff(&self, attempt: u32) -> Duration {
        self.settings
            .initial_backoff()
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn bind_session(&mut self, key: String) {
        debug!(
            "Rebinding model session to key {:?}",
            self.quota.position(&key)
        );
        self.session_key = key;
    }
}
