//! # Smart Publisher Core
//!
//! Core library for Smart Publisher: summarize a batch of articles with
//! Gemini and post a digest to Telegram.
//!
//! This crate provides:
//! - Configuration management
//! - API key rotation with cooldowns
//! - Gemini `generateContent` client and error classification
//! - Summarization pipeline with retries, caching and fallback
//! - Deterministic extractive fallback summarizer
//! - Telegram delivery
//! - Batch selection helpers
//! - Shared data models

pub mod batch;
pub mod config;
pub mod fallback;
pub mod gemini;
pub mod model;
pub mod pipeline;
pub mod quota;
pub mod telegram;

pub use batch::{pick_for_delivery, process_batch, select_articles, BatchError, BatchReport};
pub use config::{Config, ConfigError, PipelineConfig, QuotaConfig, TelegramConfig};
pub use fallback::FallbackSummarizer;
pub use gemini::{classify, ErrorClass, GeminiClient, GeminiError, TextGenerator};
pub use model::*;
pub use pipeline::{PipelineError, SummarizationPipeline};
pub use quota::{Clock, ManualClock, QuotaError, QuotaTracker, SystemClock};
pub use telegram::{TelegramError, TelegramNotifier};
