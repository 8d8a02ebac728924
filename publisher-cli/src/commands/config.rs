//! `publisher config` commands - View and manage configuration

use super::truncate;
use anyhow::Result;
use publisher_core::Config;

/// Show current configuration
pub fn show(config: Config) -> Result<()> {
    println!("╭─────────────────────────────────────────╮");
    println!("│      Smart Publisher Configuration      │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Gemini                                  │");
    println!("│   Model:        {:<23} │", truncate(&config.gemini.model, 23));
    println!("│   API keys:     {:<23} │", config.gemini.api_keys.len());
    println!("│   Timeout:      {:<23} │", format!("{}s", config.gemini.timeout_secs));
    if config.gemini.prompt_template.is_some() {
        println!("│   Prompt:       {:<23} │", "custom");
    }
    println!("├─────────────────────────────────────────┤");
    println!("│ Pipeline                                │");
    println!("│   Max retries:  {:<23} │", config.pipeline.max_retries);
    println!("│   Backoff:      {:<23} │", format!("{}s", config.pipeline.initial_backoff_secs));
    println!("│   Max content:  {:<23} │", config.pipeline.max_content_length);
    println!(
        "│   Keep:         {:<23} │",
        format!("{} + {}", config.pipeline.intro_length, config.pipeline.conclusion_length)
    );
    println!("│   Cooldown:     {:<23} │", format!("{}s", config.quota.cooldown_secs));
    println!("├─────────────────────────────────────────┤");
    println!("│ Telegram                                │");
    println!(
        "│   Bot token:    {:<23} │",
        if config.telegram.bot_token.is_empty() { "(not set)" } else { "set" }
    );
    println!("│   Chat:         {:<23} │", truncate(&config.telegram.chat_id, 23));
    println!("│   Max retries:  {:<23} │", config.telegram.max_retries);
    println!("├─────────────────────────────────────────┤");
    println!("│ Logging                                 │");
    println!("│   Level:        {:<23} │", config.logging.level);
    println!("╰─────────────────────────────────────────╯");

    if let Some(path) = Config::default_config_path() {
        let exists = path.exists();
        println!(
            "\n📁 Config: {} {}",
            path.display(),
            if exists { "✓" } else { "(not created)" }
        );
    }

    Ok(())
}

/// Initialize default configuration
pub fn init(force: bool) -> Result<()> {
    let path = Config::default_config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

    if path.exists() && !force {
        println!(
            "⚠️  Configuration file already exists at: {}",
            path.display()
        );
        println!("   Use --force to overwrite.");
        return Ok(());
    }

    Config::ensure_dirs()?;

    let config = Config::default();
    config.save_to_file(&path)?;

    println!("✅ Created configuration file at: {}", path.display());
    println!("\n📝 Default configuration:");
    println!("{}", toml::to_string_pretty(&config)?);
    println!("Add your Gemini keys under [gemini] api_keys or set GEMINI_API_KEYS.");

    Ok(())
}
