#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, Provider};
use crate::chunking::ChunkingConfig;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 IDontReadPDFs Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Provider").bold().yellow());
    eprintln!("Choose the hosted API used for embeddings and answers.");
    eprintln!();

    configure_provider(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config)?;

    eprintln!();
    let key_var = config.api_key_env().to_string();
    if super::read_api_key(&key_var).is_some() {
        eprintln!("{}", style(format!("✓ {} is set", key_var)).green());
    } else {
        eprintln!(
            "{}",
            style(format!("⚠ Warning: {} is not set", key_var)).yellow()
        );
        eprintln!(
            "You can continue, but requests will fail until the key is exported or added to .env."
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    let (base_url, embedding_model, chat_model) = match config.provider {
        Provider::OpenAi => (
            &config.openai.base_url,
            &config.openai.embedding_model,
            &config.openai.chat_model,
        ),
        Provider::Gemini => (
            &config.gemini.base_url,
            &config.gemini.embedding_model,
            &config.gemini.chat_model,
        ),
    };

    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.provider).cyan());
    eprintln!("  Base URL: {}", style(base_url).cyan());
    eprintln!("  Embedding Model: {}", style(embedding_model).cyan());
    eprintln!("  Chat Model: {}", style(chat_model).cyan());

    let key_var = config.api_key_env();
    match super::read_api_key(key_var) {
        Some(_) => eprintln!("  API Key: {} ({})", style("set").green(), key_var),
        None => eprintln!("  API Key: {} ({})", style("missing").red(), key_var),
    }

    let chunking = config.chunking();
    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(chunking.chunk_size).cyan());
    eprintln!("  Chunk Overlap: {}", style(chunking.chunk_overlap).cyan());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!("{}", style("Server Settings:").bold().yellow());
    eprintln!("  Address: {}", style(config.server.bind_address()).cyan());
    eprintln!(
        "  Upload Directory: {}",
        style(config.upload_dir().display()).cyan()
    );
    eprintln!(
        "  Session Idle Timeout: {} minutes",
        style(config.server.session_idle_minutes).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_provider(config: &mut Config) -> Result<()> {
    let providers = Provider::ALL;
    let default_index = providers
        .iter()
        .position(|&p| p == config.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("API provider")
        .default(default_index)
        .items(&providers.map(|p| p.to_string()))
        .interact()?;
    config.set_provider(providers[provider_index]);

    let (embedding_model, chat_model) = match config.provider {
        Provider::OpenAi => (&mut config.openai.embedding_model, &mut config.openai.chat_model),
        Provider::Gemini => (&mut config.gemini.embedding_model, &mut config.gemini.chat_model),
    };

    *embedding_model = prompt_model("Embedding model", embedding_model)?;
    *chat_model = prompt_model("Chat model", chat_model)?;

    Ok(())
}

fn prompt_model(prompt: &str, current: &str) -> Result<String> {
    let model: String = Input::new()
        .with_prompt(prompt)
        .default(current.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(model)
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    let current = config.chunking();

    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(current.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(current.chunk_overlap.min(chunk_size - 1))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input >= chunk_size {
                Err("Overlap must be smaller than the chunk size")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 100")
            }
        })
        .interact_text()?;

    let chunking = ChunkingConfig::new(chunk_size, chunk_overlap);
    if chunking == config.provider.default_chunking() {
        config.chunking = None;
    } else {
        config.set_chunking(chunking)?;
    }
    config.set_top_k(top_k)?;

    Ok(())
}
