//! Memocache - maintenance CLI for the on-disk memoization cache
//!
//! Inspects and prunes the cache directory shared by processes that use the
//! `memocache` library.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memocache::{operation_ttl, CacheKey, Config, MemoCache};

#[derive(Parser, Debug)]
#[command(name = "memocache", version, about = "Inspect and manage the memoization cache")]
struct Cli {
    /// Cache directory (overrides MEMOCACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print cache statistics as JSON
    Stats,
    /// Derive the cache key for a request
    Key {
        /// Operation type, e.g. query or code_review
        #[arg(long)]
        operation: String,
        /// Primary content (prompt, diff, source)
        #[arg(long)]
        content: String,
        /// Keyword parameter as name=value; value is parsed as JSON when possible
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Print the default TTL in seconds for an operation type
    Ttl { operation: String },
    /// Print the cached value for a key
    Get { key: String },
    /// Remove one entry
    Invalidate { key: String },
    /// Remove every entry
    Clear,
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    if name.is_empty() {
        return Err("parameter name cannot be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn open_cache(cli_dir: Option<PathBuf>) -> anyhow::Result<MemoCache> {
    let mut config = Config::from_env().with_disk_cache(true);
    if let Some(dir) = cli_dir {
        config = config.with_cache_dir(dir);
    }
    let cache = MemoCache::new(config).context("failed to open cache")?;
    if !cache.is_persistent() {
        bail!(
            "cache directory {} is not usable",
            cache.config().cache_dir.display()
        );
    }
    Ok(cache)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Key {
            operation,
            content,
            params,
        } => {
            println!("{}", CacheKey::derive(&operation, &content, params));
        }
        Command::Ttl { operation } => {
            println!("{}", operation_ttl(&operation).as_secs());
        }
        Command::Stats => {
            let cache = open_cache(cli.cache_dir)?;
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
        Command::Get { key } => {
            let key = CacheKey::parse(&key)?;
            let cache = open_cache(cli.cache_dir)?;
            match cache.get(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => {
                    info!("No live entry for {}", key);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Invalidate { key } => {
            let key = CacheKey::parse(&key)?;
            let cache = open_cache(cli.cache_dir)?;
            if cache.invalidate(&key) {
                info!("Invalidated {}", key);
            } else {
                info!("No entry for {}", key);
            }
        }
        Command::Clear => {
            let cache = open_cache(cli.cache_dir)?;
            let size = cache.len();
            cache.clear();
            info!(
                "Cleared {} entries from {}",
                size,
                cache.config().cache_dir.display()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memocache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
