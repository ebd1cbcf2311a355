use clap::{Parser, Subcommand};
use serde::Serialize;

use bookshelf_core::channel::redis::RedisChannel;
use bookshelf_core::channel::{CoverLookupRequest, CoverPublisher};
use bookshelf_core::config::{config_path, load_config, AppConfig};
use bookshelf_core::cover::prefer_candidate;
use bookshelf_core::lookup::{CatalogClient, CoverCandidate, IsbnCoverLookup};
use bookshelf_core::pipeline::catalog_clients;

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Book cover lookup and enrichment tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Query both catalogs for a title and show which cover would be chosen
    Lookup {
        /// Book title
        #[arg(required = true)]
        title: String,
    },

    /// Publish a cover request for an existing book
    Publish {
        /// Book id
        #[arg(long, required = true)]
        id: String,

        /// Book title
        #[arg(long, required = true)]
        title: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show effective configuration (file plus environment)
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Serialize)]
struct LookupReport {
    title: String,
    openlibrary: CoverCandidate,
    googlebooks: CoverCandidate,
    chosen: CoverCandidate,
    cover_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Lookup { title } => run_lookup(title, cli.json).await,
        Commands::Publish { id, title } => run_publish(id, title, cli.json).await,
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_lookup(title: &str, json: bool) -> CliResult {
    let cfg = AppConfig::from_env()?;
    let (openlibrary, googlebooks) = catalog_clients(&cfg.lookup)?;
    let (ol, gb) = tokio::join!(openlibrary.search_by_title(title), googlebooks.search_by_title(title));
    let chosen = prefer_candidate(ol.clone(), gb.clone());
    tracing::debug!(isbn = ?chosen.isbn, cover_url = ?chosen.cover_url, "chosen candidate");
    let cover_url = match (&chosen.cover_url, &chosen.isbn) {
        (Some(url), _) => Some(url.clone()),
        (None, Some(isbn)) => openlibrary.cover_by_isbn(isbn).await?,
        (None, None) => None,
    };
    let report = LookupReport {
        title: title.to_string(),
        openlibrary: ol,
        googlebooks: gb,
        chosen,
        cover_url,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_candidate(openlibrary.name(), &report.openlibrary);
        print_candidate(googlebooks.name(), &report.googlebooks);
        match &report.cover_url {
            Some(url) => println!("Cover: {}", url),
            None => println!("No cover found"),
        }
    }
    Ok(())
}

fn print_candidate(name: &str, c: &CoverCandidate) {
    println!(
        "{:<12} isbn={} cover={}",
        name,
        c.isbn.as_deref().unwrap_or("-"),
        c.cover_url.as_deref().unwrap_or("-")
    );
}

async fn run_publish(id: &str, title: &str, json: bool) -> CliResult {
    let cfg = AppConfig::from_env()?;
    if !cfg.cover.enabled {
        if json {
            println!("{}", serde_json::json!({ "published": false, "reason": "disabled" }));
        } else {
            println!("Cover service is disabled; nothing published");
        }
        return Ok(());
    }
    let channel = RedisChannel::open(&cfg.cover.redis_url)?;
    tracing::debug!(book_id = id, redis_url = %cfg.cover.redis_url, "publishing cover request");
    channel.publish(&CoverLookupRequest::new(id, title)).await?;
    if json {
        println!("{}", serde_json::json!({ "published": true, "id": id }));
    } else {
        println!("Published cover request for {}", id);
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&path, toml)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = AppConfig::from_env()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or("Could not determine config directory")?;
            let mut cfg = load_config()?;
            set_config_key(&mut cfg, key, value)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, toml::to_string_pretty(&cfg)?)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}

fn set_config_key(cfg: &mut AppConfig, key: &str, value: &str) -> CliResult {
    let parts: Vec<&str> = key.splitn(2, '.').collect();
    match parts.as_slice() {
        ["cover", sub] => match *sub {
            "enabled" => cfg.cover.enabled = value.parse()?,
            "redis_url" => cfg.cover.redis_url = value.to_string(),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        ["lookup", sub] => match *sub {
            "timeout_secs" => cfg.lookup.timeout_secs = value.parse()?,
            "openlibrary_url" => cfg.lookup.openlibrary_url = value.to_string(),
            "covers_url" => cfg.lookup.covers_url = value.to_string(),
            "google_books_url" => cfg.lookup.google_books_url = value.to_string(),
            "google_books_api_key" => cfg.lookup.google_books_api_key = Some(value.to_string()),
            _ => return Err(format!("Unknown key: {}", key).into()),
        },
        _ => return Err(format!("Unknown key: {}", key).into()),
    }
    Ok(())
}
