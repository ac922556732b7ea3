//! Proxifront CLI - inspect client setup and render descriptions
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use proxifront::cache::{self, CacheEngine, CacheEngineRef};
use proxifront::render::TextExtra;
use proxifront::{
    logging, ApiClient, ClientConfig, ClientConfigBuilder, Cookies, Settings, TemplateFunctions,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "proxifront")]
#[command(
    author,
    version,
    about = "Scraping API client setup and description rendering",
    long_about = None
)]
struct Cli {
    /// Cookie header of the request to simulate (e.g. "api-test_endpoints=yes; theme=card")
    #[arg(long, global = true)]
    cookie: Option<String>,
    /// Config file to use instead of proxifront.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved client configuration
    Config,
    /// Render a description with mention and hashtag links
    Render {
        /// Raw description text
        text: String,
        /// JSON file with the upstream textExtra list
        #[arg(long)]
        extras: Option<PathBuf>,
    },
    /// Fetch a JSON document through the configured client
    Fetch {
        /// URL to fetch
        url: String,
    },
    /// Work with the configured cache engine
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print a cached value
    Get { key: String },
    /// Store a value
    Set {
        key: String,
        value: String,
        /// Time to live in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },
    /// Remove a value
    Delete { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let cookies = cli.cookie.as_deref().map(Cookies::parse).unwrap_or_default();

    match cli.command {
        Some(Commands::Render { text, extras }) => {
            let extras: Vec<TextExtra> = match extras {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => Vec::new(),
            };
            let functions = TemplateFunctions::from_provider(&settings, cookies);
            println!("{}", functions.render_desc(&text, &extras));
        }
        Some(Commands::Fetch { url }) => {
            let client = ApiClient::from_provider(&settings, Some(&cookies))?;
            let value = client.fetch_json(&url).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Some(Commands::Cache { action }) => {
            let Some(cache) = cache::from_config(&settings)? else {
                anyhow::bail!("no cache configured, set API_CACHE to json, apcu or redis");
            };
            match action {
                CacheAction::Get { key } => match cache.get(&key)? {
                    Some(value) => println!("{}", value),
                    None => println!("{}", "(miss)".dimmed()),
                },
                CacheAction::Set { key, value, ttl } => {
                    cache.set(&key, &value, Duration::from_secs(ttl))?;
                    println!("{} {}", "✓".green(), key);
                }
                CacheAction::Delete { key } => {
                    if cache.delete(&key)? {
                        println!("{} {}", "✓".green(), key);
                    } else {
                        println!("{}", "(not found)".dimmed());
                    }
                }
            }
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "proxifront",
                &mut std::io::stdout(),
            );
        }
        Some(Commands::Config) | None => {
            let config = ClientConfigBuilder::new(&settings).cookies(&cookies).build()?;
            if let Some(path) = settings.source() {
                println!("{} {}\n", "Config file:".bold(), path.display());
            }
            print_config(&config);
        }
    }

    Ok(())
}

fn print_config(config: &ClientConfig) {
    let signer = config.signer();
    println!("{}", "Signer".bold());
    println!("  method: {}", signer.method.as_str());
    if !signer.url.is_empty() {
        println!("  url:    {}", signer.url);
    }

    println!("{}", "Proxy".bold());
    match config.proxy() {
        Some(proxy) => {
            println!("  {}", proxy.url());
            if let Some(username) = &proxy.username {
                println!("  username: {}", username);
            }
            if proxy.password.is_some() {
                println!("  password: ***");
            }
        }
        None => println!("  {}", "none".dimmed()),
    }

    println!("{}", "Cache".bold());
    match config.cache() {
        Some(CacheEngineRef::Json { dir }) => println!("  json ({})", dir.display()),
        Some(CacheEngineRef::Apcu) => println!("  apcu"),
        Some(CacheEngineRef::Redis(redis)) => {
            let auth = if redis.password.is_some() { " (password set)" } else { "" };
            println!("  redis {}:{}{}", redis.host, redis.port, auth);
        }
        None => println!("  {}", "disabled".dimmed()),
    }

    println!("{}", "Client".bold());
    println!(
        "  user agent:     {}",
        config.user_agent().unwrap_or(proxifront::client::DEFAULT_USER_AGENT)
    );
    let test_endpoints = if config.test_endpoints() {
        "yes".yellow()
    } else {
        "no".normal()
    };
    println!("  test endpoints: {}", test_endpoints);
}
