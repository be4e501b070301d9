use crate::config::Config;
use crate::providers::Provider;
use crate::{log_debug, log_info, log_warn};
use anyhow::Context;
use clap::{Parser, Subcommand, crate_version};
use std::path::PathBuf;

/// CLI structure defining the available commands and global arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version = crate_version!(),
    about = "code-scribe: explain, diagram, and refactor code with an LLM",
    long_about = "code-scribe serves a small web UI and JSON API that forwards code to a hosted LLM \
                  and returns an HTML explanation, a Mermaid flowchart, refactored code, or chat answers.",
    after_help = get_dynamic_help(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Append log lines to this file instead of the configured one
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<String>,

    /// Do not mirror log lines to stdout
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Include HTTP client and server library logs
    #[arg(long = "verbose", global = true)]
    pub verbose: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server (default)
    Serve {
        /// Address to bind, overriding the configuration
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overriding the configuration
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List supported LLM providers and the variables holding their keys
    Providers,
}

fn get_dynamic_help() -> String {
    let providers_list = Provider::ALL
        .iter()
        .map(|p| format!("{} ({})", p.name(), p.api_key_env()))
        .collect::<Vec<_>>()
        .join(" • ");

    format!("\nAvailable LLM Providers: {providers_list}")
}

/// Parse the command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Main function to parse arguments and handle the command
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    // Pull a local .env into the environment before reading any keys
    if let Ok(path) = dotenv::dotenv() {
        log_debug!("Loaded environment from {}", path.display());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let log_file = cli.log_file.clone().unwrap_or_else(|| config.log_file.clone());
    crate::logger::set_log_file(&log_file)
        .with_context(|| format!("Failed to open log file {log_file}"))?;
    crate::logger::set_log_to_stdout(!cli.quiet);
    if cli.verbose {
        crate::logger::set_verbose_logging(true);
    }

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if config.credential().is_err() {
                log_warn!(
                    "No usable API key for provider '{}'; API calls will report a configuration error",
                    config.default_provider
                );
            }
            log_info!("Starting code-scribe {}", crate_version!());
            crate::server::serve(&config).await
        }
        Commands::Providers => {
            for provider in Provider::ALL {
                println!(
                    "{:<10} default model: {:<28} key: {}",
                    provider.name(),
                    provider.default_model(),
                    provider.api_key_env()
                );
            }
            Ok(())
        }
    }
}
