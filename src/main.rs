//! playlist-gateway
//!
//! Serves the playlist generator behind a fixed security-header policy, and
//! lets operators inspect or validate that policy from the command line.
//!
//! ```text
//! playlist-gateway serve   --config gateway.toml
//! playlist-gateway headers --path /api/playlists [--json]
//! playlist-gateway check   --config gateway.toml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use playlist_gateway::config::{self, ConfigError, GatewayConfig};
use playlist_gateway::lifecycle;
use playlist_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "playlist-gateway")]
#[command(about = "Security-header gateway for the playlist generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    Serve {
        /// TOML config file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override listener.bind_address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the headers applied to a request path
    Headers {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "/")]
        path: String,

        /// Print the whole policy table as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Validate a config file and report every problem
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => Ok(GatewayConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let mut config = load(config.as_deref())?;
            if let Some(bind) = bind {
                config = config::override_bind_address(config, bind)?;
            }
            logging::init_logging(&config.observability)?;
            tracing::info!("playlist-gateway v{} starting", env!("CARGO_PKG_VERSION"));

            lifecycle::start(config).await?;
        }
        Commands::Headers { config, path, json } => {
            let config = load(config.as_deref())?;
            let Some(table) = config.security.active_table()? else {
                eprintln!("security headers are disabled (security.enabled = false)");
                return Ok(ExitCode::SUCCESS);
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                for rule in table.headers_for(&path) {
                    println!("{}", rule);
                }
            }
        }
        Commands::Check { config } => match config::load_config(&config) {
            Ok(_) => println!("{}: ok", config.display()),
            Err(ConfigError::Validation(errors)) => {
                for error in &errors {
                    eprintln!("{}: {}", config.display(), error);
                }
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => {
                eprintln!("{}: {}", config.display(), e);
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
