use card_relay::config::Config;
use card_relay::handoff::HandoffCoordinator;
use card_relay::recognizer::HttpRecognizer;
use card_relay::session::SessionRegistry;
use card_relay::{extract, logging, metrics, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(name = "card_relay")]
#[command(about = "Card scan handoff relay - mobile capture to desktop session")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the handoff relay HTTP service
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the extraction engine over a saved recognizer text dump
    Extract {
        /// Path to a file holding raw recognized text
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            metrics::init_metrics();

            let config = Config::load()?;
            if config.resolved_base_url().is_none() {
                warn!("no public base URL configured; session creation will fail until one is set");
            }

            let registry = Arc::new(SessionRegistry::new(
                config.session.ttl_secs,
                config.session.sweep_interval_secs,
            ));
            let sweeper = registry.spawn_sweeper();

            let recognizer = Arc::new(HttpRecognizer::new(
                config.recognizer.endpoint.clone(),
                config.recognizer.timeout_secs,
            )?);
            let coordinator = Arc::new(HandoffCoordinator::new(
                registry,
                recognizer,
                config.resolved_base_url(),
            ));

            let port = port.unwrap_or(config.server.port);
            server::start_server(coordinator, port)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            sweeper.abort();
        }
        Commands::Extract { file } => {
            let text = std::fs::read_to_string(&file)?;
            let fields = extract::extract_fields(&text)?;
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
    }
    Ok(())
}
