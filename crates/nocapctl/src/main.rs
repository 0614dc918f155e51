//! NoCap Control - CLI client for the NoCap verification daemon

use anyhow::Result;
use clap::{Parser, Subcommand};
use nocapctl::client::{resolve_server, NocapClient, SERVER_ENV};
use nocapctl::display;
use std::io::IsTerminal;

// Version is embedded at build time
const VERSION: &str = env!("NOCAP_VERSION");

#[derive(Parser)]
#[command(name = "nocapctl")]
#[command(about = "NoCap - check whether a news item is real, fake, or misleading", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Daemon URL (defaults to $NOCAP_URL, then http://localhost:5001)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a headline or article URL
    Check {
        /// Headline text, or an article URL to scrape
        title: String,

        /// Article body to send along with the headline
        #[arg(long)]
        text: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show credential usage and search credits
    Limits {
        /// Print the raw JSON report
        #[arg(long)]
        json: bool,
    },

    /// Show daemon health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server = resolve_server(cli.server, std::env::var(SERVER_ENV).ok());
    let client = NocapClient::new(server)?;
    let color = std::io::stdout().is_terminal();

    match cli.command {
        Commands::Check { title, text, json } => {
            let response = client.check(&title, text).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", display::render_prediction(&response, color));
            }
        }
        Commands::Limits { json } => {
            let report = client.limits().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", display::render_limits(&report, color));
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            print!("{}", display::render_health(&health, color));
        }
    }

    Ok(())
}
