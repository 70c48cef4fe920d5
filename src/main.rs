use std::path::PathBuf;

use clap::{Parser, Subcommand};
use idontreadpdfs::Result;
use idontreadpdfs::commands::{ask_once, serve};
use idontreadpdfs::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "idontreadpdfs")]
#[command(about = "Upload a PDF and let AI answer your questions about it")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the web interface
    Serve {
        /// Address to bind, overriding the configured host
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overriding the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer one question about a PDF from the command line
    Ask {
        /// Path to the PDF
        pdf: PathBuf,
        /// The question to answer
        question: String,
        /// Print the chunks the answer was based on
        #[arg(long)]
        sources: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| idontreadpdfs::AppError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Serve { host, port } => {
            serve(Config::load(&config_dir)?, host, port).await?;
        }
        Commands::Ask {
            pdf,
            question,
            sources,
        } => {
            ask_once(Config::load(&config_dir)?, &pdf, &question, sources).await?;
        }
    }

    Ok(())
}
