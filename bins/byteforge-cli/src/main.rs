mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "byteforge-cli")]
#[command(about = "ByteForge CLI - Run Java programs against the ByteForge execution service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the environment configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    /// Execution service endpoint (defaults to BYTEFORGE_EXECUTION_URL)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bearer token of the logged-in user (defaults to BYTEFORGE_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Request timeout in seconds, 0 for none (defaults to BYTEFORGE_TIMEOUT_SECONDS)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a single program
    Run {
        /// Java source file
        #[arg(short, long)]
        file: PathBuf,

        /// Program input passed on stdin
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read program input from a file
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Start an interactive compiler session
    Session {
        #[command(flatten)]
        client: ClientArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so program output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            input_file,
            json,
            client,
        } => {
            let passed =
                commands::run_program(&file, input.as_deref(), input_file.as_deref(), json, &client)
                    .await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Session { client } => {
            commands::interactive_session(&client).await?;
        }
    }

    Ok(())
}
