//! Telco Churn - Main Entry Point
//!
//! Churn prediction pipeline with preprocess, train, evaluate, and serve
//! subcommands.

use clap::Parser;
use telco_churn::cli::{cmd_evaluate, cmd_preprocess, cmd_serve, cmd_train, Cli, Commands};
use telco_churn::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telco_churn=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Preprocess {
            data,
            revision,
            output,
        } => {
            cmd_preprocess(&config, &data, revision.as_deref(), &output)?;
        }
        Commands::Train { data } => {
            cmd_train(&config, data)?;
        }
        Commands::Evaluate { data } => {
            cmd_evaluate(&config, data)?;
        }
        Commands::Serve { port, host } => {
            cmd_serve(&config, host, port).await?;
        }
    }

    Ok(())
}
