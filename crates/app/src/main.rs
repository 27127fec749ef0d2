mod cli;
mod commands;
mod config;

use clap::Parser;
use lumiere_cloud::CloudClients;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::commands::App;
use crate::config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let cli = Cli::parse();

    let clients = CloudClients::from_config(&config.cloud).await;
    tracing::debug!(clients = ?clients, "Collaborators initialised");

    let app = App { config, clients };

    match cli.command {
        Command::Generate(args) => commands::generate(&app, args).await,
        Command::History(command) => commands::history(&app, command).await,
        Command::Feedback(command) => commands::feedback(&app, command).await,
    }
}

/// Logs go to stderr so command output on stdout stays scriptable.
fn init_tracing(format: LogFormat) {
    let (text, json) = match format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lumiere=info,lumiere_pipeline=info,lumiere_history=info,lumiere_cloud=warn".into()
            }),
        )
        .with(text)
        .with(json)
        .init();
}
