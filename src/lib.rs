pub mod cli;
pub mod core;
pub mod providers;
pub mod service;
pub mod store;

use crate::core::config::AppConfig;
use crate::service::ExchangeRateService;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    List,
    Get { codes: Vec<String> },
    Search { text: String },
    Convert { amount: String, code: Option<String> },
    Currency { code: Option<String> },
    Refresh,
    Status,
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    offline: bool,
) -> Result<()> {
    info!("coinrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = store::open_rate_store(&config);
    let service = ExchangeRateService::from_config(&config, store).await?;

    match command {
        AppCommand::List => cli::rates::list(&service, offline).await,
        AppCommand::Get { codes } => cli::rates::get(&service, &codes, offline).await,
        AppCommand::Search { text } => cli::rates::search(&service, &text, offline).await,
        AppCommand::Convert { amount, code } => {
            cli::rates::convert(&service, &amount, code.as_deref(), offline).await
        }
        AppCommand::Currency { code } => {
            cli::rates::currency(&service, &config, code.as_deref()).await
        }
        AppCommand::Refresh => cli::rates::refresh(&service).await,
        AppCommand::Status => cli::rates::status(&service, &config),
    }
}
