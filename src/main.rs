use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinrates::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Only use cached rates, never contact the rate feeds
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinrates::AppCommand {
    fn from(cmd: Commands) -> coinrates::AppCommand {
        match cmd {
            Commands::List => coinrates::AppCommand::List,
            Commands::Get { codes } => coinrates::AppCommand::Get { codes },
            Commands::Search { text } => coinrates::AppCommand::Search { text },
            Commands::Convert { amount, code } => coinrates::AppCommand::Convert { amount, code },
            Commands::Currency { code } => coinrates::AppCommand::Currency { code },
            Commands::Refresh => coinrates::AppCommand::Refresh,
            Commands::Status => coinrates::AppCommand::Status,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List every known exchange rate
    List,
    /// Show the rate for one or more currency codes
    Get {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Find rates by currency code or symbol
    Search { text: String },
    /// Convert a DOGM amount to fiat
    Convert {
        /// Amount in DOGM, e.g. 12.5
        amount: String,
        /// Target currency, defaults to the preferred currency
        code: Option<String>,
    },
    /// Show or set the preferred currency
    Currency { code: Option<String> },
    /// Fetch fresh rates now
    Refresh,
    /// Show cache state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinrates::cli::setup::setup(),
        Some(cmd) => {
            coinrates::run_command(cmd.into(), cli.config_path.as_deref(), cli.offline).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
