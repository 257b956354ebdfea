//! Coffee Shop - offline-first storefront worker
//!
//! CLI entry point that dispatches to subcommands.

use clap::{CommandFactory, Parser};
use coffeeshop::cli::{commands, Cli, Commands};
use coffeeshop::config::{Config, ConfigManager};
use coffeeshop::error::ShopResult;
use coffeeshop::ui;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ShopResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "coffeeshop", &mut std::io::stdout());
        return Ok(());
    }

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = manager.load().await?;
    if let Some(ref dir) = cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }

    init_logging(cli.verbose, &config);
    ui::init_theme();
    debug!("Using config {}", manager.path().display());

    match cli.command {
        Commands::Install(args) => commands::install(args, &config).await,
        Commands::Activate => commands::activate(&config).await,
        Commands::Fetch(args) => commands::fetch(args, &config).await,
        Commands::Status => commands::status(&config).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Cart(args) => commands::cart(args, &config).await,
        Commands::Checkout(args) => commands::checkout(args, &config).await,
        Commands::Sync(args) => commands::sync(args, &config).await,
        Commands::Push(args) => commands::push(args, &config).await,
        Commands::Subscribe(args) => commands::subscribe(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug. `general.verbose`
/// counts as one level.
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.max(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("coffeeshop=warn"),
        1 => EnvFilter::new("coffeeshop=info"),
        _ => EnvFilter::new("coffeeshop=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
