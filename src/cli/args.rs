//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Coffee Shop - offline-first storefront worker
///
/// Caches the storefront for offline use, keeps a local cart and
/// submits orders for background sync.
#[derive(Parser, Debug)]
#[command(name = "coffeeshop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "COFFEESHOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// State directory (overrides storage.data_dir)
    #[arg(long, global = true, env = "COFFEESHOP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Populate the current cache generation from the manifest
    Install(InstallArgs),

    /// Activate the installed generation and purge stale ones
    Activate,

    /// Fetch a URL through the worker
    Fetch(FetchArgs),

    /// Show worker, cart and sync state
    Status,

    /// Inspect or clear cache generations
    Cache(CacheArgs),

    /// Manage the shopping cart
    Cart(CartArgs),

    /// Submit the cart as an order
    Checkout(CheckoutArgs),

    /// Deliver background sync events
    Sync(SyncArgs),

    /// Deliver a push message to the worker
    Push(PushArgs),

    /// Subscribe to push notifications
    Subscribe(SubscribeArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Stay installed instead of activating right away
    #[arg(long)]
    pub no_activate: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// URL or path relative to worker.origin
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request header (NAME:VALUE), repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Print status line and headers before the body
    #[arg(short, long)]
    pub include: bool,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cache generations
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the entries of a generation (default: current)
    Entries {
        /// Generation name
        generation: Option<String>,
    },

    /// Delete every generation owned by this worker
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the cart command
#[derive(Parser, Debug)]
pub struct CartArgs {
    #[command(subcommand)]
    pub action: Option<CartAction>,
}

/// Cart subcommands
#[derive(Subcommand, Debug)]
pub enum CartAction {
    /// Add one unit of a product
    Add {
        /// Product name
        name: String,
        /// Unit price
        price: f64,
    },

    /// Remove a product's line
    Remove {
        /// Product name
        name: String,
    },

    /// Show cart contents and total
    Show {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Arguments for the checkout command
#[derive(Parser, Debug)]
pub struct CheckoutArgs {
    /// Customer name
    #[arg(long)]
    pub name: Option<String>,

    /// Customer email
    #[arg(long)]
    pub email: Option<String>,

    /// Delivery address
    #[arg(long)]
    pub address: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Tag to fire (default: every registered tag)
    pub tag: Option<String>,

    /// List registered tags without firing them
    #[arg(long, conflicts_with = "tag")]
    pub list: bool,
}

/// Arguments for the push command
#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Message text shown as the notification body
    pub message: Option<String>,
}

/// Arguments for the subscribe command
#[derive(Parser, Debug)]
pub struct SubscribeArgs {
    /// Grant notification permission without prompting
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., worker.cache_version)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse a header in NAME:VALUE format
fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid NAME:VALUE format: no ':' found in '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
