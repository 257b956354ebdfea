//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{ShopError, ShopResult};
use crate::push::decode_server_key;
use crate::ui::{self, UiContext};
use crate::worker::CoordinatorConfig;
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.verbose",
    "general.log_format",
    "worker.origin",
    "worker.cache_prefix",
    "worker.cache_version",
    "worker.manifest",
    "worker.offline_fallback",
    "worker.timeout_secs",
    "storage.data_dir",
    "push.server_path",
    "push.application_server_key",
    "push.title",
    "push.icon",
    "push.badge",
    "sync.checkout_tag",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> ShopResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> ShopResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

/// Edit the file on disk, not the effective config, so command-line
/// overrides are never written back
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let mut config = manager.load().await?;
    apply(&mut config, key, value)?;

    // Reject values the worker could not start with
    CoordinatorConfig::from_worker_config(&config.worker)?;
    if key == "push.application_server_key" {
        decode_server_key(value)?;
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Set a dot-separated key on `config`
fn apply(config: &mut Config, key: &str, value: &str) -> ShopResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(ShopError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },

        ["worker", "origin"] => config.worker.origin = value.to_string(),
        ["worker", "cache_prefix"] => config.worker.cache_prefix = value.to_string(),
        ["worker", "cache_version"] => config.worker.cache_version = value.to_string(),
        ["worker", "manifest"] => {
            config.worker.manifest = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        ["worker", "offline_fallback"] => config.worker.offline_fallback = value.to_string(),
        ["worker", "timeout_secs"] => config.worker.timeout_secs = parse_u64(value)?,

        ["storage", "data_dir"] => {
            config.storage.data_dir = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }

        ["push", "server_path"] => config.push.server_path = value.to_string(),
        ["push", "application_server_key"] => {
            config.push.application_server_key = value.to_string()
        }
        ["push", "title"] => config.push.title = value.to_string(),
        ["push", "icon"] => config.push.icon = value.to_string(),
        ["push", "badge"] => config.push.badge = value.to_string(),

        ["sync", "checkout_tag"] => config.sync.checkout_tag = value.to_string(),

        _ => {
            return Err(ShopError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> ShopResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ShopError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> ShopResult<u64> {
    value
        .parse()
        .map_err(|_| ShopError::User(format!("Invalid number: {}", value)))
}
