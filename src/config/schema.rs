//! Configuration schema for the coffee shop
//!
//! Configuration is stored at `~/.config/coffeeshop/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix shared by every cache generation this worker owns
pub const DEFAULT_CACHE_PREFIX: &str = "coffee-shop-cache-";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Offline cache worker settings
    pub worker: WorkerConfig,

    /// Local storage settings
    pub storage: StorageConfig,

    /// Push notification settings
    pub push: PushConfig,

    /// Background sync settings
    pub sync: SyncConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Offline cache worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the storefront is served from; relative paths resolve against it
    pub origin: String,

    /// Prefix of cache generation names owned by this worker
    pub cache_prefix: String,

    /// Version suffix of the current cache generation
    pub cache_version: String,

    /// Resources pre-populated at install time
    pub manifest: Vec<String>,

    /// Page served when a resource is neither cached nor reachable
    pub offline_fallback: String,

    /// Network timeout in seconds
    pub timeout_secs: u64,
}

impl WorkerConfig {
    /// Full name of the current cache generation
    pub fn generation_label(&self) -> String {
        format!("{}{}", self.cache_prefix, self.cache_version)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080/".to_string(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_version: "v1".to_string(),
            manifest: default_manifest(),
            offline_fallback: "offline.html".to_string(),
            timeout_secs: 30,
        }
    }
}

/// The storefront's static assets plus the pinned Font Awesome bundle
pub fn default_manifest() -> Vec<String> {
    [
        "/",
        "index.html",
        "style.css",
        "style1.css",
        "script.js",
        "checkout.html",
        "offline.html",
        "images",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/5.15.4/css/all.min.css",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/5.15.4/webfonts/fa-brands-400.woff2",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/5.15.4/webfonts/fa-regular-400.woff2",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/5.15.4/webfonts/fa-solid-900.woff2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Local storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the state directory (resources, record store, worker state)
    pub data_dir: Option<PathBuf>,
}

/// Push notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Server path receiving subscription details
    pub server_path: String,

    /// VAPID public key, URL-safe base64
    pub application_server_key: String,

    /// Title of displayed notifications
    pub title: String,

    /// Notification icon path
    pub icon: String,

    /// Notification badge path
    pub badge: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            server_path: "/subscribe".to_string(),
            application_server_key:
                "BFgxZbP36JNCyaRVWmyQ0pl_M_cPA1QLzBSlvLV9faQQ_38zx9S_TBAHrhLuMGtDtIR2KcI8uNNm5uUqTlGU5cY"
                    .to_string(),
            title: "Coffee Shop".to_string(),
            icon: "images/coffee-icon.png".to_string(),
            badge: "images/coffee-badge.png".to_string(),
        }
    }
}

/// Background sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Tag registered after a checkout submission
    pub checkout_tag: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            checkout_tag: "checkoutDataSync".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[worker]"));
        assert!(toml.contains("coffee-shop-cache-"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml = r#"
[worker]
cache_version = "v7"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.worker.cache_version, "v7");
        assert_eq!(config.worker.generation_label(), "coffee-shop-cache-v7");
        assert_eq!(config.worker.offline_fallback, "offline.html");
        assert_eq!(config.push.server_path, "/subscribe");
    }

    #[test]
    fn default_manifest_includes_offline_page() {
        let manifest = default_manifest();
        assert_eq!(manifest.len(), 12);
        assert!(manifest.contains(&"offline.html".to_string()));
        assert_eq!(manifest[0], "/");
    }
}
