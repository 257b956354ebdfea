//! Error types for the coffee shop
//!
//! All modules use `ShopResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for coffee shop operations
pub type ShopResult<T> = Result<T, ShopError>;

/// All errors that can occur in the coffee shop
#[derive(Error, Debug)]
pub enum ShopError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid origin URL {url}: {reason}")]
    InvalidOrigin { url: String, reason: String },

    #[error("Invalid cache prefix {0:?}: prefix must not be empty")]
    InvalidCachePrefix(String),

    // Worker lifecycle errors
    #[error("Worker is {actual}, expected {expected}")]
    InvalidPhase { expected: String, actual: String },

    #[error("Cache population failed for {url}: {reason}")]
    CachePopulation { url: String, reason: String },

    #[error("Offline fallback {0} is not cached")]
    OfflineFallbackMissing(String),

    #[error("Resource store error: {0}")]
    ResourceStore(String),

    // Network errors
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    // Local record store errors
    #[error("Failed to open local store {path}: {reason}")]
    StoreOpen { path: PathBuf, reason: String },

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Record already exists in {table}: {key}")]
    RecordExists { table: String, key: String },

    #[error("Record not found in {table}: {key}")]
    RecordNotFound { table: String, key: String },

    #[error("Cart is empty")]
    EmptyCart,

    // Push errors
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Push subscription failed: {0}")]
    Subscription(String),

    #[error("Invalid application server key: {0}")]
    InvalidServerKey(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ShopError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a cache population error for a manifest URL
    pub fn population(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::CachePopulation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid phase error
    pub fn phase(expected: impl ToString, actual: impl ToString) -> Self {
        Self::InvalidPhase {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether the failure came from the network layer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPhase { .. } => Some("Run: coffeeshop install && coffeeshop activate"),
            Self::OfflineFallbackMissing(_) => {
                Some("Make sure offline.html is listed in worker.manifest and reinstall")
            }
            Self::CachePopulation { .. } => Some("Check worker.origin and that every manifest URL is reachable"),
            Self::PermissionDenied => Some("Re-run with --yes to grant notification permission"),
            Self::EmptyCart => Some("Run: coffeeshop cart add <name> <price>"),
            _ => None,
        }
    }
}
