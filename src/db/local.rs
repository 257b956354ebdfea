//! JSON snapshot implementation of the record store
//!
//! The whole database is one JSON document. Writes copy the snapshot,
//! apply the change, persist the copy and only then publish it, so a failed
//! write leaves both disk and memory unchanged.

use super::{
    CartItem, CheckoutSubmission, RecordStore, CART_TABLE, CHECKOUT_TABLE, DB_NAME, DB_VERSION,
};
use crate::error::{ShopError, ShopResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    name: String,
    version: u32,
    cart_items: BTreeMap<String, CartItem>,
    checkout_data: BTreeMap<u64, CheckoutSubmission>,
    next_checkout_id: u64,
    #[serde(default)]
    sync_tags: Vec<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            name: DB_NAME.to_string(),
            version: DB_VERSION,
            cart_items: BTreeMap::new(),
            checkout_data: BTreeMap::new(),
            next_checkout_id: 1,
            sync_tags: vec![],
        }
    }
}

/// Embedded record store
pub struct LocalDb {
    path: Option<PathBuf>,
    snapshot: Mutex<Snapshot>,
}

impl LocalDb {
    /// Open the database file. A missing file opens an empty database; the
    /// file is written by [`RecordStore::ensure_schema`] or the first change.
    pub async fn open(path: impl Into<PathBuf>) -> ShopResult<Self> {
        let path = path.into();

        let snapshot = if path.exists() {
            let content = fs::read(&path).await.map_err(|e| ShopError::StoreOpen {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let snapshot: Snapshot =
                serde_json::from_slice(&content).map_err(|e| ShopError::StoreOpen {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            if snapshot.version > DB_VERSION {
                return Err(ShopError::StoreOpen {
                    path,
                    reason: format!(
                        "database version {} is newer than supported version {}",
                        snapshot.version, DB_VERSION
                    ),
                });
            }
            debug!("Opened {} at {}", snapshot.name, path.display());
            snapshot
        } else {
            Snapshot::default()
        };

        Ok(Self {
            path: Some(path),
            snapshot: Mutex::new(snapshot),
        })
    }

    /// A database that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply `change` to a copy of the snapshot, persist it, then publish it
    async fn write<T>(&self, change: impl FnOnce(&mut Snapshot) -> ShopResult<T>) -> ShopResult<T> {
        let mut current = self.snapshot.lock().await;
        let mut next = current.clone();
        let result = change(&mut next)?;

        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }
        *current = next;
        Ok(result)
    }
}

async fn persist(path: &Path, snapshot: &Snapshot) -> ShopResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ShopError::io(format!("creating {}", parent.display()), e))?;
    }
    let content = serde_json::to_vec_pretty(snapshot)?;
    crate::worker::write_atomic(path, content)
        .await
        .map_err(|e| ShopError::RecordStore(e.to_string()))
}

#[async_trait]
impl RecordStore for LocalDb {
    async fn ensure_schema(&self) -> ShopResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = self.snapshot.lock().await;
        if path.exists() {
            return Ok(());
        }

        persist(path, &snapshot).await.map_err(|e| ShopError::StoreOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        info!(
            "Created {} v{} with tables {} and {}",
            DB_NAME, DB_VERSION, CART_TABLE, CHECKOUT_TABLE
        );
        Ok(())
    }

    async fn get_cart_item(&self, name: &str) -> ShopResult<Option<CartItem>> {
        Ok(self.snapshot.lock().await.cart_items.get(name).cloned())
    }

    async fn cart_items(&self) -> ShopResult<Vec<CartItem>> {
        Ok(self.snapshot.lock().await.cart_items.values().cloned().collect())
    }

    async fn insert_cart_item(&self, item: CartItem) -> ShopResult<()> {
        self.write(|db| {
            if db.cart_items.contains_key(&item.name) {
                return Err(ShopError::RecordExists {
                    table: CART_TABLE.to_string(),
                    key: item.name,
                });
            }
            db.cart_items.insert(item.name.clone(), item);
            Ok(())
        })
        .await
    }

    async fn put_cart_item(&self, item: CartItem) -> ShopResult<()> {
        self.write(|db| {
            db.cart_items.insert(item.name.clone(), item);
            Ok(())
        })
        .await
    }

    async fn delete_cart_item(&self, name: &str) -> ShopResult<bool> {
        self.write(|db| Ok(db.cart_items.remove(name).is_some())).await
    }

    async fn insert_checkout(&self, submission: CheckoutSubmission) -> ShopResult<u64> {
        self.write(|db| {
            let id = db.next_checkout_id;
            db.next_checkout_id += 1;
            db.checkout_data.insert(id, submission);
            Ok(id)
        })
        .await
    }

    async fn get_checkout(&self, id: u64) -> ShopResult<Option<CheckoutSubmission>> {
        Ok(self.snapshot.lock().await.checkout_data.get(&id).cloned())
    }

    async fn checkouts(&self) -> ShopResult<Vec<(u64, CheckoutSubmission)>> {
        Ok(self
            .snapshot
            .lock()
            .await
            .checkout_data
            .iter()
            .map(|(id, s)| (*id, s.clone()))
            .collect())
    }

    async fn delete_checkout(&self, id: u64) -> ShopResult<bool> {
        self.write(|db| Ok(db.checkout_data.remove(&id).is_some())).await
    }

    async fn register_sync_tag(&self, tag: &str) -> ShopResult<bool> {
        self.write(|db| {
            if db.sync_tags.iter().any(|t| t == tag) {
                return Ok(false);
            }
            db.sync_tags.push(tag.to_string());
            Ok(true)
        })
        .await
    }

    async fn sync_tags(&self) -> ShopResult<Vec<String>> {
        Ok(self.snapshot.lock().await.sync_tags.clone())
    }

    async fn consume_sync_tag(&self, tag: &str) -> ShopResult<bool> {
        self.write(|db| {
            let before = db.sync_tags.len();
            db.sync_tags.retain(|t| t != tag);
            Ok(db.sync_tags.len() != before)
        })
        .await
    }
}
