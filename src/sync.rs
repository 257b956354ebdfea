//! Background sync registrations
//!
//! A tag registered here stays pending until the worker receives a sync
//! event for it. Registrations live in the record store, so a tag
//! registered by `checkout` is still pending for a later `sync`.

use crate::db::RecordStore;
use crate::error::ShopResult;
use std::sync::Arc;
use tracing::{debug, info};

/// Pending sync tags
#[derive(Clone)]
pub struct SyncRegistry {
    db: Arc<dyn RecordStore>,
}

impl SyncRegistry {
    pub fn new(db: Arc<dyn RecordStore>) -> Self {
        Self { db }
    }

    /// Register `tag`. Registering a pending tag again is a no-op.
    pub async fn register(&self, tag: &str) -> ShopResult<()> {
        if self.db.register_sync_tag(tag).await? {
            info!("Registered background sync '{}'", tag);
        } else {
            debug!("Background sync '{}' already pending", tag);
        }
        Ok(())
    }

    /// Tags waiting for a sync event
    pub async fn pending(&self) -> ShopResult<Vec<String>> {
        self.db.sync_tags().await
    }

    /// Consume the registration for `tag`; returns whether one existed
    pub async fn take(&self, tag: &str) -> ShopResult<bool> {
        self.db.consume_sync_tag(tag).await
    }
}
