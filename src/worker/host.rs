//! Worker host
//!
//! Delivers lifecycle events to the cache coordinator and the worker's
//! other handlers. Every event gets its own [`ExtendableEvent`]; the host
//! settles it before reporting the event complete.

use crate::config::schema::PushConfig;
use crate::db::RecordStore;
use crate::error::ShopResult;
use crate::push::{Notification, Notifier};
use crate::sync::SyncRegistry;
use crate::worker::coordinator::{ActivateReport, CacheCoordinator, FetchOutcome, InstallReport};
use crate::worker::events::{EventKind, ExtendableEvent};
use crate::worker::request::Request;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event delivered by the host
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { data: Option<String> },
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Install => EventKind::Install,
            Self::Activate => EventKind::Activate,
            Self::Fetch(_) => EventKind::Fetch,
            Self::Sync { .. } => EventKind::Sync,
            Self::Push { .. } => EventKind::Push,
        }
    }
}

/// What the sync handler did with a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Checkout sync: `pending_orders` submissions are waiting in the store
    Handled { tag: String, pending_orders: usize },
    /// No handler for the tag
    Unhandled { tag: String },
}

/// Result of a settled event
#[derive(Debug, Clone)]
pub enum EventResult {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Synced(SyncOutcome),
    Pushed(Notification),
}

/// Dispatches events to their handlers
pub struct WorkerHost {
    coordinator: CacheCoordinator,
    db: Arc<dyn RecordStore>,
    sync: SyncRegistry,
    notifier: Arc<dyn Notifier>,
    push: PushConfig,
    checkout_tag: String,
}

impl WorkerHost {
    pub fn new(
        coordinator: CacheCoordinator,
        db: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        push: PushConfig,
        checkout_tag: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            sync: SyncRegistry::new(Arc::clone(&db)),
            db,
            notifier,
            push,
            checkout_tag: checkout_tag.into(),
        }
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    /// Deliver `event` and wait until it settles
    pub async fn dispatch(&self, event: WorkerEvent) -> ShopResult<EventResult> {
        let mut token = ExtendableEvent::new(event.kind());
        let result = match event {
            WorkerEvent::Install => self
                .handle_install(&mut token, &|_| {})
                .await
                .map(EventResult::Installed),
            WorkerEvent::Activate => self.coordinator.activate().await.map(EventResult::Activated),
            WorkerEvent::Fetch(request) => self
                .coordinator
                .handle_fetch(request, &mut token)
                .await
                .map(EventResult::Fetched),
            WorkerEvent::Sync { tag } => self.handle_sync(tag).await.map(EventResult::Synced),
            WorkerEvent::Push { data } => self.handle_push(data.as_deref()).map(EventResult::Pushed),
        };
        finish(token, result).await
    }

    /// Install event with per-resource progress
    pub async fn install(&self, on_fetched: &(dyn Fn(&str) + Send + Sync)) -> ShopResult<InstallReport> {
        let mut token = ExtendableEvent::new(EventKind::Install);
        let result = self.handle_install(&mut token, on_fetched).await;
        finish(token, result).await
    }

    /// Cache population and record store creation both extend the install
    /// event; it succeeds only if both do.
    async fn handle_install(
        &self,
        token: &mut ExtendableEvent,
        on_fetched: &(dyn Fn(&str) + Send + Sync),
    ) -> ShopResult<InstallReport> {
        let db = Arc::clone(&self.db);
        token.wait_until(async move { db.ensure_schema().await });

        let report = self.coordinator.install_with_progress(on_fetched).await?;
        if report.skip_waiting {
            debug!("Install requested skip-waiting");
        }
        Ok(report)
    }

    async fn handle_sync(&self, tag: String) -> ShopResult<SyncOutcome> {
        if !self.sync.take(&tag).await? {
            debug!("Sync '{}' fired without a registration", tag);
        }

        if tag != self.checkout_tag {
            warn!("No handler for sync '{}'", tag);
            return Ok(SyncOutcome::Unhandled { tag });
        }

        let pending = self.db.checkouts().await?;
        for (id, order) in &pending {
            info!(
                "Order {} ({}) pending sync: {} items, ${:.2}",
                id,
                order.reference,
                order.cart_items.len(),
                order.total_price
            );
        }
        Ok(SyncOutcome::Handled {
            tag,
            pending_orders: pending.len(),
        })
    }

    fn handle_push(&self, data: Option<&str>) -> ShopResult<Notification> {
        let notification = Notification::from_push(&self.push, data);
        self.notifier.show(&notification)?;
        Ok(notification)
    }

    /// Fire a sync event for every registered tag
    pub async fn fire_pending_syncs(&self) -> ShopResult<Vec<SyncOutcome>> {
        let mut outcomes = vec![];
        for tag in self.sync.pending().await? {
            if let EventResult::Synced(outcome) = self.dispatch(WorkerEvent::Sync { tag }).await? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }
}

/// Settle `token`, then report the handler's result before any extension failure
async fn finish<T>(token: ExtendableEvent, result: ShopResult<T>) -> ShopResult<T> {
    let settled = token.settle().await;
    let value = result?;
    settled?;
    Ok(value)
}
