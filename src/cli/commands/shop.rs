//! Wiring shared by the commands: stores, network and worker host built
//! from configuration

use crate::config::{Config, ConfigManager};
use crate::db::{LocalDb, RecordStore};
use crate::error::ShopResult;
use crate::push::{Notification, Notifier};
use crate::ui::{self, UiContext};
use crate::worker::{
    CacheCoordinator, CoordinatorConfig, DiskResourceStore, HttpNetwork, Network, ResourceStore,
    WorkerHost, WorkerPhase, WorkerState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shows notifications in the terminal
pub struct ConsoleNotifier {
    ctx: UiContext,
}

impl ConsoleNotifier {
    pub fn new(ctx: UiContext) -> Self {
        Self { ctx }
    }
}

impl Notifier for ConsoleNotifier {
    fn show(&self, notification: &Notification) -> ShopResult<()> {
        ui::note(&self.ctx, &notification.title, &notification.body);
        Ok(())
    }
}

/// Stores and settings for one CLI invocation
pub struct Shop {
    pub config: Config,
    pub worker: CoordinatorConfig,
    pub store: Arc<DiskResourceStore>,
    pub db: Arc<LocalDb>,
    state_path: PathBuf,
}

impl Shop {
    /// Open the state directory described by `config`
    pub async fn open(config: &Config) -> ShopResult<Self> {
        ConfigManager::ensure_state_dirs(config).await?;

        let worker = CoordinatorConfig::from_worker_config(&config.worker)?;
        let store = Arc::new(DiskResourceStore::new(ConfigManager::resources_dir(config)));
        let db = Arc::new(LocalDb::open(ConfigManager::database_path(config)).await?);
        debug!("State directory: {}", ConfigManager::state_dir(config).display());

        Ok(Self {
            config: config.clone(),
            worker,
            store,
            db,
            state_path: ConfigManager::worker_state_path(config),
        })
    }

    pub fn records(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.db) as Arc<dyn RecordStore>
    }

    /// Persisted worker state, or a fresh record for the current generation
    pub async fn worker_state(&self) -> ShopResult<WorkerState> {
        Ok(WorkerState::load(&self.state_path)
            .await?
            .unwrap_or_else(|| WorkerState::new(&self.worker.generation)))
    }

    /// Record `phase` for the current generation
    pub async fn save_phase(&self, phase: WorkerPhase) -> ShopResult<WorkerState> {
        let mut state = self.worker_state().await?;
        if state.generation != self.worker.generation {
            state = WorkerState::new(&self.worker.generation);
        }
        state.advance(phase);
        state.save(&self.state_path).await?;
        Ok(state)
    }

    /// Forget the persisted lifecycle state
    pub async fn reset_state(&self) -> ShopResult<()> {
        WorkerState::delete(&self.state_path).await
    }

    /// Worker host resuming the persisted phase
    pub async fn host(&self, ctx: &UiContext) -> ShopResult<WorkerHost> {
        let phase = self.worker_state().await?.phase_for(&self.worker.generation);
        let network = HttpNetwork::new(
            self.worker.origin.clone(),
            Duration::from_secs(self.config.worker.timeout_secs),
        );
        let coordinator = CacheCoordinator::new(
            self.worker.clone(),
            Arc::clone(&self.store) as Arc<dyn ResourceStore>,
            Arc::new(network) as Arc<dyn Network>,
        )
        .with_phase(phase);

        Ok(WorkerHost::new(
            coordinator,
            self.records(),
            Arc::new(ConsoleNotifier::new(ctx.clone())),
            self.config.push.clone(),
            &self.config.sync.checkout_tag,
        ))
    }
}
