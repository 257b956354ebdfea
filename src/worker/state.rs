//! Worker state persistence
//!
//! The CLI runs one lifecycle step per invocation, so the phase reached by
//! the last step is kept in `worker.json` under the state directory.

use crate::error::{ShopError, ShopResult};
use crate::worker::WorkerPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Persisted worker record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerState {
    /// Generation the phase applies to
    pub generation: String,

    /// Last phase reached
    pub phase: WorkerPhase,

    /// When the generation finished installing
    pub installed_at: Option<DateTime<Utc>>,

    /// When the generation was activated
    pub activated_at: Option<DateTime<Utc>>,

    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl WorkerState {
    /// Fresh state for a generation nothing has been installed into
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
            phase: WorkerPhase::Parsed,
            installed_at: None,
            activated_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Record a phase change, stamping install and activation times
    pub fn advance(&mut self, phase: WorkerPhase) {
        let now = Utc::now();
        match phase {
            WorkerPhase::Installed => {
                self.installed_at = Some(now);
                self.activated_at = None;
            }
            WorkerPhase::Activated => {
                self.activated_at = Some(now);
            }
            WorkerPhase::Redundant | WorkerPhase::Parsed => {
                self.installed_at = None;
                self.activated_at = None;
            }
            WorkerPhase::Installing | WorkerPhase::Activating => {}
        }
        self.phase = phase;
        self.updated_at = now;
    }

    /// Phase to resume with for `generation`.
    ///
    /// A record written for another generation (the version was bumped)
    /// resumes as `Parsed`.
    pub fn phase_for(&self, generation: &str) -> WorkerPhase {
        if self.generation == generation {
            self.phase
        } else {
            WorkerPhase::Parsed
        }
    }

    /// Load state from file
    pub async fn load(path: &Path) -> ShopResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ShopError::io(format!("reading worker state {}", path.display()), e))?;

        let state: WorkerState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Save state to file
    pub async fn save(&self, path: &Path) -> ShopResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShopError::io("creating state directory", e))?;
        }

        let content = serde_json::to_vec_pretty(self)?;
        crate::worker::write_atomic(path, content).await
    }

    /// Delete state file
    pub async fn delete(path: &Path) -> ShopResult<()> {
        if path.exists() {
            fs::remove_file(path)
                .await
                .map_err(|e| ShopError::io(format!("deleting worker state {}", path.display()), e))?;
        }
        Ok(())
    }
}
