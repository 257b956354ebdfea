//! Offline cache worker
//!
//! Service-worker style lifecycle around a resource store:
//!
//! | Phase | Entered by | Meaning |
//! |-------|------------|---------|
//! | Parsed | construction | nothing cached yet |
//! | Installing | `install` | fetching the manifest |
//! | Installed | install success | generation populated, waiting to activate |
//! | Activating | `activate` | purging stale generations |
//! | Activated | activation | intercepting fetches |
//! | Redundant | install failure | generation unusable, reinstall required |

mod coordinator;
mod disk;
mod events;
mod host;
mod network;
mod request;
mod state;
mod store;

pub use coordinator::{
    ActivateReport, CacheCoordinator, CoordinatorConfig, FetchOutcome, InstallReport,
    ResponseSource,
};
pub use disk::DiskResourceStore;
pub use events::{EventKind, ExtendableEvent};
pub use host::{EventResult, SyncOutcome, WorkerEvent, WorkerHost};
pub use network::{HttpNetwork, Network};
pub use request::{Method, Request, Response, ResponseType};
pub use state::WorkerState;
pub use store::{CachedEntry, MemoryResourceStore, ResourceStore};

#[cfg(test)]
pub(crate) use network::fake::FakeNetwork;

pub(crate) use disk::write_atomic;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Worker lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPhase {
    /// Constructed, nothing installed
    #[default]
    Parsed,
    /// Install in progress
    Installing,
    /// Installed, waiting to activate
    Installed,
    /// Activation in progress
    Activating,
    /// Active and intercepting fetches
    Activated,
    /// Install failed
    Redundant,
}

impl WorkerPhase {
    /// Whether fetches are intercepted in this phase
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Whether an install may start from this phase
    pub fn can_install(&self) -> bool {
        !matches!(self, Self::Installing | Self::Activating)
    }

    /// Whether an activation may start from this phase
    pub fn can_activate(&self) -> bool {
        matches!(self, Self::Installed | Self::Activated)
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}
