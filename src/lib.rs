//! Coffee Shop - offline-first storefront worker
//!
//! Keeps versioned caches of the storefront for offline use, a local cart
//! and order store with background sync, and push notification
//! subscriptions.

pub mod cart;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod push;
pub mod sync;
pub mod ui;
pub mod worker;

pub use error::{ShopError, ShopResult};
