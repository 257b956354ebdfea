//! Status command - show worker, cart and sync state

use super::shop::Shop;
use crate::cart::{render_total, CartController};
use crate::config::{Config, ConfigManager};
use crate::error::ShopResult;
use crate::ui::{self, UiContext};
use crate::worker::{ResourceStore, WorkerPhase};
use chrono::{DateTime, Utc};

/// Execute the status command
pub async fn execute(config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let state = shop.worker_state().await?;
    let phase = state.phase_for(&shop.worker.generation);

    ui::section(&ctx, "Worker");
    ui::key_value(&ctx, "Origin", shop.worker.origin.as_str());
    ui::key_value(&ctx, "Generation", &shop.worker.generation);
    ui::key_value_status(&ctx, "Phase", &phase.to_string(), phase.is_active());
    if state.generation != shop.worker.generation {
        ui::step_warn_hint(
            &ctx,
            &format!("Last installed generation was {}", state.generation),
            "Run: coffeeshop install",
        );
    }
    ui::key_value(&ctx, "Installed", &timestamp(state.installed_at));
    ui::key_value(&ctx, "Activated", &timestamp(state.activated_at));

    let generations = shop.store.keys().await?;
    let owned = generations
        .iter()
        .filter(|name| name.starts_with(&shop.worker.cache_prefix))
        .count();
    ui::key_value(
        &ctx,
        "Caches",
        &format!("{} ({} backend)", owned, shop.store.backend_name()),
    );
    if phase != WorkerPhase::Parsed {
        let entries = shop.store.entries(&shop.worker.generation).await?;
        let bytes = entries.iter().map(|e| e.size()).sum();
        ui::key_value(
            &ctx,
            "Cached",
            &format!("{} entries, {}", entries.len(), ui::format_bytes(bytes)),
        );
    }

    let cart = CartController::new(shop.records(), &config.sync.checkout_tag);
    let items = cart.items().await?;
    let quantity: u32 = items.iter().map(|i| i.quantity).sum();

    ui::section(&ctx, "Shop");
    ui::key_value(
        &ctx,
        "Cart",
        &format!("{} items, {}", quantity, render_total(cart.total().await?)),
    );
    let db = shop.records();
    ui::key_value(&ctx, "Pending orders", &db.checkouts().await?.len().to_string());
    let tags = db.sync_tags().await?;
    ui::key_value(
        &ctx,
        "Sync tags",
        &if tags.is_empty() { "none".to_string() } else { tags.join(", ") },
    );
    ui::key_value(
        &ctx,
        "State dir",
        &ConfigManager::state_dir(config).display().to_string(),
    );

    Ok(())
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}
