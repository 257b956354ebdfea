//! Cache command - inspect and clear cache generations

use super::shop::Shop;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::ShopResult;
use crate::ui::{self, UiContext};
use crate::worker::{CachedEntry, ResourceStore};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> ShopResult<()> {
    let shop = Shop::open(config).await?;

    match args.action {
        CacheAction::List { format } => list_generations(&shop, format).await,
        CacheAction::Entries { generation } => {
            let name = generation.unwrap_or_else(|| shop.worker.generation.clone());
            list_entries(&shop, &name).await
        }
        CacheAction::Clear { yes } => clear_generations(&shop, yes).await,
    }
}

#[derive(Debug, Serialize)]
struct GenerationInfo {
    name: String,
    entries: usize,
    bytes: usize,
    current: bool,
}

async fn list_generations(shop: &Shop, format: OutputFormat) -> ShopResult<()> {
    let mut generations = vec![];
    for name in shop.store.keys().await? {
        let entries = shop.store.entries(&name).await?;
        generations.push(GenerationInfo {
            current: name == shop.worker.generation,
            bytes: entries.iter().map(CachedEntry::size).sum(),
            entries: entries.len(),
            name,
        });
    }

    if generations.is_empty() && !matches!(format, OutputFormat::Json) {
        println!("No cache generations found.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_generation_table(&generations),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generations)?),
        OutputFormat::Plain => {
            for generation in &generations {
                println!("{}", generation.name);
            }
        }
    }

    Ok(())
}

fn print_generation_table(generations: &[GenerationInfo]) {
    println!("{:<32} {:<8} {:<10} {:<8}", "GENERATION", "ENTRIES", "SIZE", "STATE");
    println!("{}", "-".repeat(62));

    for generation in generations {
        let state = if generation.current {
            style("current").green().to_string()
        } else {
            style("stale").dim().to_string()
        };
        println!(
            "{:<32} {:<8} {:<10} {:<8}",
            generation.name,
            generation.entries,
            ui::format_bytes(generation.bytes),
            state
        );
    }

    println!();
    println!("Total: {} generation(s)", generations.len());
}

async fn list_entries(shop: &Shop, name: &str) -> ShopResult<()> {
    if !shop.store.has(name).await? {
        println!("Cache generation {} does not exist.", name);
        return Ok(());
    }

    let entries = shop.store.entries(name).await?;
    println!("{:<8} {:<6} {:<10} {}", "METHOD", "STATUS", "SIZE", "URL");
    for entry in &entries {
        println!(
            "{:<8} {:<6} {:<10} {}",
            entry.request.method,
            entry.response.status,
            ui::format_bytes(entry.size()),
            entry.request.url
        );
    }
    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    Ok(())
}

async fn clear_generations(shop: &Shop, yes: bool) -> ShopResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    let owned: Vec<String> = shop
        .store
        .keys()
        .await?
        .into_iter()
        .filter(|name| name.starts_with(&shop.worker.cache_prefix))
        .collect();

    if owned.is_empty() {
        ui::step_info(&ctx, "No cache generations to clear");
        return Ok(());
    }

    let prompt = format!("Delete {} cache generation(s)?", owned.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::remark(&ctx, "Nothing deleted");
        return Ok(());
    }

    for name in &owned {
        if shop.store.delete(name).await? {
            ui::step_ok(&ctx, &format!("Deleted {}", name));
        }
    }
    shop.reset_state().await?;
    ui::step_info(&ctx, "Worker reset; run coffeeshop install to repopulate");

    Ok(())
}
