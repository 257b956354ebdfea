//! Sync command - deliver background sync events

use super::shop::Shop;
use crate::cli::args::SyncArgs;
use crate::config::Config;
use crate::error::ShopResult;
use crate::sync::SyncRegistry;
use crate::ui::{self, UiContext};
use crate::worker::{EventResult, SyncOutcome, WorkerEvent};

/// Execute the sync command
pub async fn execute(args: SyncArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;

    if args.list {
        let pending = SyncRegistry::new(shop.records()).pending().await?;
        if pending.is_empty() {
            println!("No pending sync registrations.");
        }
        for tag in pending {
            println!("{}", tag);
        }
        return Ok(());
    }

    let host = shop.host(&ctx).await?;
    let outcomes = match args.tag {
        Some(tag) => match host.dispatch(WorkerEvent::Sync { tag }).await? {
            EventResult::Synced(outcome) => vec![outcome],
            _ => vec![],
        },
        None => host.fire_pending_syncs().await?,
    };

    if outcomes.is_empty() {
        ui::step_info(&ctx, "No pending sync registrations");
    }
    for outcome in &outcomes {
        print_outcome(&ctx, outcome);
    }

    Ok(())
}

fn print_outcome(ctx: &UiContext, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Handled {
            tag,
            pending_orders,
        } => ui::step_ok_detail(
            ctx,
            &format!("Sync '{}' handled", tag),
            &format!("{} order(s) pending upload", pending_orders),
        ),
        SyncOutcome::Unhandled { tag } => {
            ui::step_warn(ctx, &format!("No handler for sync '{}'", tag))
        }
    }
}
