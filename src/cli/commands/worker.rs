//! Install and activate commands - drive the worker lifecycle

use super::shop::Shop;
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::ShopResult;
use crate::ui::{self, InstallProgress, TaskSpinner, UiContext};
use crate::worker::{ActivateReport, EventResult, WorkerEvent, WorkerHost, WorkerPhase};
use tracing::debug;

/// Execute the install command
pub async fn install(args: InstallArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let host = shop.host(&ctx).await?;

    ui::intro(&ctx, "Installing offline cache");
    shop.save_phase(WorkerPhase::Installing).await?;

    let progress = InstallProgress::new(&ctx, &shop.worker.generation, shop.worker.manifest.len());
    let result = host.install(&|url| progress.on_fetched(url)).await;
    progress.finish();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            shop.save_phase(WorkerPhase::Redundant).await?;
            ui::step_error(&ctx, &format!("Install of {} failed", shop.worker.generation));
            return Err(e);
        }
    };
    shop.save_phase(WorkerPhase::Installed).await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Cached {} resources", report.entries),
        &ui::format_bytes(report.bytes),
    );

    if args.no_activate || !report.skip_waiting {
        debug!("Leaving {} installed", report.generation);
        ui::outro_success(&ctx, &format!("{} installed", report.generation));
        return Ok(());
    }

    run_activate(&ctx, &shop, &host).await
}

/// Execute the activate command
pub async fn activate(config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let host = shop.host(&ctx).await?;

    run_activate(&ctx, &shop, &host).await
}

async fn run_activate(ctx: &UiContext, shop: &Shop, host: &WorkerHost) -> ShopResult<()> {
    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Activating {}...", shop.worker.generation));

    let report = match host.dispatch(WorkerEvent::Activate).await {
        Ok(EventResult::Activated(report)) => report,
        Ok(_) => ActivateReport::default(),
        Err(e) => {
            spinner.stop_error("Activation failed");
            return Err(e);
        }
    };
    shop.save_phase(WorkerPhase::Activated).await?;
    spinner.stop(&format!("{} is active", report.generation));

    print_cleanup(ctx, &report);
    ui::outro_success(ctx, "Worker is serving fetches");
    Ok(())
}

fn print_cleanup(ctx: &UiContext, report: &ActivateReport) {
    for name in &report.deleted {
        ui::step_info(ctx, &format!("Deleted stale cache {}", name));
    }
    for failure in &report.failures {
        ui::step_warn_hint(ctx, failure, "Run: coffeeshop cache clear");
    }
}
