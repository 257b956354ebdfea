//! Push command - deliver a push message to the worker

use super::shop::Shop;
use crate::cli::args::PushArgs;
use crate::config::Config;
use crate::error::ShopResult;
use crate::ui::UiContext;
use crate::worker::WorkerEvent;
use tracing::debug;

/// Execute the push command
pub async fn execute(args: PushArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let host = shop.host(&ctx).await?;

    let result = host.dispatch(WorkerEvent::Push { data: args.message }).await?;
    debug!("Push handled: {:?}", result);
    Ok(())
}
