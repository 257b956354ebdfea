//! Subscribe command - request permission and register a push subscription

use super::shop::Shop;
use crate::cli::args::SubscribeArgs;
use crate::config::Config;
use crate::error::{ShopError, ShopResult};
use crate::push::{
    server_url, HttpSubscriptionSink, LocalPushService, NotificationSubscriber, Permission,
    PermissionPrompt, SubscribeOutcome,
};
use crate::ui::{self, UiContext};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Asks for notification permission on the terminal
struct ConfirmPrompt {
    ctx: UiContext,
}

#[async_trait]
impl PermissionPrompt for ConfirmPrompt {
    async fn request(&self) -> ShopResult<Permission> {
        if ui::confirm(&self.ctx, "Allow Coffee Shop notifications?", false).await? {
            Ok(Permission::Granted)
        } else {
            Ok(Permission::Denied)
        }
    }
}

/// Execute the subscribe command
pub async fn execute(args: SubscribeArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let shop = Shop::open(config).await?;
    let origin = shop.worker.origin.clone();
    let endpoint = server_url(&origin, &config.push.server_path)?;

    let subscriber = NotificationSubscriber::new(
        Arc::new(ConfirmPrompt { ctx: ctx.clone() }),
        Arc::new(LocalPushService::new(origin)),
        Arc::new(HttpSubscriptionSink::new(
            endpoint.clone(),
            Duration::from_secs(config.worker.timeout_secs),
        )),
        &config.push.application_server_key,
    );

    match subscriber.run().await {
        SubscribeOutcome::Denied => Err(ShopError::PermissionDenied),
        SubscribeOutcome::Failed { reason } => {
            ui::step_error(&ctx, &format!("Push subscription failed: {}", reason));
            Ok(())
        }
        SubscribeOutcome::Subscribed {
            subscription,
            status,
        } => {
            ui::step_ok_detail(&ctx, "Subscribed to push notifications", &subscription.endpoint);
            match status {
                Some(status) => ui::key_value(&ctx, "Server", &format!("{} ({})", endpoint, status)),
                None => ui::step_warn_hint(
                    &ctx,
                    &format!("Could not send subscription to {}", endpoint),
                    "Check worker.origin and push.server_path",
                ),
            }
            Ok(())
        }
    }
}
