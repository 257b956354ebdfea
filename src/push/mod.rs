//! Push notifications
//!
//! Subscribing runs permission -> push service subscription -> POST of the
//! subscription JSON to the application server. Every step after the
//! permission check is best-effort: failures are logged and reported in the
//! outcome, never returned as errors.

mod notification;
mod subscription;

pub use notification::{Notification, Notifier};
pub use subscription::{
    decode_server_key, encode_key, server_url, PushSubscription, SubscribeOptions,
    SubscriptionKeys,
};

#[cfg(test)]
pub(crate) use notification::recording::RecordingNotifier;

use crate::error::{ShopError, ShopResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// Answer to a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Asks the user for notification permission
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request(&self) -> ShopResult<Permission>;
}

/// Creates push subscriptions
#[async_trait]
pub trait PushService: Send + Sync {
    async fn subscribe(&self, options: &SubscribeOptions) -> ShopResult<PushSubscription>;
}

/// Delivers a subscription to the application server
#[async_trait]
pub trait SubscriptionSink: Send + Sync {
    /// Send the subscription; returns the server's status code
    async fn deliver(&self, subscription: &PushSubscription) -> ShopResult<u16>;
}

/// Push service issuing endpoints under the storefront origin.
///
/// Client keys are random; no message encryption is performed with them.
pub struct LocalPushService {
    origin: Url,
}

impl LocalPushService {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }
}

#[async_trait]
impl PushService for LocalPushService {
    async fn subscribe(&self, options: &SubscribeOptions) -> ShopResult<PushSubscription> {
        if !options.user_visible_only {
            return Err(ShopError::Subscription(
                "only user-visible subscriptions are supported".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let endpoint = self
            .origin
            .join(&format!("push/{}", id.simple()))
            .map_err(|e| ShopError::Subscription(e.to_string()))?;

        let mut public_key = vec![0x04];
        for _ in 0..4 {
            public_key.extend_from_slice(Uuid::new_v4().as_bytes());
        }

        Ok(PushSubscription {
            endpoint: endpoint.to_string(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: encode_key(&public_key),
                auth: encode_key(Uuid::new_v4().as_bytes()),
            },
        })
    }
}

/// POSTs subscriptions as JSON over HTTP
pub struct HttpSubscriptionSink {
    agent: ureq::Agent,
    url: Url,
}

impl HttpSubscriptionSink {
    pub fn new(url: Url, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, url }
    }
}

#[async_trait]
impl SubscriptionSink for HttpSubscriptionSink {
    async fn deliver(&self, subscription: &PushSubscription) -> ShopResult<u16> {
        let agent = self.agent.clone();
        let url = self.url.to_string();
        let body = serde_json::to_vec(subscription)?;

        let target = url.clone();
        let status = tokio::task::spawn_blocking(move || {
            agent
                .post(&target)
                .header("Content-Type", "application/json")
                .send(&body[..])
                .map(|response| response.status().as_u16())
        })
        .await
        .map_err(|e| ShopError::Internal(format!("subscription task failed: {}", e)))?
        .map_err(|e| ShopError::network(&url, e))?;

        Ok(status)
    }
}

/// Result of a subscription attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Permission was not granted; nothing else happened
    Denied,
    /// Permission granted but no subscription could be created
    Failed { reason: String },
    /// Subscribed; `status` is the server's answer, `None` if delivery failed
    Subscribed {
        subscription: PushSubscription,
        status: Option<u16>,
    },
}

/// Runs the subscription flow
pub struct NotificationSubscriber {
    prompt: Arc<dyn PermissionPrompt>,
    service: Arc<dyn PushService>,
    sink: Arc<dyn SubscriptionSink>,
    server_key: String,
}

impl NotificationSubscriber {
    pub fn new(
        prompt: Arc<dyn PermissionPrompt>,
        service: Arc<dyn PushService>,
        sink: Arc<dyn SubscriptionSink>,
        server_key: impl Into<String>,
    ) -> Self {
        Self {
            prompt,
            service,
            sink,
            server_key: server_key.into(),
        }
    }

    pub async fn run(&self) -> SubscribeOutcome {
        match self.prompt.request().await {
            Ok(Permission::Granted) => info!("Notification permission granted"),
            Ok(Permission::Denied) => {
                warn!("Notification permission denied");
                return SubscribeOutcome::Denied;
            }
            Err(e) => {
                warn!("Notification permission request failed: {}", e);
                return SubscribeOutcome::Denied;
            }
        }

        let subscription = match self.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Push notification subscription failed: {}", e);
                return SubscribeOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        debug!("Push notification subscription successful: {}", subscription.endpoint);

        let status = match self.sink.deliver(&subscription).await {
            Ok(status) => {
                info!("Subscription details sent to server: {}", status);
                Some(status)
            }
            Err(e) => {
                error!("Failed to send subscription details to server: {}", e);
                None
            }
        };

        SubscribeOutcome::Subscribed {
            subscription,
            status,
        }
    }

    async fn subscribe(&self) -> ShopResult<PushSubscription> {
        let options = SubscribeOptions::for_key(&self.server_key)?;
        self.service.subscribe(&options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PushConfig;
    use std::sync::Mutex;

    struct FixedPrompt(Permission);

    #[async_trait]
    impl PermissionPrompt for FixedPrompt {
        async fn request(&self) -> ShopResult<Permission> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<PushSubscription>>,
        fail: bool,
    }

    #[async_trait]
    impl SubscriptionSink for RecordingSink {
        async fn deliver(&self, subscription: &PushSubscription) -> ShopResult<u16> {
            if self.fail {
                return Err(ShopError::network("http://shop.test/subscribe", "refused"));
            }
            self.delivered.lock().unwrap().push(subscription.clone());
            Ok(201)
        }
    }

    fn origin() -> Url {
        Url::parse("http://shop.test/").unwrap()
    }

    fn subscriber(permission: Permission, sink: Arc<RecordingSink>, key: &str) -> NotificationSubscriber {
        NotificationSubscriber::new(
            Arc::new(FixedPrompt(permission)),
            Arc::new(LocalPushService::new(origin())),
            sink,
            key,
        )
    }

    fn default_key() -> String {
        PushConfig::default().application_server_key
    }

    #[tokio::test]
    async fn granted_permission_subscribes_and_delivers() {
        let sink = Arc::new(RecordingSink::default());
        let outcome = subscriber(Permission::Granted, Arc::clone(&sink), &default_key())
            .run()
            .await;

        let (subscription, status) = match outcome {
            SubscribeOutcome::Subscribed { subscription, status } => (subscription, status),
            other => panic!("expected a subscription, got {:?}", other),
        };
        assert_eq!(status, Some(201));
        assert!(subscription.endpoint.starts_with("http://shop.test/push/"));
        assert_eq!(sink.delivered.lock().unwrap().as_slice(), &[subscription]);
    }

    #[tokio::test]
    async fn denied_permission_stops_the_flow() {
        let sink = Arc::new(RecordingSink::default());
        let outcome = subscriber(Permission::Denied, Arc::clone(&sink), &default_key())
            .run()
            .await;

        assert_eq!(outcome, SubscribeOutcome::Denied);
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_key_fails_without_delivery() {
        let sink = Arc::new(RecordingSink::default());
        let outcome = subscriber(Permission::Granted, Arc::clone(&sink), "short").run().await;

        assert!(matches!(outcome, SubscribeOutcome::Failed { .. }));
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let outcome = subscriber(Permission::Granted, sink, &default_key()).run().await;

        assert!(matches!(outcome, SubscribeOutcome::Subscribed { status: None, .. }));
    }

    #[tokio::test]
    async fn local_service_issues_distinct_endpoints() {
        let service = LocalPushService::new(origin());
        let options = SubscribeOptions::for_key(&default_key()).unwrap();

        let a = service.subscribe(&options).await.unwrap();
        let b = service.subscribe(&options).await.unwrap();
        assert_ne!(a.endpoint, b.endpoint);
        assert_eq!(decode_server_key(&a.keys.p256dh).unwrap().len(), 65);
    }
}
