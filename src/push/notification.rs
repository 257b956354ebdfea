//! Notifications shown for push messages

use crate::config::schema::PushConfig;
use crate::error::ShopResult;
use serde::{Deserialize, Serialize};

/// A notification to display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

impl Notification {
    /// Notification for a push message payload
    pub fn from_push(config: &PushConfig, payload: Option<&str>) -> Self {
        Self {
            title: config.title.clone(),
            body: payload.unwrap_or_default().to_string(),
            icon: config.icon.clone(),
            badge: config.badge.clone(),
        }
    }
}

/// Displays notifications
pub trait Notifier: Send + Sync {
    fn show(&self, notification: &Notification) -> ShopResult<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_payload_becomes_body() {
        let n = Notification::from_push(&PushConfig::default(), Some("Fresh roast today"));
        assert_eq!(n.title, "Coffee Shop");
        assert_eq!(n.body, "Fresh roast today");
        assert_eq!(n.icon, "images/coffee-icon.png");
        assert_eq!(n.badge, "images/coffee-badge.png");
    }

    #[test]
    fn missing_payload_gives_empty_body() {
        let n = Notification::from_push(&PushConfig::default(), None);
        assert!(n.body.is_empty());
    }
}
