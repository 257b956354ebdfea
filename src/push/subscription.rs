//! Push subscription types and the application server key

use crate::error::{ShopError, ShopResult};
use base64::engine::general_purpose::URL_SAFE;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

/// Length of an uncompressed P-256 public key
const SERVER_KEY_LEN: usize = 65;

/// Options passed to the push service when subscribing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Every push message must show a notification
    pub user_visible_only: bool,
    /// Decoded application server public key
    pub application_server_key: Vec<u8>,
}

impl SubscribeOptions {
    /// Options for a URL-safe base64 application server key
    pub fn for_key(encoded: &str) -> ShopResult<Self> {
        Ok(Self {
            user_visible_only: true,
            application_server_key: decode_server_key(encoded)?,
        })
    }
}

/// Client keys of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A push subscription as sent to the application server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

/// Decode a URL-safe base64 application server key.
///
/// Standard-alphabet `+` and `/` are accepted as well. Missing padding is
/// added before decoding. The result must be an uncompressed P-256 point:
/// 65 bytes starting with `0x04`.
pub fn decode_server_key(encoded: &str) -> ShopResult<Vec<u8>> {
    let normalized = encoded.trim().replace('+', "-").replace('/', "_");
    let padding = "=".repeat((4 - normalized.len() % 4) % 4);
    let bytes = URL_SAFE
        .decode(format!("{}{}", normalized, padding))
        .map_err(|e| ShopError::InvalidServerKey(e.to_string()))?;

    if bytes.len() != SERVER_KEY_LEN || bytes[0] != 0x04 {
        return Err(ShopError::InvalidServerKey(format!(
            "expected a {}-byte uncompressed P-256 key, got {} bytes",
            SERVER_KEY_LEN,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Encode bytes the way subscription keys are transported
pub fn encode_key(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Resolve the subscription endpoint path against the origin
pub fn server_url(origin: &Url, server_path: &str) -> ShopResult<Url> {
    origin.join(server_path).map_err(|e| ShopError::InvalidOrigin {
        url: format!("{}{}", origin, server_path),
        reason: e.to_string(),
    })
}
