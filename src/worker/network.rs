//! Network client used by the worker
//!
//! The worker talks to the network only through the [`Network`] trait;
//! [`HttpNetwork`] is the real implementation on top of `ureq`.

use crate::error::{ShopError, ShopResult};
use crate::worker::request::{status_text_for, Method, Request, Response, ResponseType};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Abstract network interface
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a request. An `Err` means no response was obtained at all;
    /// HTTP error statuses come back as `Ok` responses.
    async fn fetch(&self, request: &Request) -> ShopResult<Response>;
}

/// HTTP network client
///
/// Responses from the configured origin are typed `basic`; everything else
/// is `cors`.
pub struct HttpNetwork {
    agent: ureq::Agent,
    origin: Url,
}

impl HttpNetwork {
    /// Create a client for the given origin
    pub fn new(origin: Url, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, origin }
    }

    /// Origin requests are classified against
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn send(agent: &ureq::Agent, request: &Request) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        let body = request.body.clone().unwrap_or_default();

        macro_rules! with_headers {
            ($builder:expr) => {{
                let mut builder = $builder;
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder
            }};
        }

        match request.method {
            Method::Get => with_headers!(agent.get(url)).call(),
            Method::Head => with_headers!(agent.head(url)).call(),
            Method::Delete => with_headers!(agent.delete(url)).call(),
            Method::Options => with_headers!(agent.options(url)).call(),
            Method::Post => with_headers!(agent.post(url)).send(&body[..]),
            Method::Put => with_headers!(agent.put(url)).send(&body[..]),
            Method::Patch => with_headers!(agent.patch(url)).send(&body[..]),
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> ShopResult<Response> {
        let agent = self.agent.clone();
        let owned = request.clone();
        let response_type = if request.is_same_origin(&self.origin) {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };

        debug!("Fetching {} {}", request.method, request.url);

        // ureq is blocking; keep it off the async workers.
        let result = tokio::task::spawn_blocking(move || {
            let mut response = Self::send(&agent, &owned)?;
            let status = response.status().as_u16();
            let headers: BTreeMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let body = response.body_mut().read_to_vec()?;
            Ok::<_, ureq::Error>((status, headers, body))
        })
        .await
        .map_err(|e| ShopError::Internal(format!("network task failed: {}", e)))?;

        let (status, headers, body) = result.map_err(|e| ShopError::network(&request.url, e))?;
        debug!("{} {} -> {}", request.method, request.url, status);

        Ok(Response {
            response_type,
            url: request.url.clone(),
            status,
            status_text: status_text_for(status).to_string(),
            headers,
            body,
        })
    }
}
