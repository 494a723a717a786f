// Origin HTTP client
// Author: storecache contributors

use super::Network;
use crate::config::OriginConfig;
use crate::error::{ProxyError, Result};
use crate::models::{FetchRequest, FetchResponse};
use async_trait::async_trait;
use reqwest::{redirect, Client, Method};
use std::time::Duration;
use tracing::{debug, warn};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Client for the origin serving the storefront.
///
/// Redirects are not followed: the browser receives them as-is, and since
/// they are not 2xx they are never cached.
#[derive(Clone)]
pub struct OriginClient {
    http_client: Client,
    base_url: String,
}

impl OriginClient {
    pub fn new(config: &OriginConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .redirect(redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created origin client for {}", config.base_url);

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> String {
        format!("{}{}", self.base_url, url)
    }
}

#[async_trait]
impl Network for OriginClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ProxyError::InvalidRequest(format!("bad method {}", request.method)))?;
        let url = self.resolve(&request.url);

        let mut builder = self.http_client.request(method, &url);
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Fetch {} {} failed: {}", request.method, url, e);
            ProxyError::Network(format!("{} {}: {}", request.method, request.url, e))
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Network(format!("reading body of {}: {}", request.url, e)))?;

        debug!("Fetched {} {} -> {}", request.method, request.url, status);

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
