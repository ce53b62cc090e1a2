//! Authenticated fetch gateway.
//!
//! Every upstream call goes through a [`Transport`]. The core only ever issues `GET` requests
//! carrying a `Basic` authorization header; how those requests reach the server is the
//! transport's business:
//!
//! - [`DirectTransport`] sends the request to the target URL with the header attached.
//! - [`RelayTransport`] sends it to a relay endpoint that forwards to the real API. The target
//!   URL and the authorization header travel as the `url` and `Authorization` query parameters.
//!
//! [`from_config`] picks the relay whenever one is configured.

use crate::config::CoreConfig;
use crate::{DashboardError, DashboardResult};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use std::sync::Arc;

/// Status and body of an upstream response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues authenticated `GET` requests.
///
/// Implementations return `Ok` for any response that arrived, whatever its status; only
/// failures to obtain a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, authorization: &str) -> DashboardResult<HttpResponse>;
}

fn build_http_client(cfg: &CoreConfig) -> DashboardResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(cfg.request_timeout())
        .build()?)
}

async fn read_response(response: reqwest::Response) -> DashboardResult<HttpResponse> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpResponse { status, body })
}

/// Sends requests straight to the instance.
#[derive(Clone, Debug)]
pub struct DirectTransport {
    http: reqwest::Client,
}

impl DirectTransport {
    pub fn new(cfg: &CoreConfig) -> DashboardResult<Self> {
        Ok(Self {
            http: build_http_client(cfg)?,
        })
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn get(&self, url: &str, authorization: &str) -> DashboardResult<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        read_response(response).await
    }
}

/// Routes requests through a relay that forwards them to the instance.
#[derive(Clone, Debug)]
pub struct RelayTransport {
    http: reqwest::Client,
    relay_url: Url,
}

impl RelayTransport {
    pub fn new(cfg: &CoreConfig, relay_url: &str) -> DashboardResult<Self> {
        let relay_url = Url::parse(relay_url)
            .map_err(|e| DashboardError::InvalidInput(format!("invalid relay URL: {e}")))?;
        Ok(Self {
            http: build_http_client(cfg)?,
            relay_url,
        })
    }

    /// The relay URL carrying `target` and `authorization` as encoded query parameters.
    pub fn relay_request_url(&self, target: &str, authorization: &str) -> Url {
        let mut url = self.relay_url.clone();
        url.query_pairs_mut()
            .append_pair("url", target)
            .append_pair("Authorization", authorization);
        url
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn get(&self, url: &str, authorization: &str) -> DashboardResult<HttpResponse> {
        tracing::debug!("GET {} via relay {}", url, self.relay_url);
        let response = self
            .http
            .get(self.relay_request_url(url, authorization))
            .send()
            .await?;
        read_response(response).await
    }
}

/// Builds the transport selected by the configuration.
pub fn from_config(cfg: &CoreConfig) -> DashboardResult<Arc<dyn Transport>> {
    match cfg.relay_url() {
        Some(relay_url) => {
            tracing::info!("routing upstream requests through relay {}", relay_url);
            Ok(Arc::new(RelayTransport::new(cfg, relay_url)?))
        }
        None => Ok(Arc::new(DirectTransport::new(cfg)?)),
    }
}
