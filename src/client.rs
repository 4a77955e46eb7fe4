//! HTTP client for the console's request/response API.
//!
//! One-shot actions (scan control, track control, dataset resets) and the
//! periodic device snapshot all go through here. The client maps transport
//! failures and error-status bodies into [`ClientError`]; it issues no
//! automatic retries; one-shot user actions are retried by the user.

use crate::types::{BdAddress, DevicePatch};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server returned error status: {status}")]
    ServerError { status: StatusCode },
    #[error("API error: {0}")]
    Api(String),
}

/// Configuration for the console API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the console server, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Server configuration payload; carries the session token compared by the
/// continuity monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    pub session_token: String,
    #[serde(default)]
    pub scan_interval_secs: Option<u64>,
}

/// Generic status body returned by action endpoints.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Target entry posted to `/api/targets`.
#[derive(Debug, Serialize)]
struct TargetBody<'a> {
    bd_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
}

/// Breadcrumb sample as served by `/api/breadcrumbs`.
#[derive(Debug, Clone, Deserialize)]
pub struct BreadcrumbWire {
    pub bd_address: BdAddress,
    pub lat: f64,
    pub lon: f64,
    pub rssi: i16,
    #[serde(default, rename = "time")]
    pub timestamp_ms: u64,
}

/// Active track session entry as served by `/api/track/active`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveTrackWire {
    pub bd_address: BdAddress,
}

/// Client for the console API.
pub struct ConsoleClient {
    client: Client,
    config: ClientConfig,
}

impl ConsoleClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(ClientError::ServerError { status }),
        }
    }

    async fn post_action(&self, path: &str) -> Result<(), ClientError> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        let response = self.client.post(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ServerError { status });
        }

        // Action endpoints report failures in the body as often as in the
        // status line.
        let body: ApiStatus = response.json().await.unwrap_or(ApiStatus {
            status: None,
            error: None,
        });
        if let Some(err) = body.error {
            return Err(ClientError::Api(err));
        }
        if matches!(body.status.as_deref(), Some("error")) {
            return Err(ClientError::Api("unspecified server error".into()));
        }
        Ok(())
    }

    /// Fetch the server configuration, including the session token.
    pub async fn fetch_config(&self) -> Result<ConsoleConfig, ClientError> {
        self.get_json("/api/config").await
    }

    /// Fetch the full device snapshot.
    pub async fn fetch_devices(&self) -> Result<Vec<DevicePatch>, ClientError> {
        self.get_json("/api/devices").await
    }

    pub async fn start_scan(&self) -> Result<(), ClientError> {
        self.post_action("/api/scan/start").await
    }

    pub async fn stop_scan(&self) -> Result<(), ClientError> {
        self.post_action("/api/scan/stop").await
    }

    pub async fn clear_devices(&self) -> Result<(), ClientError> {
        self.post_action("/api/devices/clear").await
    }

    /// Ask the server for a fresh geolocation estimate of one device.
    pub async fn locate_device(&self, addr: &BdAddress) -> Result<(), ClientError> {
        self.post_action(&format!("/api/device/{}/locate", addr)).await
    }

    pub async fn track_start(&self, addr: &BdAddress) -> Result<(), ClientError> {
        self.post_action(&format!("/api/device/{}/track/start", addr))
            .await
    }

    pub async fn track_stop(&self, addr: &BdAddress) -> Result<(), ClientError> {
        self.post_action(&format!("/api/device/{}/track/stop", addr))
            .await
    }

    /// Authoritative list of active track sessions.
    pub async fn fetch_active_tracks(&self) -> Result<Vec<BdAddress>, ClientError> {
        let entries: Vec<ActiveTrackWire> = self.get_json("/api/track/active").await?;
        Ok(entries.into_iter().map(|e| e.bd_address).collect())
    }

    /// Breadcrumb samples for the heatmap (targets only, server-filtered).
    pub async fn fetch_breadcrumbs(&self) -> Result<Vec<BreadcrumbWire>, ClientError> {
        self.get_json("/api/breadcrumbs").await
    }

    pub async fn reset_device_geo(&self, addr: &BdAddress) -> Result<(), ClientError> {
        self.post_action(&format!("/api/device/{}/geo/reset", addr))
            .await
    }

    pub async fn reset_all_geo(&self) -> Result<(), ClientError> {
        self.post_action("/api/geo/reset_all").await
    }

    pub async fn reset_breadcrumbs(&self) -> Result<(), ClientError> {
        self.post_action("/api/breadcrumbs/reset").await
    }

    pub async fn reset_system_trail(&self) -> Result<(), ClientError> {
        self.post_action("/api/system_trail/reset").await
    }

    /// Add a watched target, optionally with a display alias.
    pub async fn add_target(
        &self,
        addr: &BdAddress,
        alias: Option<&str>,
    ) -> Result<(), ClientError> {
        let url = self.url("/api/targets");
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&TargetBody {
                bd_address: addr.as_str(),
                alias,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ServerError { status });
        }
        Ok(())
    }

    pub async fn remove_target(&self, addr: &BdAddress) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/targets/{}", addr));
        tracing::debug!("DELETE {}", url);
        let status = self.client.delete(&url).send().await?.status();
        if !status.is_success() {
            return Err(ClientError::ServerError { status });
        }
        Ok(())
    }
}
