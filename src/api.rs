// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Backends hand out `""` or `null` interchangeably for optional channel
/// attributes; both collapse to `None`.
fn deserialize_empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// A single playlist entry. Identity is its index position in the loaded
/// list, not a stable id; a refresh replaces the whole list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub title: String,
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub tvg_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub tvg_logo: Option<String>,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// One guide entry. `start`/`stop` are XMLTV timestamps
/// (`YYYYMMDDHHMMSS` with an optional offset suffix).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub start: String,
    #[serde(default, deserialize_with = "deserialize_empty_as_none")]
    pub stop: Option<String>,
    #[serde(default)]
    pub title: String,
}

/// Guide id (or channel title, for channels without one) -> programmes,
/// roughly chronological as supplied by the server.
pub type EpgMap = HashMap<String, Vec<Program>>;

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub cached: HashMap<String, bool>,
}

/// Thin client for the channel/EPG backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid server URL: {}", base_url))?;

        let client = Client::builder()
            .user_agent(concat!("tvgrid/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url, path))
    }

    /// GET a JSON endpoint. Every failure mode (transport error,
    /// non-success status, unparseable body) resolves to `None`; callers
    /// fall back to empty data and surface a notification.
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Request to {} returned HTTP {}", url, response.status());
            return None;
        }

        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to parse response from {}: {}", url, e);
                None
            }
        }
    }

    pub async fn channels(&self) -> Option<Vec<Channel>> {
        self.fetch_json("/api/channels").await
    }

    pub async fn epg(&self) -> Option<EpgMap> {
        self.fetch_json("/api/epg").await
    }

    pub async fn refresh(&self) -> Option<RefreshResponse> {
        self.fetch_json("/api/refresh").await
    }

    pub async fn health(&self) -> Option<HealthResponse> {
        self.fetch_json("/api/health").await
    }

    /// Raw JSON passthrough for the `api` subcommand.
    pub async fn fetch_raw(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Request to {} failed", url))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Server-side relay for the channel at `index`, used when the direct
    /// source URL cannot be fetched by the player.
    pub fn stream_url(&self, index: usize) -> String {
        self.endpoint(&format!("/api/stream/{}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_optional_fields_coerce_empty_and_null() {
        let json = r#"{
            "title": "News 24",
            "url": "http://example.com/news.m3u8",
            "group": "",
            "tvg_id": null,
            "tvg_logo": "http://example.com/logo.png"
        }"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.title, "News 24");
        assert_eq!(channel.group, None);
        assert_eq!(channel.tvg_id, None);
        assert_eq!(
            channel.tvg_logo.as_deref(),
            Some("http://example.com/logo.png")
        );
    }

    #[test]
    fn test_channel_missing_optional_fields() {
        let json = r#"{"title": "Bare", "url": "http://example.com/bare"}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.group, None);
        assert_eq!(channel.tvg_id, None);
        assert_eq!(channel.tvg_logo, None);
    }

    #[test]
    fn test_program_without_stop() {
        let json = r#"{"title": "Late Movie", "start": "20231105120000 +0000"}"#;
        let program: Program = serde_json::from_str(json).unwrap();
        assert_eq!(program.start, "20231105120000 +0000");
        assert_eq!(program.stop, None);
    }

    #[test]
    fn test_epg_map_shape() {
        let json = r#"{
            "news24.example": [
                {"title": "Morning Show", "start": "20231105080000", "stop": "20231105120000"}
            ]
        }"#;
        let epg: EpgMap = serde_json::from_str(json).unwrap();
        assert_eq!(epg["news24.example"].len(), 1);
        assert_eq!(epg["news24.example"][0].title, "Morning Show");
    }

    #[test]
    fn test_stream_url_joins_base() {
        let client = BackendClient::new("http://127.0.0.1:8000").unwrap();
        assert_eq!(client.stream_url(7), "http://127.0.0.1:8000/api/stream/7");
    }
}
