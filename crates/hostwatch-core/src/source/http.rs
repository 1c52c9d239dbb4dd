//! reqwest-backed client for the backend JSON API.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{FetchError, MetricsSource};
use crate::model::{DiskRecord, SnapshotRecord, UserSummaryRecord};

/// Talks to the backend at `base_url` (e.g. `http://127.0.0.1:8000`).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(FetchError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let bytes = self
            .get(path, query)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(format!("{}: {}", path, e)))
    }
}

fn host_query(host: &str) -> [(&'static str, String); 1] {
    [("host", host.to_string())]
}

impl MetricsSource for HttpSource {
    async fn dashboard(&self) -> Result<Vec<SnapshotRecord>, FetchError> {
        self.get_json("/api/dashboard", &[]).await
    }

    async fn hosts(&self) -> Result<Vec<String>, FetchError> {
        self.get_json("/api/hosts", &[]).await
    }

    async fn disk(&self, host: &str) -> Result<Vec<DiskRecord>, FetchError> {
        self.get_json("/api/disk", &host_query(host)).await
    }

    async fn history(
        &self,
        host: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<SnapshotRecord>, FetchError> {
        let query = [
            ("host", host.to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
        ];
        self.get_json("/api/history", &query).await
    }

    async fn summary(&self, host: &str) -> Result<Vec<UserSummaryRecord>, FetchError> {
        self.get_json("/api/summary", &host_query(host)).await
    }

    async fn server_info(&self, host: &str) -> Result<String, FetchError> {
        self.get("/api/server_info", &host_query(host))
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
