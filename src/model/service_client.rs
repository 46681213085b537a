//! HTTP client for the music backend
//!
//! The rest of the crate only sees the [`StatusSource`], [`QueueBackend`] and
//! [`LibrarySource`] seams, so tests can swap in in-memory fakes.

use std::time::Duration;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::library::LibraryPage;
use super::queue::QueueCommand;
use super::types::Track;
use crate::config::ServerConfig;

/// Body of `GET /status` and of `player_state` channel messages
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub current_track: Option<Track>,
    #[serde(default)]
    pub sequence: Option<u64>,
}

/// One-shot pull of the authoritative playback state
pub trait StatusSource: Send + Sync {
    fn fetch_status(&self) -> BoxFuture<'_, Result<PlayerState>>;
}

/// Fire-and-await-confirmation queue commands. An `Err` is a rejection.
pub trait QueueBackend: Send + Sync {
    fn send_command<'a>(&'a self, command: &'a QueueCommand) -> BoxFuture<'a, Result<()>>;
}

pub trait LibrarySource: Send + Sync {
    fn fetch_library_page(&self, offset: usize, limit: usize) -> BoxFuture<'_, Result<LibraryPage>>;
}

#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_status(&self) -> Result<PlayerState> {
        crate::log_api_request!("get_status", url = %self.url("/status"));
        let result = async {
            let response = self.http.get(self.url("/status")).send().await?.error_for_status()?;
            Ok::<_, anyhow::Error>(response.json::<PlayerState>().await?)
        }
        .await;
        crate::log_api_result!("get_status", result);
        result
    }

    pub async fn get_library_page(&self, offset: usize, limit: usize) -> Result<LibraryPage> {
        crate::log_api_request!("get_library_page", offset, limit);
        let result = async {
            let response = self
                .http
                .get(self.url("/library/tracks"))
                .query(&[("offset", offset), ("limit", limit)])
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, anyhow::Error>(response.json::<LibraryPage>().await?)
        }
        .await;
        crate::log_api_result!("get_library_page", result);
        result
    }

    pub async fn send_queue_command(&self, command: &QueueCommand) -> Result<()> {
        let (method, path, body) = match command {
            QueueCommand::Append { track } => (Method::POST, "/queue/append", json!({ "track_id": track.id })),
            QueueCommand::Remove { indices } => (Method::POST, "/queue/remove", json!({ "indices": indices })),
            QueueCommand::Reorder { from, to } => (Method::POST, "/queue/reorder", json!({ "from": from, "to": to })),
            QueueCommand::Select { index } => (Method::POST, "/queue/play", json!({ "index": index })),
            QueueCommand::Clear => (Method::POST, "/queue/clear", json!({})),
            QueueCommand::SetShuffle { enabled } => (Method::PUT, "/queue/shuffle", json!({ "enabled": enabled })),
            QueueCommand::SetRepeat { mode } => (Method::PUT, "/queue/repeat", json!({ "mode": mode })),
        };

        crate::log_api_request!(command.name(), path);
        let result = async {
            self.http
                .request(method, self.url(path))
                .json(&body)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, anyhow::Error>(())
        }
        .await;
        crate::log_api_result!(command.name(), result);
        result
    }
}

impl StatusSource for ServiceClient {
    fn fetch_status(&self) -> BoxFuture<'_, Result<PlayerState>> {
        Box::pin(self.get_status())
    }
}

impl QueueBackend for ServiceClient {
    fn send_command<'a>(&'a self, command: &'a QueueCommand) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.send_queue_command(command))
    }
}

impl LibrarySource for ServiceClient {
    fn fetch_library_page(&self, offset: usize, limit: usize) -> BoxFuture<'_, Result<LibraryPage>> {
        Box::pin(self.get_library_page(offset, limit))
    }
}
