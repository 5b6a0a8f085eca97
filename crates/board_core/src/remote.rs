//! Hosted document store client: HTTP reads/writes plus a websocket
//! subscription feed. Transport only; retry policy lives with the caller
//! (the dispatcher's fallback and reconnect timer).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::info;

use shared::domain::OperatorId;
use shared::error::{StoreError, StoreErrorCode};
use shared::protocol::StatusDocument;

use crate::gateway::{DocumentPath, FeedEvent, StatusGateway, Subscription};

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

pub struct RemoteGateway {
    http: Client,
    base_url: String,
    operator: OperatorId,
}

impl RemoteGateway {
    /// Anonymous session handshake with the hosted store. The returned
    /// session id is opaque; it is only ever used to address the private
    /// document path.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::new();
        let response = http
            .post(format!("{base_url}/session"))
            .send()
            .await
            .map_err(|err| {
                anyhow!(StoreError::unavailable(format!(
                    "failed to open store session: {err}"
                )))
            })?
            .error_for_status()?;
        let body: SessionResponse = response
            .json()
            .await
            .context("invalid session handshake response")?;
        info!(operator = %body.session_id, "document store session established");

        Ok(Self {
            http,
            base_url,
            operator: OperatorId(body.session_id),
        })
    }

    pub fn operator(&self) -> &OperatorId {
        &self.operator
    }

    fn document_url(&self, path: &DocumentPath) -> String {
        format!("{}/documents/{path}", self.base_url)
    }

    fn watch_url(&self, path: &DocumentPath) -> Result<String> {
        let ws_base = if self.base_url.starts_with("https://") {
            self.base_url.replacen("https://", "wss://", 1)
        } else if self.base_url.starts_with("http://") {
            self.base_url.replacen("http://", "ws://", 1)
        } else {
            return Err(anyhow!("store url must start with http:// or https://"));
        };
        Ok(format!("{ws_base}/watch/{path}"))
    }
}

#[async_trait]
impl StatusGateway for RemoteGateway {
    async fn write(&self, path: &DocumentPath, document: &StatusDocument) -> Result<()> {
        let response = self
            .http
            .put(self.document_url(path))
            .json(document)
            .send()
            .await
            .map_err(|err| {
                anyhow!(StoreError::unavailable(format!(
                    "store write failed for {path}: {err}"
                )))
            })?;
        if !response.status().is_success() {
            return Err(anyhow!(store_error_from_response(path, response).await));
        }
        Ok(())
    }

    async fn read_once(&self, path: &DocumentPath) -> Result<Option<StatusDocument>> {
        let response = self
            .http
            .get(self.document_url(path))
            .send()
            .await
            .map_err(|err| {
                anyhow!(StoreError::unavailable(format!(
                    "store read failed for {path}: {err}"
                )))
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(store_error_from_response(path, response).await));
        }
        let value: Value = response
            .json()
            .await
            .with_context(|| format!("invalid document payload for {path}"))?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(StatusDocument::from_value(&value)))
    }

    async fn subscribe(&self, path: &DocumentPath) -> Result<Subscription> {
        let watch_url = self.watch_url(path)?;
        let (ws_stream, _) = connect_async(&watch_url)
            .await
            .with_context(|| format!("failed to connect watch feed: {watch_url}"))?;
        let (_, mut ws_reader) = ws_stream.split();
        let (tx, rx) = Subscription::channel();

        let task = tokio::spawn(async move {
            while let Some(message) = ws_reader.next().await {
                let event = match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(Value::Null) => FeedEvent::Changed(None),
                        Ok(value) => FeedEvent::Changed(Some(StatusDocument::from_value(&value))),
                        Err(err) => FeedEvent::Failed(format!("invalid watch payload: {err}")),
                    },
                    Ok(Message::Close(_)) => {
                        let _ = tx
                            .send(FeedEvent::Failed("watch feed closed by server".into()))
                            .await;
                        return;
                    }
                    Ok(_) => continue,
                    Err(err) => {
                        let _ = tx
                            .send(FeedEvent::Failed(format!("watch feed receive failed: {err}")))
                            .await;
                        return;
                    }
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }
}

async fn store_error_from_response(path: &DocumentPath, response: reqwest::Response) -> StoreError {
    let status = response.status();
    // The store serializes a StoreError body for application-level
    // failures; anything else collapses into a code from the HTTP status.
    if let Ok(body) = response.json::<StoreError>().await {
        return body;
    }
    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreErrorCode::Unauthorized,
        StatusCode::NOT_FOUND => StoreErrorCode::NotFound,
        StatusCode::BAD_REQUEST => StoreErrorCode::Validation,
        StatusCode::SERVICE_UNAVAILABLE => StoreErrorCode::Unavailable,
        _ => StoreErrorCode::Internal,
    };
    StoreError::new(code, format!("store request for {path} failed: {status}"))
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
