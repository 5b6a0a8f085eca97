//! Persistence gateway boundary: the document store as the core sees it.

use std::fmt;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use shared::domain::OperatorId;
use shared::protocol::StatusDocument;
use storage::{LocalStore, PUBLIC_STATUS_KEY};

const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 16;

/// Addresses a single logical "current status" document per visibility
/// scope: the operator's private draft or the shared public board.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentPath {
    Private { operator: OperatorId },
    Public,
}

impl DocumentPath {
    pub fn private(operator: OperatorId) -> Self {
        DocumentPath::Private { operator }
    }

    /// Key used by the local fallback store. The public scope maps onto the
    /// fixed `planning_public` key shared with the original's mock channel.
    pub fn storage_key(&self) -> String {
        match self {
            DocumentPath::Private { operator } => format!("draft/{operator}"),
            DocumentPath::Public => PUBLIC_STATUS_KEY.to_string(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentPath::Private { operator } => {
                write!(f, "users/{operator}/planning_data/current_status")
            }
            DocumentPath::Public => f.write_str("public/planning_data/current_status"),
        }
    }
}

/// One element of a subscription's event sequence: either the document's
/// new state (absent when nothing is stored) or a feed failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Changed(Option<StatusDocument>),
    Failed(String),
}

/// Cancellable handle on a document change feed. The sequence is lazy,
/// infinite and non-restartable; dropping the handle detaches the producer
/// task and no further events are delivered.
pub struct Subscription {
    receiver: mpsc::Receiver<FeedEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(receiver: mpsc::Receiver<FeedEvent>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }

    pub(crate) fn channel() -> (mpsc::Sender<FeedEvent>, mpsc::Receiver<FeedEvent>) {
        mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY)
    }

    /// Next event, or `None` once the feed has ended.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
pub trait StatusGateway: Send + Sync {
    /// Full replacement of the document at `path`.
    async fn write(&self, path: &DocumentPath, document: &StatusDocument) -> Result<()>;
    async fn read_once(&self, path: &DocumentPath) -> Result<Option<StatusDocument>>;
    async fn subscribe(&self, path: &DocumentPath) -> Result<Subscription>;
}

pub struct MissingGateway;

#[async_trait]
impl StatusGateway for MissingGateway {
    async fn write(&self, path: &DocumentPath, _document: &StatusDocument) -> Result<()> {
        Err(anyhow!("document store unavailable for {path}"))
    }

    async fn read_once(&self, path: &DocumentPath) -> Result<Option<StatusDocument>> {
        Err(anyhow!("document store unavailable for {path}"))
    }

    async fn subscribe(&self, path: &DocumentPath) -> Result<Subscription> {
        Err(anyhow!("document store unavailable for {path}"))
    }
}

/// Gateway over the local fallback store. Subscriptions deliver the current
/// state first, then re-read on every change notification for the key.
pub struct LocalGateway {
    store: LocalStore,
}

impl LocalGateway {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusGateway for LocalGateway {
    async fn write(&self, path: &DocumentPath, document: &StatusDocument) -> Result<()> {
        self.store.put_document(&path.storage_key(), document).await
    }

    async fn read_once(&self, path: &DocumentPath) -> Result<Option<StatusDocument>> {
        self.store.get_document(&path.storage_key()).await
    }

    async fn subscribe(&self, path: &DocumentPath) -> Result<Subscription> {
        let store = self.store.clone();
        let key = path.storage_key();
        let (tx, rx) = Subscription::channel();

        let task = tokio::spawn(async move {
            let mut changes = store.subscribe_changes();

            let initial = match store.get_document(&key).await {
                Ok(document) => FeedEvent::Changed(document),
                Err(err) => FeedEvent::Failed(err.to_string()),
            };
            if tx.send(initial).await.is_err() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(change) if change.key == key => {
                        let event = match store.get_document(&key).await {
                            Ok(document) => FeedEvent::Changed(document),
                            Err(err) => FeedEvent::Failed(err.to_string()),
                        };
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed notifications collapse into one re-read;
                        // only the latest state matters.
                        warn!(key = %key, skipped, "local feed lagged, re-reading current state");
                        let event = match store.get_document(&key).await {
                            Ok(document) => FeedEvent::Changed(document),
                            Err(err) => FeedEvent::Failed(err.to_string()),
                        };
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }
}
