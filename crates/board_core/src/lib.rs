//! Core of the sector status board: view derivation, form collection, the
//! document-store boundary and the realtime update dispatcher.

use std::sync::Arc;

use anyhow::Result;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior},
};
use tracing::{error, info, warn};

pub mod collector;
pub mod entry;
pub mod gateway;
pub mod remote;
pub mod render;

pub use collector::{collect, FormState, SectorInput, DEFAULT_PRIORITY, DEFAULT_SHIFT};
pub use entry::{EntrySession, Feedback};
pub use gateway::{
    DocumentPath, FeedEvent, LocalGateway, MissingGateway, StatusGateway, Subscription,
};
pub use remote::RemoteGateway;
pub use render::{
    render, render_absent, BoardBody, HeaderView, PriorityTone, SectorCard, ViewModel,
    EMPTY_BOARD_NOTICE,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Fallback,
}

/// Explicit connection context threaded through the dispatcher instead of
/// module-wide flags. `source` names the currently attached feed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionContext {
    pub state: ConnectionState,
    pub source: Option<SourceKind>,
}

impl ConnectionContext {
    const fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            source: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state == ConnectionState::Connected && self.source == Some(SourceKind::Live)
    }
}

/// Connectivity as shown to the user, kept separate from the data itself:
/// a board with zero cards on a healthy feed is not the same thing as a
/// feed that never answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Connecting,
    ConnectedAwaitingData,
    ConnectedLive,
    LocalFallback,
    Error(String),
}

impl FeedStatus {
    pub fn describe(&self) -> String {
        match self {
            FeedStatus::Connecting => "Conectando ao servidor...".to_string(),
            FeedStatus::ConnectedAwaitingData => {
                "CONECTADO: Aguardando primeira transmissão...".to_string()
            }
            FeedStatus::ConnectedLive => "CONECTADO: Dados atualizados.".to_string(),
            FeedStatus::LocalFallback => "MODO LOCAL: ouvindo armazenamento local.".to_string(),
            FeedStatus::Error(reason) => format!("ERRO: {reason}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FeedStatus::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    Connectivity(FeedStatus),
    /// The previously displayed view is replaced wholesale; there is no
    /// incremental patching.
    ViewReplaced(ViewModel),
}

/// Feeds incoming status documents into the renderer, from exactly one
/// active source at a time: the live feed when available, the local
/// fallback otherwise. Delivery policy is last-delivered-wins.
pub struct Dispatcher {
    live: Arc<dyn StatusGateway>,
    fallback: Arc<dyn StatusGateway>,
    path: DocumentPath,
    reconnect_interval: Duration,
    events: broadcast::Sender<BoardEvent>,
    inner: Mutex<DispatcherState>,
}

struct DispatcherState {
    context: ConnectionContext,
    pump: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(
        live: Arc<dyn StatusGateway>,
        fallback: Arc<dyn StatusGateway>,
        path: DocumentPath,
    ) -> Arc<Self> {
        Self::new_with_reconnect_interval(live, fallback, path, DEFAULT_RECONNECT_INTERVAL)
    }

    pub fn new_with_reconnect_interval(
        live: Arc<dyn StatusGateway>,
        fallback: Arc<dyn StatusGateway>,
        path: DocumentPath,
        reconnect_interval: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            live,
            fallback,
            path,
            reconnect_interval,
            events,
            inner: Mutex::new(DispatcherState {
                context: ConnectionContext::disconnected(),
                pump: None,
                reconnect: None,
            }),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub async fn context(&self) -> ConnectionContext {
        self.inner.lock().await.context
    }

    /// Attaches the preferred feed, degrading to the local fallback when
    /// the live feed cannot be reached, and starts the reconnect timer.
    /// Feed failures are surfaced as events, never as a start error.
    pub async fn start(self: &Arc<Self>) {
        self.set_context(ConnectionState::Connecting, None).await;
        self.emit(BoardEvent::Connectivity(FeedStatus::Connecting));

        if let Err(err) = self.attach(SourceKind::Live, true).await {
            warn!(error = %err, "live feed unavailable, switching to local fallback");
            self.emit(BoardEvent::Connectivity(FeedStatus::Error(err.to_string())));
            if let Err(fallback_err) = self.attach(SourceKind::Fallback, true).await {
                error!(error = %fallback_err, "local fallback feed unavailable");
                self.set_context(ConnectionState::Disconnected, None).await;
                self.emit(BoardEvent::Connectivity(FeedStatus::Error(
                    fallback_err.to_string(),
                )));
            }
        }

        self.spawn_reconnect_timer().await;
    }

    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(pump) = guard.pump.take() {
            pump.abort();
        }
        if let Some(reconnect) = guard.reconnect.take() {
            reconnect.abort();
        }
        guard.context = ConnectionContext::disconnected();
    }

    async fn attach(self: &Arc<Self>, kind: SourceKind, abort_previous: bool) -> Result<()> {
        let gateway = match kind {
            SourceKind::Live => Arc::clone(&self.live),
            SourceKind::Fallback => Arc::clone(&self.fallback),
        };
        let subscription = gateway.subscribe(&self.path).await?;
        let pump = self.spawn_pump(subscription, kind);

        let mut guard = self.inner.lock().await;
        guard.context = ConnectionContext {
            state: ConnectionState::Connected,
            source: Some(kind),
        };
        if let Some(previous) = guard.pump.replace(pump) {
            if abort_previous {
                previous.abort();
            }
        }
        drop(guard);

        if kind == SourceKind::Fallback {
            self.emit(BoardEvent::Connectivity(FeedStatus::LocalFallback));
        } else {
            info!(path = %self.path, "live status feed attached");
        }
        Ok(())
    }

    fn spawn_pump(self: &Arc<Self>, mut subscription: Subscription, kind: SourceKind) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                match event {
                    FeedEvent::Changed(Some(document)) => {
                        let status = match kind {
                            SourceKind::Live => FeedStatus::ConnectedLive,
                            SourceKind::Fallback => FeedStatus::LocalFallback,
                        };
                        dispatcher.emit(BoardEvent::Connectivity(status));
                        dispatcher.emit(BoardEvent::ViewReplaced(render(&document)));
                    }
                    FeedEvent::Changed(None) => {
                        dispatcher
                            .emit(BoardEvent::Connectivity(FeedStatus::ConnectedAwaitingData));
                        dispatcher.emit(BoardEvent::ViewReplaced(render_absent()));
                    }
                    FeedEvent::Failed(reason) => {
                        warn!(source = ?kind, reason = %reason, "status feed failed");
                        dispatcher.emit(BoardEvent::Connectivity(FeedStatus::Error(reason)));
                        dispatcher.feed_lost(kind).await;
                        return;
                    }
                }
            }
            // Feed ended without a terminal error event.
            dispatcher.feed_lost(kind).await;
        })
    }

    async fn feed_lost(self: &Arc<Self>, kind: SourceKind) {
        match kind {
            SourceKind::Live => {
                self.set_context(ConnectionState::Reconnecting, None).await;
                // The dying pump is the caller here, so the previous handle
                // must not be aborted mid-switch.
                if let Err(err) = self.attach(SourceKind::Fallback, false).await {
                    error!(error = %err, "local fallback feed unavailable");
                    self.set_context(ConnectionState::Disconnected, None).await;
                    self.emit(BoardEvent::Connectivity(FeedStatus::Error(err.to_string())));
                }
            }
            SourceKind::Fallback => {
                self.set_context(ConnectionState::Disconnected, None).await;
            }
        }
    }

    async fn spawn_reconnect_timer(self: &Arc<Self>) {
        let dispatcher = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(dispatcher.reconnect_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                // Idempotent: firing while the live feed is attached is a no-op.
                if dispatcher.context().await.is_live() {
                    continue;
                }
                match dispatcher.attach(SourceKind::Live, true).await {
                    Ok(()) => info!("live status feed restored"),
                    Err(err) => warn!(error = %err, "live feed still unavailable"),
                }
            }
        });

        let mut guard = self.inner.lock().await;
        if let Some(previous) = guard.reconnect.replace(handle) {
            previous.abort();
        }
    }

    async fn set_context(&self, state: ConnectionState, source: Option<SourceKind>) {
        self.inner.lock().await.context = ConnectionContext { state, source };
    }

    fn emit(&self, event: BoardEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
