// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime change-feed client.
//!
//! One websocket is shared by every subscription. The socket is opened
//! lazily on the first [`RealtimeClient::subscribe`] call and driven by a
//! background task that writes outbound frames, sends heartbeats, and routes
//! change frames to per-topic mpsc senders. Each subscription joins its own
//! topic, so events for one (table, event kind) pair arrive in socket order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{OnceCell, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use voteros_config::model::{BackendConfig, RealtimeConfig};
use voteros_core::{ChangeEvent, ChangeEventKind, Subscription, SubscriptionId, VoterosError};

use crate::protocol::{self, Frame, events};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where change frames for one joined topic go.
struct Route {
    event: ChangeEventKind,
    tx: mpsc::Sender<ChangeEvent>,
}

/// The live socket: an outbound queue plus the task draining it.
struct Connection {
    outbound: mpsc::UnboundedSender<Frame>,
    task: JoinHandle<()>,
}

/// Shared subscription bookkeeping, reachable from subscription guards.
#[derive(Clone)]
struct Registry {
    routes: Arc<DashMap<String, Route>>,
    refs: Arc<AtomicU64>,
}

impl Registry {
    fn next_ref(&self) -> u64 {
        self.refs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Forget `topic` and tell the server we left. Idempotent.
    fn release(&self, topic: &str, outbound: &mpsc::UnboundedSender<Frame>) {
        if self.routes.remove(topic).is_some() {
            let _ = outbound.send(Frame::leave(topic, self.next_ref()));
            debug!(topic, "left realtime topic");
        }
    }
}

/// Websocket client for the backend's realtime service.
pub struct RealtimeClient {
    endpoint: Url,
    schema: String,
    heartbeat: Duration,
    capacity: usize,
    registry: Registry,
    connection: OnceCell<Connection>,
    cancel: CancellationToken,
}

impl RealtimeClient {
    pub fn new(backend: &BackendConfig, realtime: &RealtimeConfig) -> Result<Self, VoterosError> {
        let url = backend
            .url
            .as_deref()
            .ok_or_else(|| VoterosError::Config("backend.url is not set".into()))?;
        let api_key = backend
            .api_key
            .as_deref()
            .ok_or_else(|| VoterosError::Config("backend.api_key is not set".into()))?;

        Ok(Self {
            endpoint: realtime_endpoint(url, api_key)?,
            schema: backend.schema.clone(),
            heartbeat: Duration::from_secs(realtime.heartbeat_secs),
            capacity: realtime.channel_capacity,
            registry: Registry {
                routes: Arc::new(DashMap::new()),
                refs: Arc::new(AtomicU64::new(0)),
            },
            connection: OnceCell::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Joins a topic for `event` changes on `table`.
    pub async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventKind,
    ) -> Result<Subscription, VoterosError> {
        let connection = self.connection().await?;
        if connection.task.is_finished() {
            return Err(VoterosError::realtime("realtime socket is closed"));
        }

        let reference = self.registry.next_ref();
        let topic = format!(
            "realtime:{table}:{}:{reference}",
            event.to_string().to_ascii_lowercase()
        );
        let (tx, rx) = mpsc::channel(self.capacity);
        self.registry
            .routes
            .insert(topic.clone(), Route { event, tx });

        let join = Frame::join(&topic, &self.schema, table, event, reference);
        if connection.outbound.send(join).is_err() {
            self.registry.routes.remove(&topic);
            return Err(VoterosError::realtime("realtime socket is closed"));
        }
        info!(topic = %topic, "joined realtime topic");

        let registry = self.registry.clone();
        let outbound = connection.outbound.clone();
        Ok(Subscription::new(
            SubscriptionId(topic),
            table,
            event,
            rx,
            move |id| registry.release(&id.0, &outbound),
        ))
    }

    /// Leaves the topic behind `id`, if it is still joined.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        if let Some(connection) = self.connection.get() {
            self.registry.release(&id.0, &connection.outbound);
        }
    }

    /// Number of topics currently joined.
    pub fn active_topics(&self) -> usize {
        self.registry.routes.len()
    }

    /// Whether the socket was opened and its task is still running.
    pub fn is_connected(&self) -> bool {
        self.connection
            .get()
            .is_some_and(|connection| !connection.task.is_finished())
    }

    /// Stops the socket task; open subscriptions then yield `None`.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn connection(&self) -> Result<&Connection, VoterosError> {
        self.connection
            .get_or_try_init(|| async {
                let (socket, _response) = tokio_tungstenite::connect_async(self.endpoint.as_str())
                    .await
                    .map_err(|e| VoterosError::Realtime {
                        message: format!("failed to connect realtime socket: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                info!(host = self.endpoint.host_str().unwrap_or(""), "realtime socket connected");

                let (outbound, outbound_rx) = mpsc::unbounded_channel();
                let task = tokio::spawn(run_socket(
                    socket,
                    outbound_rx,
                    self.registry.clone(),
                    self.heartbeat,
                    self.cancel.clone(),
                ));
                Ok(Connection { outbound, task })
            })
            .await
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// `{url}/realtime/v1/websocket?apikey=..&vsn=1.0.0` on the ws/wss scheme.
pub fn realtime_endpoint(url: &str, api_key: &str) -> Result<Url, VoterosError> {
    let invalid = |detail: String| VoterosError::Config(format!("invalid backend.url `{url}`: {detail}"));

    let mut endpoint = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    let scheme = match endpoint.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    };
    endpoint
        .set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch to `{scheme}`")))?;
    if !endpoint.path().ends_with('/') {
        let path = format!("{}/", endpoint.path());
        endpoint.set_path(&path);
    }
    let mut endpoint = endpoint
        .join("realtime/v1/websocket")
        .map_err(|e| invalid(e.to_string()))?;
    endpoint
        .query_pairs_mut()
        .append_pair("apikey", api_key)
        .append_pair("vsn", "1.0.0");
    Ok(endpoint)
}

/// Drives one socket until it closes or `cancel` fires.
async fn run_socket(
    socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    registry: Registry,
    heartbeat: Duration,
    cancel: CancellationToken,
) {
    let (mut sink, mut stream) = socket.split();
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await;

    loop {
        let outgoing = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.close().await;
                debug!("realtime socket closed on shutdown");
                break;
            }
            _ = ticker.tick() => Frame::heartbeat(registry.next_ref()),
            Some(frame) = outbound.recv() => frame,
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(text.as_str(), &registry).await;
                        continue;
                    }
                    Some(Ok(Message::Close(reason))) => {
                        warn!(?reason, "realtime socket closed by server");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "realtime socket error");
                        break;
                    }
                    None => {
                        warn!("realtime socket stream ended");
                        break;
                    }
                }
            }
        };

        let text = match outgoing.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "dropping unencodable frame");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            warn!(error = %e, "realtime socket write failed");
            break;
        }
    }

    // Dropping the senders ends every open subscription.
    registry.routes.clear();
    // TODO: reconnect with backoff and rejoin the topics that were open.
}

/// Routes one inbound text frame.
async fn dispatch(text: &str, registry: &Registry) {
    let frame = match Frame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "ignoring realtime frame");
            return;
        }
    };

    if let Some(status) = frame.reply_status() {
        if status != "ok" && frame.topic != protocol::PHOENIX_TOPIC {
            warn!(topic = %frame.topic, status, payload = %frame.payload, "realtime join rejected");
            registry.routes.remove(&frame.topic);
        }
        return;
    }

    if frame.event == events::ERROR || frame.event == events::CLOSE {
        warn!(topic = %frame.topic, event = %frame.event, "realtime topic closed by server");
        registry.routes.remove(&frame.topic);
        return;
    }

    let Some(change) = protocol::change_event(&frame) else {
        return;
    };

    // Clone the sender so no map guard is held across the await.
    let tx = match registry.routes.get(&frame.topic) {
        Some(route) if route.event == change.kind => route.tx.clone(),
        _ => return,
    };
    if tx.send(change).await.is_err() {
        registry.routes.remove(&frame.topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_switches_to_websocket_scheme() {
        let url = realtime_endpoint("https://abc.supabase.co", "anon").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let url = realtime_endpoint("http://127.0.0.1:54321", "k").unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/realtime/v1/websocket");
    }

    #[test]
    fn endpoint_rejects_other_schemes() {
        assert!(matches!(
            realtime_endpoint("ftp://abc", "k"),
            Err(VoterosError::Config(_))
        ));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let registry = Registry {
            routes: Arc::new(DashMap::new()),
            refs: Arc::new(AtomicU64::new(0)),
        };
        let (tx, _rx) = mpsc::channel(1);
        registry.routes.insert(
            "realtime:t".into(),
            Route {
                event: ChangeEventKind::Insert,
                tx,
            },
        );
        let (outbound, mut frames) = mpsc::unbounded_channel();

        registry.release("realtime:t", &outbound);
        registry.release("realtime:t", &outbound);

        let leave = frames.recv().await.unwrap();
        assert_eq!(leave.event, "phx_leave");
        assert!(frames.try_recv().is_err());
        assert!(registry.routes.is_empty());
    }
}
