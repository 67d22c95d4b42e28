//! Event notification channel
//!
//! One WebSocket per channel. Queries are registered in the pending table
//! before they are written to the socket, so a reply can never arrive
//! ahead of its entry. A spawned reader task owns the read half and
//! completes entries as replies come in.
//!
//! Every entry completes exactly once: with its reply, with the failure
//! that tore the socket down, on `unsubscribe`, or when its caller's
//! timeout removes it. Entries whose receiver was dropped are pruned on
//! the next query.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::types::*;
use crate::config::ClientConfig;
use crate::error::{ErrorCode, YxError, YxResult};
use crate::serde_bytes::Bytes32;
use crate::{log_debug, log_info, log_warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Completion handle for one query
pub type EventReceiver = oneshot::Receiver<YxResult<EventResponse>>;

/// How long `unsubscribe` waits for the peer to answer the close frame
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

struct PendingRequest {
    event: EventName,
    reply: oneshot::Sender<YxResult<EventResponse>>,
}

struct Status {
    state: ChannelState,
    /// Bumped on every subscribe so a stale reader never touches a new session
    session: u64,
}

struct Shared {
    status: Mutex<Status>,
    pending: Mutex<HashMap<String, PendingRequest>>,
    writer: tokio::sync::Mutex<Option<WsWriter>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    /// Starts at 1 and is never reset, even across re-subscribes
    next_request_id: AtomicU64,
}

/// A poisoned lock still holds consistent data here; every critical
/// section is a single map or field update.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn state(&self) -> ChannelState {
        lock(&self.status).state
    }

    fn set_state(&self, state: ChannelState) {
        lock(&self.status).state = state;
    }

    /// Complete every pending entry with `err` and clear the table in one step
    fn fail_all(&self, err: &YxError) -> usize {
        let drained: Vec<(String, PendingRequest)> = lock(&self.pending).drain().collect();
        let count = drained.len();
        for (_, request) in drained {
            let _ = request.reply.send(Err(err.clone()));
        }
        count
    }

    fn remove(&self, request_id: &str) -> Option<PendingRequest> {
        lock(&self.pending).remove(request_id)
    }

    /// Route an inbound text frame. Only an unparseable envelope is fatal;
    /// well-formed but unmatched messages are dropped.
    fn dispatch(&self, text: &str) -> YxResult<()> {
        let response: EventResponse = serde_json::from_str(text).map_err(|e| {
            YxError::protocol_violation(format!("Malformed event envelope: {}", e))
        })?;

        let matched = {
            let mut pending = lock(&self.pending);
            let is_match = pending
                .get(&response.request_id)
                .map(|p| p.event.as_str() == response.name)
                .unwrap_or(false);
            if is_match {
                pending.remove(&response.request_id)
            } else {
                None
            }
        };

        match matched {
            Some(request) => {
                let _ = request.reply.send(Ok(response));
            }
            None => {
                log_debug!(
                    "event",
                    "dropping unmatched message",
                    name = response.name,
                    request_id = response.request_id
                );
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct EventNotificationChannel {
    endpoint: String,
    connect_timeout: Duration,
    query_timeout: Duration,
    shared: Arc<Shared>,
}

impl EventNotificationChannel {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_endpoint(
            config.event_endpoint(),
            config.connect_timeout(),
            config.event_query_timeout(),
        )
    }

    /// Full endpoint URL, e.g. `ws://127.0.0.1:8888/v1/event_notification`
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        query_timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            query_timeout,
            shared: Arc::new(Shared {
                status: Mutex::new(Status {
                    state: ChannelState::Disconnected,
                    session: 0,
                }),
                pending: Mutex::new(HashMap::new()),
                writer: tokio::sync::Mutex::new(None),
                reader: Mutex::new(None),
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Queries still waiting for a reply
    pub fn pending_count(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the socket. Only valid from `Disconnected`.
    pub async fn subscribe(&self) -> YxResult<()> {
        let session = {
            let mut status = lock(&self.shared.status);
            if status.state != ChannelState::Disconnected {
                return Err(YxError::channel_state(format!(
                    "Cannot subscribe while {:?}",
                    status.state
                )));
            }
            status.state = ChannelState::Connecting;
            status.session += 1;
            status.session
        };

        let connected = tokio::time::timeout(self.connect_timeout, connect_async(self.endpoint.as_str()))
            .await
            .map_err(|_| YxError::new(ErrorCode::Timeout, "WebSocket connect timed out"))
            .and_then(|r| r.map_err(YxError::from));

        let (ws, _response) = match connected {
            Ok(pair) => pair,
            Err(e) => {
                self.shared.set_state(ChannelState::Disconnected);
                log_warn!("event", "subscribe failed", endpoint = self.endpoint, error = e);
                return Err(e);
            }
        };

        let (writer, reader) = ws.split();
        *self.shared.writer.lock().await = Some(writer);
        let handle = tokio::spawn(read_loop(self.shared.clone(), reader, session));
        *lock(&self.shared.reader) = Some(handle);

        {
            let mut status = lock(&self.shared.status);
            // The reader already ended this session
            if status.session != session || status.state != ChannelState::Connecting {
                return Err(YxError::channel_closed("Connection ended while subscribing"));
            }
            status.state = ChannelState::Subscribed;
        }

        log_info!("event", "subscribed", endpoint = self.endpoint);
        Ok(())
    }

    /// Close handshake, then release the socket. Pending queries fail.
    pub async fn unsubscribe(&self) -> YxResult<()> {
        {
            let mut status = lock(&self.shared.status);
            if status.state != ChannelState::Subscribed {
                return Err(YxError::channel_state(format!(
                    "Cannot unsubscribe while {:?}",
                    status.state
                )));
            }
            status.state = ChannelState::Closing;
        }

        let writer = self.shared.writer.lock().await.take();
        if let Some(mut writer) = writer {
            // Sends the close frame
            if let Err(e) = writer.close().await {
                log_debug!("event", "close frame not sent", error = e);
            }
        }

        let handle = lock(&self.shared.reader).take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, &mut handle).await.is_err() {
                log_warn!("event", "peer did not finish close handshake");
                handle.abort();
            }
        }

        let failed = self
            .shared
            .fail_all(&YxError::channel_closed("Channel unsubscribed"));
        self.shared.set_state(ChannelState::Disconnected);
        log_info!("event", "unsubscribed", failed_pending = failed);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Register and send a query. The receiver completes exactly once.
    pub async fn query(&self, name: EventName, parameters: Value) -> YxResult<(String, EventReceiver)> {
        if self.state() != ChannelState::Subscribed {
            return Err(YxError::channel_state(format!(
                "Cannot query while {:?}",
                self.state()
            )));
        }

        let request_id = self
            .shared
            .next_request_id
            .fetch_add(1, Ordering::SeqCst)
            .to_string();
        let envelope = serde_json::to_string(&EventRequest {
            request_id: request_id.clone(),
            name,
            parameters,
        })?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.shared.pending);
            // Drop entries whose caller went away without waiting
            pending.retain(|_, p| !p.reply.is_closed());
            pending.insert(
                request_id.clone(),
                PendingRequest {
                    event: name,
                    reply: tx,
                },
            );
        }

        let sent = {
            let mut writer = self.shared.writer.lock().await;
            match writer.as_mut() {
                Some(w) => w.send(Message::Text(envelope.into())).await.map_err(YxError::from),
                None => Err(YxError::channel_closed("Channel is not connected")),
            }
        };

        if let Err(e) = sent {
            self.shared.remove(&request_id);
            log_warn!("event", "query send failed", request_id = request_id, error = e);
            return Err(e);
        }

        log_debug!("event", "query sent", name = name, request_id = request_id);
        Ok((request_id, rx))
    }

    /// Ask to be told when `tx_id` becomes irreversible
    pub async fn check_transaction_irreversibility(
        &self,
        tx_id: &Bytes32,
        block_number_hint: Option<u64>,
    ) -> YxResult<(String, EventReceiver)> {
        let parameters = serde_json::to_value(TxIrreversibilityParameters {
            tx_id: tx_id.to_hex(),
            block_num_hint: block_number_hint,
        })?;
        self.query(EventName::TxIrreversibility, parameters).await
    }

    /// [`check_transaction_irreversibility`](Self::check_transaction_irreversibility)
    /// and wait, bounded by the configured query timeout
    pub async fn wait_for_irreversibility(
        &self,
        tx_id: &Bytes32,
        block_number_hint: Option<u64>,
    ) -> YxResult<TxIrreversibility> {
        let (request_id, rx) = self
            .check_transaction_irreversibility(tx_id, block_number_hint)
            .await?;
        let response = self.await_reply(&request_id, rx, self.query_timeout).await?;
        response.irreversibility()
    }

    /// Wait for `rx`; on timeout the pending entry is removed so it
    /// cannot outlive the caller
    pub async fn await_reply(
        &self,
        request_id: &str,
        rx: EventReceiver,
        timeout: Duration,
    ) -> YxResult<EventResponse> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(YxError::channel_closed("Query dropped without a reply")),
            Err(_) => {
                self.shared.remove(request_id);
                Err(YxError::new(
                    ErrorCode::Timeout,
                    format!("No reply to request {} within {:?}", request_id, timeout),
                ))
            }
        }
    }
}

/// Owns the read half until the socket ends, then fails whatever is left
async fn read_loop(shared: Arc<Shared>, mut reader: WsReader, session: u64) {
    let outcome = loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = shared.dispatch(text.as_str()) {
                    break e;
                }
            }
            Some(Ok(Message::Binary(_))) => {
                break YxError::protocol_violation("Binary frames are not part of the event protocol");
            }
            Some(Ok(Message::Close(frame))) => {
                let reason = match frame {
                    Some(f) => format!("Closed by peer: {} {}", f.code, f.reason.as_str()),
                    None => "Closed by peer".to_string(),
                };
                break YxError::channel_closed(reason);
            }
            // ping/pong are answered by tungstenite
            Some(Ok(_)) => {}
            Some(Err(e)) => break YxError::from(e),
            None => break YxError::channel_closed("Connection ended"),
        }
    };

    // Writer first so a racing query cannot send into a dead socket
    let writer = shared.writer.lock().await.take();
    if let Some(mut writer) = writer {
        let _ = writer.close().await;
    }

    let failed = shared.fail_all(&outcome);
    {
        let mut status = lock(&shared.status);
        // unsubscribe finishes its own teardown
        if status.session == session && status.state != ChannelState::Closing {
            status.state = ChannelState::Disconnected;
        }
    }

    if outcome.code == ErrorCode::ChannelClosed {
        log_info!("event", "channel closed", reason = outcome.message, failed_pending = failed);
    } else {
        log_warn!("event", "channel failed", error = outcome, failed_pending = failed);
    }
}
