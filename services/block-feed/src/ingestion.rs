//! Stream ingestion layer for the Block Feed Service
//!
//! Owns the single WebSocket connection to the flashblock feed, decodes
//! every inbound frame and hands the resulting [`SubBlockEvent`] to one
//! registered [`SubBlockConsumer`], synchronously and in arrival order.
//!
//! Connection lifecycle:
//!
//! ```text
//! Idle → Connecting → Open → Closing → Closed
//!            │          │       │
//!            └──────────┴───────┴──→ Errored
//! ```
//!
//! A `Closed` or `Errored` ingestor only goes back to `Open` through a
//! fresh [`StreamIngestor::connect`], which starts a new session. The
//! ingestor never reconnects on its own; see [`crate::supervisor`].

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, info_span, warn, Instrument};
use types::block::SubBlockEvent;
use uuid::Uuid;

use crate::aggregator::SubBlockConsumer;
use crate::events::{decode_binary, decode_text, DecodeError};
use crate::metrics::FeedMetrics;

/// Socket type produced by [`StreamIngestor::connect`].
pub type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors raised by the ingestor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestorError {
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("connection error: {0}")]
    Connection(String),
}

/// Connection state of the ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Errored,
}

impl ConnectionState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Idle | Closed | Errored, Connecting)
                | (Connecting, Open | Errored)
                | (Open, Closing | Errored)
                | (Closing, Closed | Errored)
        )
    }

    /// Whether the session has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }
}

/// What happened to a single inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Decoded and handed to the consumer.
    Delivered(SubBlockEvent),
    /// Could not be decoded; dropped.
    Dropped(DecodeError),
    /// Ping that must be answered with a Pong carrying this payload.
    Ping(Bytes),
    /// Peer started the close handshake.
    Closed,
    /// Not processed (control frame, or the connection is not open).
    Ignored,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Local shutdown was requested; the close frame was sent.
    Shutdown,
    /// The feed closed the connection.
    RemoteClosed,
    /// The connection failed mid-session.
    Errored(IngestorError),
}

/// Maintains one connection to the feed and feeds a single consumer.
pub struct StreamIngestor<C: SubBlockConsumer> {
    url: String,
    consumer: C,
    state: ConnectionState,
    session_id: Option<Uuid>,
    metrics: Arc<FeedMetrics>,
    sessions_started: u64,
    events_delivered: u64,
    frames_dropped: u64,
}

impl<C: SubBlockConsumer> StreamIngestor<C> {
    pub fn new(url: impl Into<String>, consumer: C, metrics: Arc<FeedMetrics>) -> Self {
        let url = url.into();
        info!(url = %url, "StreamIngestor initialized");

        Self {
            url,
            consumer,
            state: ConnectionState::Idle,
            session_id: None,
            metrics,
            sessions_started: 0,
            events_delivered: 0,
            frames_dropped: 0,
        }
    }

    /// Open a new session against the configured endpoint.
    ///
    /// Valid from `Idle`, `Closed` or `Errored`. On failure the ingestor is
    /// left `Errored`.
    pub async fn connect(&mut self) -> Result<FeedStream, IngestorError> {
        self.transition(ConnectionState::Connecting)?;

        let session_id = Uuid::now_v7();
        self.session_id = Some(session_id);
        self.sessions_started += 1;
        info!(%session_id, url = %self.url, "Connecting to flashblock feed");

        match connect_async(self.url.as_str()).await {
            Ok((stream, _response)) => {
                self.transition(ConnectionState::Open)?;
                self.metrics.record_session_opened();
                info!(%session_id, url = %self.url, "Flashblock feed ready");
                Ok(stream)
            }
            Err(e) => {
                let err = IngestorError::Connect {
                    url: self.url.clone(),
                    reason: e.to_string(),
                };
                self.on_error(&err);
                Err(err)
            }
        }
    }

    /// Process one inbound message. Only acts while `Open`.
    pub fn on_frame(&mut self, message: Message) -> FrameOutcome {
        if self.state != ConnectionState::Open {
            debug!(state = ?self.state, "Ignoring frame outside an open session");
            return FrameOutcome::Ignored;
        }

        match message {
            Message::Binary(bytes) => {
                self.metrics.record_frame_received();
                self.deliver(decode_binary(&bytes))
            }
            Message::Text(text) => {
                self.metrics.record_frame_received();
                self.deliver(decode_text(text.as_str()))
            }
            Message::Ping(payload) => FrameOutcome::Ping(payload),
            Message::Close(frame) => {
                info!(
                    session_id = ?self.session_id,
                    reason = ?frame.as_ref().map(|f| f.reason.as_str()),
                    "Feed closed the connection"
                );
                self.state = ConnectionState::Closing;
                FrameOutcome::Closed
            }
            Message::Pong(_) | Message::Frame(_) => FrameOutcome::Ignored,
        }
    }

    /// Record a connection failure and move to `Errored`.
    pub fn on_error(&mut self, err: &IngestorError) {
        error!(session_id = ?self.session_id, error = %err, "Flashblock feed error");
        self.metrics.record_connection_error();
        if self.state.can_transition_to(ConnectionState::Errored) {
            self.state = ConnectionState::Errored;
        }
    }

    /// Send a close frame and finish the session.
    pub async fn close(&mut self, stream: &mut FeedStream) {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closing;
        }
        info!(session_id = ?self.session_id, "Closing flashblock feed connection");
        if let Err(e) = stream.close(None).await {
            debug!(error = %e, "Close handshake did not complete");
        }
        if self.state == ConnectionState::Closing {
            self.state = ConnectionState::Closed;
        }
    }

    /// Run one session: connect, then pump frames until the feed closes,
    /// the connection fails or `shutdown` flips to `true`.
    ///
    /// The socket lives inside this future and is released on every exit
    /// path, including the future being dropped.
    pub async fn run(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, IngestorError> {
        if *shutdown.borrow() {
            return Ok(SessionEnd::Shutdown);
        }

        let mut stream = self.connect().await?;
        let span = info_span!(
            "feed_session",
            session_id = %self.session_id.unwrap_or_else(Uuid::nil),
        );

        self.pump(&mut stream, shutdown).instrument(span).await
    }

    async fn pump(
        &mut self,
        stream: &mut FeedStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, IngestorError> {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender is treated as a shutdown request
                    if changed.is_err() || *shutdown.borrow() {
                        self.close(stream).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(message)) => {
                        if let FrameOutcome::Ping(payload) = self.on_frame(message) {
                            if let Err(e) = stream.send(Message::Pong(payload)).await {
                                return Ok(self.fail(IngestorError::Connection(e.to_string())));
                            }
                        }
                    }
                    Some(Err(e)) => {
                        if let Some(end) = self.finish_remote_close() {
                            return Ok(end);
                        }
                        return Ok(self.fail(IngestorError::Connection(e.to_string())));
                    }
                    None => {
                        if let Some(end) = self.finish_remote_close() {
                            return Ok(end);
                        }
                        return Ok(self.fail(IngestorError::Connection(
                            "stream ended without a close frame".to_string(),
                        )));
                    }
                },
            }
        }
    }

    fn deliver(&mut self, decoded: Result<SubBlockEvent, DecodeError>) -> FrameOutcome {
        match decoded {
            Ok(event) => {
                self.metrics.record_frame_decoded();
                self.events_delivered += 1;
                debug!(
                    block_number = event.parent_block_number,
                    index = event.sequence_index,
                    transactions = event.transaction_count,
                    "Sub-block received"
                );
                self.consumer.on_sub_block(event);
                FrameOutcome::Delivered(event)
            }
            Err(e) => {
                self.metrics.record_frame_dropped();
                self.frames_dropped += 1;
                warn!(error = %e, "Dropping malformed frame");
                FrameOutcome::Dropped(e)
            }
        }
    }

    fn finish_remote_close(&mut self) -> Option<SessionEnd> {
        if self.state != ConnectionState::Closing {
            return None;
        }
        self.state = ConnectionState::Closed;
        info!(session_id = ?self.session_id, "Flashblock feed session closed");
        Some(SessionEnd::RemoteClosed)
    }

    fn fail(&mut self, err: IngestorError) -> SessionEnd {
        self.on_error(&err);
        SessionEnd::Errored(err)
    }

    fn transition(&mut self, next: ConnectionState) -> Result<(), IngestorError> {
        if !self.state.can_transition_to(next) {
            return Err(IngestorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = ?self.state, to = ?next, "Ingestor state change");
        self.state = next;
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Identifier of the current (or last) session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    /// Give back the consumer, ending the ingestor.
    pub fn into_consumer(self) -> C {
        self.consumer
    }

    /// Total sessions started since creation.
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Total events handed to the consumer since creation.
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered
    }

    /// Total undecodable frames dropped since creation.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}
