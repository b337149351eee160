//! Connection lifecycle: the persistent WebSocket channel to the relay.
//!
//! The transport task owns the socket and runs the reconnect loop
//! `Connecting -> Open -> Closed -> Connecting -> ...`, surfacing discrete
//! [`ConnectionEvent`]s to the engine over an mpsc channel and draining one
//! outbound message channel into the socket. Every disconnect is treated as
//! retryable; durability comes from the resync the engine performs on each
//! `Opened`, not from any replay buffer. Dropping a connection drops its
//! reader with it, so a stale in-flight frame from before a disconnect can
//! never be delivered after the reconnect.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::Message;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite};

/// How long to wait after a disconnect before dialing the relay again.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Channel readiness, one instance per client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Discrete connectivity and protocol events delivered to the engine in
/// arrival order.
#[derive(Debug)]
pub enum ConnectionEvent {
    Connecting,
    Opened,
    Closed,
    Inbound(Message),
}

/// Explicitly owned connection state, passed by reference to the sync
/// client rather than living as an ambient singleton. Tracks whether the
/// full-state response for the current connection has arrived yet.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    has_completed_initial_sync: bool,
}

impl ConnectionLifecycle {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            has_completed_initial_sync: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn has_completed_initial_sync(&self) -> bool {
        self.has_completed_initial_sync
    }

    /// Entry to `Open`. The caller must immediately issue a full-state
    /// request; until its response lands the store may be stale or empty,
    /// and rendering proceeds anyway.
    pub fn set_open(&mut self) {
        self.state = ConnectionState::Open;
        self.has_completed_initial_sync = false;
    }

    pub fn set_closed(&mut self) {
        self.state = ConnectionState::Closed;
        self.has_completed_initial_sync = false;
    }

    pub fn set_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
        self.has_completed_initial_sync = false;
    }

    pub fn mark_synced(&mut self) {
        self.has_completed_initial_sync = true;
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the reconnect loop against a fixed relay address for the life of
/// the process. Returns when the event channel closes (engine shutdown).
pub async fn run_transport(
    url: String,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        info!("Connecting to relay at {}", url);
        if events.send(ConnectionEvent::Connecting).is_err() {
            return;
        }

        let stream = match connect_async(&url).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                if events.send(ConnectionEvent::Closed).is_err() {
                    return;
                }
                drain_outbound(&mut outbound);
                sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        if events.send(ConnectionEvent::Opened).is_err() {
            return;
        }

        let (mut sink, mut source) = stream.split();

        // One connection's worth of traffic. Ends on any socket error or
        // close frame; the split halves are dropped together, taking any
        // undelivered in-flight frames with them.
        loop {
            tokio::select! {
                intent = outbound.recv() => {
                    let Some(message) = intent else { return };
                    let text = match message.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode outbound message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(tungstenite::Message::Text(text)).await {
                        warn!("Send failed, closing connection: {}", e);
                        break;
                    }
                }
                frame = source.next() => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match Message::decode(&text) {
                                Ok(message) => {
                                    if events.send(ConnectionEvent::Inbound(message)).is_err() {
                                        return;
                                    }
                                }
                                Err(e) => {
                                    warn!("Dropping undecodable message: {}", e);
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Ping(_)))
                        | Some(Ok(tungstenite::Message::Pong(_))) => {}
                        Some(Ok(other)) => {
                            debug!("Ignoring non-text frame: {:?}", other);
                        }
                        Some(Err(e)) => {
                            warn!("Read failed, closing connection: {}", e);
                            break;
                        }
                        None => {
                            info!("Relay closed the connection");
                            break;
                        }
                    }
                }
            }
        }

        if events.send(ConnectionEvent::Closed).is_err() {
            return;
        }

        // While closed, no outbound sends are attempted: intents queued
        // during the gap are dropped, fire-and-forget. The resync after the
        // next Opened repairs whatever state they would have carried.
        drain_outbound(&mut outbound);
        sleep(RECONNECT_DELAY).await;
    }
}

fn drain_outbound(outbound: &mut mpsc::UnboundedReceiver<Message>) {
    let mut dropped = 0usize;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!("Dropped {} outbound messages while disconnected", dropped);
    }
}
