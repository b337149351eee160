//! WebSocket accept loop and per-connection pumps.
//!
//! One task runs the hub; every accepted connection gets its own task that
//! pumps inbound text frames to the hub and drains its personal outbound
//! queue into the socket. All hub state is reached through one mpsc
//! channel, so the registry and word map never need a lock.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{accept_async, tungstenite};

use crate::hub::{ClientId, Hub};

/// Commands from connection tasks to the hub task.
#[derive(Debug)]
enum HubCommand {
    Register {
        sender: mpsc::UnboundedSender<Message>,
        reply: oneshot::Sender<ClientId>,
    },
    Unregister(ClientId),
    Incoming { from: ClientId, message: Message },
}

/// The broadcast relay: accepts WebSocket connections and fans every `add`
/// and `move` out to all other participants.
pub struct Relay {
    listener: TcpListener,
}

impl Relay {
    pub async fn bind(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Relay listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// The bound address, useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the hub task and the accept loop until the process exits.
    pub async fn run(self) {
        let (hub_tx, mut hub_rx) = mpsc::unbounded_channel::<HubCommand>();

        tokio::spawn(async move {
            let mut hub = Hub::new();
            while let Some(command) = hub_rx.recv().await {
                match command {
                    HubCommand::Register { sender, reply } => {
                        let id = hub.register(sender);
                        let _ = reply.send(id);
                    }
                    HubCommand::Unregister(id) => hub.unregister(id),
                    HubCommand::Incoming { from, message } => hub.handle_message(from, message),
                }
            }
        });

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Accepting connection from {}", peer);
                    tokio::spawn(serve_connection(stream, peer, hub_tx.clone()));
                }
                Err(e) => {
                    error!("Accept failed: {}", e);
                }
            }
        }
    }
}

/// One connection's lifetime: WebSocket handshake, hub registration, then
/// the read/write pump until either side drops.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: mpsc::UnboundedSender<HubCommand>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();
    let (reply_tx, reply_rx) = oneshot::channel();
    if hub
        .send(HubCommand::Register {
            sender,
            reply: reply_tx,
        })
        .is_err()
    {
        return;
    }
    let Ok(client_id) = reply_rx.await else { return };

    let (mut sink, mut source) = ws.split();

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                let text = match message.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode broadcast: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(tungstenite::Message::Text(text)).await {
                    debug!("Write to client {} failed: {}", client_id, e);
                    break;
                }
            }
            frame = source.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        match Message::decode(&text) {
                            Ok(message) => {
                                if hub.send(HubCommand::Incoming { from: client_id, message }).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Dropping undecodable message from client {}: {}", client_id, e);
                            }
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(_))) | None => break,
                    Some(Ok(tungstenite::Message::Ping(_)))
                    | Some(Ok(tungstenite::Message::Pong(_))) => {}
                    Some(Ok(other)) => {
                        debug!("Ignoring non-text frame from client {}: {:?}", client_id, other);
                    }
                    Some(Err(e)) => {
                        debug!("Read from client {} failed: {}", client_id, e);
                        break;
                    }
                }
            }
        }
    }

    let _ = hub.send(HubCommand::Unregister(client_id));
}
