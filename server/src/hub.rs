//! Client registry and broadcast logic for the relay.
//!
//! The hub owns the connected-client senders and the in-memory word map,
//! the relay's only copy of the board. Nothing is persisted: the map lives
//! exactly as long as the process, and clients treat their own view as a
//! cache rebuilt by resync. Broadcasts skip the originating client, which
//! already applied its own edit optimistically.

use std::collections::HashMap;

use log::{debug, info, warn};
use shared::{Message, Tile};
use tokio::sync::mpsc;

pub type ClientId = u32;

/// Connected clients plus the authoritative word map, mutated only by the
/// single hub task.
#[derive(Debug, Default)]
pub struct Hub {
    clients: HashMap<ClientId, mpsc::UnboundedSender<Message>>,
    words: HashMap<String, Tile>,
    next_id: ClientId,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            words: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Registers a newly accepted connection and assigns its id.
    pub fn register(&mut self, sender: mpsc::UnboundedSender<Message>) -> ClientId {
        let id = self.next_id;
        self.next_id += 1;
        self.clients.insert(id, sender);
        info!("Client {} connected ({} online)", id, self.clients.len());
        id
    }

    pub fn unregister(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            info!("Client {} disconnected ({} online)", id, self.clients.len());
        }
    }

    /// Processes one message from a connected client.
    ///
    /// `add` and `move` upsert the word map and fan out to every client
    /// except the sender. `get` answers only the requester with the full
    /// map; a `get` that unexpectedly carries a payload is dropped.
    pub fn handle_message(&mut self, from: ClientId, message: Message) {
        match message {
            Message::Get { words: None } => {
                let words: Vec<Tile> = self.words.values().cloned().collect();
                debug!("Client {} requested full state ({} words)", from, words.len());
                self.send_to(from, Message::full_state(words));
            }
            Message::Get { words: Some(_) } => {
                warn!("Ignoring get with payload from client {}", from);
            }
            Message::Add { word } => {
                debug!("Client {} added word {}", from, word.id);
                self.words.insert(word.id.clone(), word.clone());
                self.broadcast_except(from, Message::Add { word });
            }
            Message::Move { word } => {
                // Upsert, same as the add path: a move for a word this
                // relay restart never saw still lands in the map.
                self.words.insert(
                    word.id.clone(),
                    Tile {
                        id: word.id.clone(),
                        label: word.label.clone(),
                        x: word.x,
                        y: word.y,
                    },
                );
                self.broadcast_except(from, Message::Move { word });
            }
        }
    }

    fn send_to(&mut self, id: ClientId, message: Message) {
        let dead = match self.clients.get(&id) {
            Some(sender) => sender.send(message).is_err(),
            None => return,
        };
        if dead {
            self.unregister(id);
        }
    }

    fn broadcast_except(&mut self, skip: ClientId, message: Message) {
        let mut dead = Vec::new();
        for (&id, sender) in &self.clients {
            if id == skip {
                continue;
            }
            if sender.send(message.clone()).is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            self.unregister(id);
        }
    }
}
