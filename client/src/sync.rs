//! Sync protocol client: the single writer to the outbound channel and the
//! single point where inbound broadcasts are applied to local state.
//!
//! Outbound intents are fire-and-forget: no acknowledgements and no
//! per-message retry. If a send is lost to a disconnect, the full-state
//! resync issued on the next `Opened` repairs the divergence.

use log::{debug, warn};
use shared::{Message, Tile};
use tokio::sync::mpsc;

use crate::connection::ConnectionLifecycle;
use crate::motion::MotionPipeline;
use crate::store::TileStore;

/// Encodes local intents as protocol messages and applies remote updates to
/// the tile store through the motion pipeline.
#[derive(Debug)]
pub struct SyncClient {
    outbound: mpsc::UnboundedSender<Message>,
}

impl SyncClient {
    pub fn new(outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self { outbound }
    }

    /// Requests the full current state. Issued on every transition to
    /// `Open`; this is the sole repair mechanism for updates missed while
    /// disconnected.
    pub fn send_get(&self) {
        self.send(Message::get_request());
    }

    /// Announces a locally created tile.
    pub fn send_add(&self, tile: Tile) {
        self.send(Message::add(tile));
    }

    /// Forwards a move intent produced by the motion pipeline.
    pub fn send_move(&self, intent: Message) {
        self.send(intent);
    }

    fn send(&self, message: Message) {
        // The transport task drops queued intents while the channel is
        // down, so a dead receiver only means shutdown.
        if self.outbound.send(message).is_err() {
            debug!("Outbound channel closed, dropping message");
        }
    }

    /// Applies one inbound message in arrival order. Remote `move`s land
    /// even while a local drag of the same tile is live (last writer wins);
    /// `add` is idempotent under duplicate ids; a full-state response
    /// replaces the collection wholesale and completes the initial sync.
    pub fn apply_inbound(
        &self,
        message: Message,
        store: &mut TileStore,
        motion: &mut MotionPipeline,
        lifecycle: &mut ConnectionLifecycle,
    ) {
        match message {
            Message::Get { words: Some(words) } => {
                let ids = store.replace_all(words);
                for id in &ids {
                    motion.schedule_repaint(store, id);
                }
                lifecycle.mark_synced();
                debug!("Resync complete: {} tiles", ids.len());
            }
            Message::Get { words: None } => {
                // A bare get is a request; only the relay answers those.
                warn!("Ignoring payload-less get from relay");
            }
            Message::Add { word } => {
                let id = word.id.clone();
                if store.insert(word) {
                    motion.schedule_repaint(store, &id);
                }
            }
            Message::Move { word } => {
                motion.remote_move(store, &word);
            }
        }
    }
}

/// The optimistic local half of a creation: inserts into the store,
/// schedules a paint, and broadcasts the add. The relay's echo (if any) is
/// absorbed by idempotent insert.
pub fn create_tile(
    sync: &SyncClient,
    store: &mut TileStore,
    motion: &mut MotionPipeline,
    tile: Tile,
) -> String {
    let id = tile.id.clone();
    store.insert(tile.clone());
    motion.schedule_repaint(store, &id);
    sync.send_add(tile);
    id
}
