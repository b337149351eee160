//! Tile state store: the client's single source of truth for rendering.
//!
//! The collection is an ordered `Vec` so the board can be rendered as a
//! stable identity-keyed list (keyed by tile id, never by index). All
//! mutations are idempotent under identical id + payload, which is the
//! merge strategy that absorbs the optimistic-insert-vs-relay-echo race
//! without any coordination.

use log::{debug, warn};
use shared::{Position, Tile};

/// Ordered collection of every tile this client knows about. Order is
/// arrival/creation order and survives `replace_all`.
#[derive(Debug, Default)]
pub struct TileStore {
    tiles: Vec<Tile>,
}

impl TileStore {
    pub fn new() -> Self {
        Self { tiles: Vec::new() }
    }

    /// Current known tiles, in stable order. Never blocks.
    pub fn get_all(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn find(&self, id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Atomically replaces the entire collection with a full resync
    /// snapshot. Returns the ids now present so the caller can schedule
    /// repaints for all of them.
    pub fn replace_all(&mut self, tiles: Vec<Tile>) -> Vec<String> {
        debug!("Replacing tile collection with {} tiles", tiles.len());
        self.tiles = tiles;
        self.tiles.iter().map(|tile| tile.id.clone()).collect()
    }

    /// Appends a new tile. A duplicate id is an idempotent no-op, not an
    /// error: the creator's optimistic insert and the relay's echo of the
    /// same creation commonly race, and the first-applied values win.
    pub fn insert(&mut self, tile: Tile) -> bool {
        if self.contains(&tile.id) {
            warn!("Ignoring duplicate add for tile {}", tile.id);
            return false;
        }
        debug!("Inserted tile {} ({:?})", tile.id, tile.label);
        self.tiles.push(tile);
        true
    }

    /// Updates one tile's position. An unknown id is silently dropped (it
    /// may belong to a tile created elsewhere that a future resync will
    /// deliver), never queued and never an error.
    pub fn update_position(&mut self, id: &str, position: Position) -> bool {
        match self.tiles.iter_mut().find(|tile| tile.id == id) {
            Some(tile) => {
                tile.set_position(position);
                true
            }
            None => {
                debug!("Dropping position update for unknown tile {}", id);
                false
            }
        }
    }
}
