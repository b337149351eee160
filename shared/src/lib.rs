//! Wire protocol and tile data model shared by the board client and the
//! broadcast relay.
//!
//! Messages travel as UTF-8 JSON text frames with a discriminant field
//! `type`. The `get` tag is used in both directions: a bare `{"type":"get"}`
//! requests the full tile set, and the relay answers with the same tag plus
//! a `words` array. [`Message`] models this with an optional payload on the
//! `Get` variant so one enum covers the whole closed set of message kinds;
//! anything with an unrecognized discriminant fails to decode and is dropped
//! by the caller, never crashed on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 2-D board coordinate in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A labeled, positioned, uniquely identified draggable unit of shared
/// state. `id` and `label` are immutable after creation; position is the
/// only field move events touch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tile {
    pub id: String,
    #[serde(rename = "word")]
    pub label: String,
    #[serde(rename = "xValue")]
    pub x: f32,
    #[serde(rename = "yValue")]
    pub y: f32,
}

impl Tile {
    pub fn new(label: impl Into<String>, position: Position) -> Self {
        Self {
            id: new_tile_id(),
            label: label.into(),
            x: position.x,
            y: position.y,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Position) {
        self.x = position.x;
        self.y = position.y;
    }
}

/// Payload of a `move` message. `x`/`y` carry the absolute recomputed
/// position and are the only authoritative fields; `delta_x`/`delta_y` are
/// the raw drag deltas, kept for diagnostics and animation smoothing only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TileMove {
    #[serde(rename = "word")]
    pub label: String,
    pub id: String,
    #[serde(rename = "xValue")]
    pub x: f32,
    #[serde(rename = "yValue")]
    pub y: f32,
    #[serde(rename = "deltaX", default)]
    pub delta_x: f32,
    #[serde(rename = "deltaY", default)]
    pub delta_y: f32,
}

impl TileMove {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// The closed set of messages exchanged over the relay channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// `words: None` is the outbound full-state request; `words: Some(..)`
    /// is the inbound full-state response under the same tag.
    Get {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        words: Option<Vec<Tile>>,
    },
    /// One newly created tile, broadcast to every participant.
    Add { word: Tile },
    /// One tile's new absolute position, broadcast on every drag step.
    Move { word: TileMove },
}

impl Message {
    /// The outbound "send me the full current state" request.
    pub fn get_request() -> Self {
        Message::Get { words: None }
    }

    /// The relay's answer to a `get` request.
    pub fn full_state(words: Vec<Tile>) -> Self {
        Message::Get { words: Some(words) }
    }

    pub fn add(tile: Tile) -> Self {
        Message::Add { word: tile }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Generates a fresh tile id: a random v4 UUID, globally unique with
/// overwhelming probability, assigned once at creation time.
pub fn new_tile_id() -> String {
    Uuid::new_v4().to_string()
}
