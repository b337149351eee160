//! The client engine: one logical execution context owning all mutable
//! client-local state.
//!
//! Connectivity events, pointer input, and render ticks interleave through a
//! single `select!` loop, so the store, the drag session, and the connection
//! state never see parallel mutation and need no locks. The transport task
//! is the only other task, reached exclusively through channels.

use std::time::Duration;

use log::{debug, info};
use shared::{Message, Position, Tile};
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::connection::{ConnectionEvent, ConnectionLifecycle};
use crate::motion::{MotionPipeline, TilePaint};
use crate::store::TileStore;
use crate::sync::{create_tile, SyncClient};

/// Render tick period, roughly one display frame.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Pointer and creation input fed to the engine by whatever input surface
/// hosts it (GUI shell, demo driver, tests). The creation surface builds
/// the whole tile, id included, so it can reference the tile afterwards.
#[derive(Debug)]
pub enum InputEvent {
    PointerDown { tile_id: String, x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    CreateTile(Tile),
}

/// The tile synchronization engine for one client session.
pub struct Engine {
    store: TileStore,
    motion: MotionPipeline,
    sync: SyncClient,
    lifecycle: ConnectionLifecycle,
    paints: Option<mpsc::UnboundedSender<Vec<TilePaint>>>,
}

impl Engine {
    pub fn new(outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            store: TileStore::new(),
            motion: MotionPipeline::new(),
            sync: SyncClient::new(outbound),
            lifecycle: ConnectionLifecycle::new(),
            paints: None,
        }
    }

    /// Registers a sink that receives each non-empty painted frame. The
    /// engine stays headless; the sink is whatever renders or records.
    pub fn with_paint_sink(mut self, sink: mpsc::UnboundedSender<Vec<TilePaint>>) -> Self {
        self.paints = Some(sink);
        self
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.lifecycle
    }

    /// Applies one connectivity event. Entry to `Open` immediately issues
    /// the full-state request; rendering continues on stale or empty state
    /// until the response arrives.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connecting => {
                self.lifecycle.set_connecting();
            }
            ConnectionEvent::Opened => {
                info!("Channel open, requesting full state");
                self.lifecycle.set_open();
                self.sync.send_get();
            }
            ConnectionEvent::Closed => {
                info!("Channel closed, reconnect pending");
                self.lifecycle.set_closed();
            }
            ConnectionEvent::Inbound(message) => {
                self.sync.apply_inbound(
                    message,
                    &mut self.store,
                    &mut self.motion,
                    &mut self.lifecycle,
                );
            }
        }
    }

    /// Applies one input event. Move intents produced mid-drag are
    /// broadcast fire-and-forget through the sync client.
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { tile_id, x, y } => {
                self.motion
                    .pointer_down(&self.store, &tile_id, Position::new(x, y));
            }
            InputEvent::PointerMove { x, y } => {
                if let Some(intent) = self.motion.pointer_move(&self.store, Position::new(x, y)) {
                    self.sync.send_move(intent);
                }
            }
            InputEvent::PointerUp => {
                if let Some((id, position)) = self.motion.pointer_up(&mut self.store) {
                    debug!("Committed tile {} at {:?}", id, position);
                }
            }
            InputEvent::CreateTile(tile) => {
                let id = create_tile(&self.sync, &mut self.store, &mut self.motion, tile);
                info!("Created tile {}", id);
            }
        }
    }

    /// One render tick: at most one paint per tile, forwarded to the sink.
    pub fn render_tick(&mut self) -> Vec<TilePaint> {
        let frame = self.motion.render_tick();
        if !frame.is_empty() {
            debug!("Painting {} tiles", frame.len());
            if let Some(sink) = &self.paints {
                let _ = sink.send(frame.clone());
            }
        }
        frame
    }

    /// Drives the engine until both input channels close.
    pub async fn run(
        mut self,
        mut connection: mpsc::UnboundedReceiver<ConnectionEvent>,
        mut input: mpsc::UnboundedReceiver<InputEvent>,
    ) {
        let mut render_interval = interval(FRAME_INTERVAL);

        loop {
            tokio::select! {
                event = connection.recv() => {
                    match event {
                        Some(event) => self.handle_connection_event(event),
                        None => break,
                    }
                }
                event = input.recv() => {
                    match event {
                        Some(event) => self.handle_input(event),
                        None => break,
                    }
                }
                _ = render_interval.tick() => {
                    self.render_tick();
                }
            }
        }

        info!("Engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Tile, TileMove};

    fn engine() -> (Engine, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Engine::new(tx), rx)
    }

    fn tile(id: &str, label: &str, x: f32, y: f32) -> Tile {
        Tile {
            id: id.to_string(),
            label: label.to_string(),
            x,
            y,
        }
    }

    #[test]
    fn test_open_triggers_full_state_request() {
        let (mut engine, mut rx) = engine();
        engine.handle_connection_event(ConnectionEvent::Opened);
        assert!(engine.lifecycle().is_open());
        assert!(!engine.lifecycle().has_completed_initial_sync());
        assert_eq!(rx.try_recv().unwrap(), Message::get_request());
    }

    #[test]
    fn test_reconnect_reissues_get() {
        let (mut engine, mut rx) = engine();
        engine.handle_connection_event(ConnectionEvent::Opened);
        engine.handle_connection_event(ConnectionEvent::Inbound(Message::full_state(vec![
            tile("a", "one", 0.0, 0.0),
            tile("b", "two", 0.0, 0.0),
            tile("c", "three", 0.0, 0.0),
        ])));
        assert_eq!(engine.store().len(), 3);
        assert!(engine.lifecycle().has_completed_initial_sync());
        assert_eq!(rx.try_recv().unwrap(), Message::get_request());

        engine.handle_connection_event(ConnectionEvent::Closed);
        assert!(!engine.lifecycle().has_completed_initial_sync());

        // Each transition back to Open re-issues the resync request.
        engine.handle_connection_event(ConnectionEvent::Opened);
        assert_eq!(rx.try_recv().unwrap(), Message::get_request());

        // The resync snapshot wins over anything that happened in the gap.
        engine.handle_connection_event(ConnectionEvent::Inbound(Message::full_state(vec![
            tile("a", "one", 5.0, 5.0),
        ])));
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.store().find("a").unwrap().position(), Position::new(5.0, 5.0));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut engine, _rx) = engine();
        engine.handle_connection_event(ConnectionEvent::Opened);
        engine.handle_connection_event(ConnectionEvent::Inbound(Message::full_state(vec![
            tile("a", "cat", 10.0, 20.0),
        ])));
        engine.handle_connection_event(ConnectionEvent::Inbound(Message::Move {
            word: TileMove {
                label: "cat".to_string(),
                id: "a".to_string(),
                x: 50.0,
                y: 60.0,
                delta_x: 0.0,
                delta_y: 0.0,
            },
        }));

        let all = engine.store().get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[0].label, "cat");
        assert_eq!(all[0].position(), Position::new(50.0, 60.0));
    }

    #[test]
    fn test_local_drag_emits_moves_and_coalesces_paints() {
        let (mut engine, mut rx) = engine();
        engine.handle_connection_event(ConnectionEvent::Opened);
        engine.handle_connection_event(ConnectionEvent::Inbound(Message::full_state(vec![
            tile("a", "cat", 0.0, 0.0),
        ])));
        engine.render_tick();
        while rx.try_recv().is_ok() {}

        engine.handle_input(InputEvent::PointerDown {
            tile_id: "a".to_string(),
            x: 0.0,
            y: 0.0,
        });
        for i in 1..=5 {
            engine.handle_input(InputEvent::PointerMove {
                x: i as f32,
                y: 0.0,
            });
        }

        // Five broadcast intents, one coalesced paint.
        let mut intents = 0;
        while let Ok(message) = rx.try_recv() {
            match message {
                Message::Move { word } => {
                    assert_eq!(word.id, "a");
                    intents += 1;
                }
                other => panic!("unexpected outbound {:?}", other),
            }
        }
        assert_eq!(intents, 5);

        let frame = engine.render_tick();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].position, Position::new(5.0, 0.0));

        engine.handle_input(InputEvent::PointerUp);
        assert_eq!(engine.store().find("a").unwrap().position(), Position::new(5.0, 0.0));
    }

    #[test]
    fn test_create_tile_is_optimistic_and_broadcast() {
        let (mut engine, mut rx) = engine();
        engine.handle_input(InputEvent::CreateTile(Tile::new(
            "fridge",
            Position::new(12.0, 34.0),
        )));

        assert_eq!(engine.store().len(), 1);
        let created = engine.store().get_all()[0].clone();
        assert_eq!(created.label, "fridge");

        match rx.try_recv().unwrap() {
            Message::Add { word } => assert_eq!(word, created),
            other => panic!("unexpected outbound {:?}", other),
        }
    }
}
