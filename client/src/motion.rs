//! Motion pipeline: per-tile drag state machine plus a frame-coalescing
//! paint scheduler.
//!
//! Both human pointer input and remote move broadcasts funnel into the same
//! scheduler, which holds at most one pending paint per tile and replaces it
//! on every newer update (cancel-and-reschedule). Whatever lands last before
//! the render tick is what paints; there is no merging, so a concurrent drag
//! of the same tile by two participants resolves as last writer wins with
//! visible jitter. That limitation is accepted, not worked around.

use std::collections::HashMap;

use log::debug;
use shared::{Message, Position, TileMove};

use crate::store::TileStore;

/// One paint instruction emitted by the render tick: draw tile `id` at the
/// absolute board position `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePaint {
    pub id: String,
    pub position: Position,
}

/// Transient, client-local state for an in-progress drag of one tile.
/// Exists only while the pointer button is held; the tile's committed
/// position in the store is not rewritten until the drag ends.
#[derive(Debug)]
struct DragSession {
    tile_id: String,
    /// Pointer coordinate at the most recent recorded sample (the anchor at
    /// drag start, then updated on every move).
    last_pointer: Position,
    /// Cumulative delta applied to the rendered position since drag start,
    /// composed over the committed position at paint time.
    offset: Position,
}

/// Collapses any number of position updates per tile into at most one paint
/// per render tick. Scheduling is replace-not-queue: a newer update for the
/// same tile cancels the pending one.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: HashMap<String, Position>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, id: &str, position: Position) {
        self.pending.insert(id.to_string(), position);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drains the pending set into paint instructions for this frame.
    pub fn take_frame(&mut self) -> Vec<TilePaint> {
        self.pending
            .drain()
            .map(|(id, position)| TilePaint { id, position })
            .collect()
    }
}

/// Translates pointer input and remote broadcasts into scheduled paints and
/// outbound move intents. One pointer device means at most one drag session
/// is live at a time; each tile independently runs `Idle -> Dragging -> Idle`.
#[derive(Debug, Default)]
pub struct MotionPipeline {
    drag: Option<DragSession>,
    scheduler: FrameScheduler,
}

impl MotionPipeline {
    pub fn new() -> Self {
        Self {
            drag: None,
            scheduler: FrameScheduler::new(),
        }
    }

    pub fn is_dragging(&self, id: &str) -> bool {
        self.drag.as_ref().map_or(false, |drag| drag.tile_id == id)
    }

    /// Opens a drag session if the pointer went down over a known tile.
    pub fn pointer_down(&mut self, store: &TileStore, id: &str, pointer: Position) -> bool {
        if !store.contains(id) {
            debug!("Pointer down over unknown tile {}", id);
            return false;
        }
        debug!("Drag start on tile {} at {:?}", id, pointer);
        self.drag = Some(DragSession {
            tile_id: id.to_string(),
            last_pointer: pointer,
            offset: Position::default(),
        });
        true
    }

    /// Advances the active drag by one pointer sample. Schedules exactly one
    /// coalesced repaint for the tile and returns the move intent to
    /// broadcast, carrying the absolute recomputed position so remote
    /// clients render without tracking our anchor.
    pub fn pointer_move(&mut self, store: &TileStore, pointer: Position) -> Option<Message> {
        let drag = self.drag.as_mut()?;

        let delta_x = pointer.x - drag.last_pointer.x;
        let delta_y = pointer.y - drag.last_pointer.y;
        drag.last_pointer = pointer;
        drag.offset.x += delta_x;
        drag.offset.y += delta_y;

        let committed = store.find(&drag.tile_id)?.clone();
        let absolute = Position::new(committed.x + drag.offset.x, committed.y + drag.offset.y);
        self.scheduler.schedule(&drag.tile_id, absolute);

        Some(Message::Move {
            word: TileMove {
                label: committed.label,
                id: drag.tile_id.clone(),
                x: absolute.x,
                y: absolute.y,
                delta_x: drag.offset.x,
                delta_y: drag.offset.y,
            },
        })
    }

    /// Ends the active drag, committing the final absolute position into the
    /// store. Returns the committed (id, position) if a drag was live.
    pub fn pointer_up(&mut self, store: &mut TileStore) -> Option<(String, Position)> {
        let drag = self.drag.take()?;
        let committed = store.find(&drag.tile_id)?;
        let final_pos = Position::new(committed.x + drag.offset.x, committed.y + drag.offset.y);
        store.update_position(&drag.tile_id, final_pos);
        self.scheduler.schedule(&drag.tile_id, final_pos);
        debug!("Drag end on tile {} at {:?}", drag.tile_id, final_pos);
        Some((drag.tile_id, final_pos))
    }

    /// Applies a remote move broadcast. The update goes straight into the
    /// store and the render transform, even when we are mid-drag on the same
    /// tile: the local drag does not suppress remote authority, and whichever
    /// update is processed last before the tick paints.
    pub fn remote_move(&mut self, store: &mut TileStore, word: &TileMove) {
        let position = word.position();
        if !store.update_position(&word.id, position) {
            // Unknown tile: dropped, a future resync will carry it.
            return;
        }
        if let Some(drag) = self.drag.as_mut() {
            if drag.tile_id == word.id {
                // The committed position just became the remote absolute;
                // zero the offset so the transform shows it immediately.
                drag.offset = Position::default();
            }
        }
        self.scheduler.schedule(&word.id, position);
    }

    /// Marks a tile render-eligible at its committed position (used after
    /// inserts and full resyncs).
    pub fn schedule_repaint(&mut self, store: &TileStore, id: &str) {
        if let Some(tile) = store.find(id) {
            self.scheduler.schedule(id, tile.position());
        }
    }

    pub fn pending_paints(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// The render tick: emits at most one paint per tile and clears the
    /// pending set.
    pub fn render_tick(&mut self) -> Vec<TilePaint> {
        self.scheduler.take_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::Tile;

    fn store_with(id: &str, label: &str, x: f32, y: f32) -> TileStore {
        let mut store = TileStore::new();
        store.insert(Tile {
            id: id.to_string(),
            label: label.to_string(),
            x,
            y,
        });
        store
    }

    #[test]
    fn test_frame_scheduler_coalesces_to_last_value() {
        let mut scheduler = FrameScheduler::new();
        for i in 0..10 {
            scheduler.schedule("a", Position::new(i as f32, 0.0));
        }
        scheduler.schedule("b", Position::new(100.0, 100.0));

        let mut frame = scheduler.take_frame();
        frame.sort_by(|p, q| p.id.cmp(&q.id));
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[0].position, Position::new(9.0, 0.0));
        assert_eq!(frame[1].position, Position::new(100.0, 100.0));

        // Nothing queued behind the frame.
        assert!(scheduler.take_frame().is_empty());
    }

    #[test]
    fn test_pointer_down_requires_known_tile() {
        let store = store_with("a", "cat", 0.0, 0.0);
        let mut motion = MotionPipeline::new();
        assert!(!motion.pointer_down(&store, "ghost", Position::new(0.0, 0.0)));
        assert!(motion.pointer_down(&store, "a", Position::new(5.0, 5.0)));
        assert!(motion.is_dragging("a"));
    }

    #[test]
    fn test_pointer_move_emits_absolute_position() {
        let store = store_with("a", "cat", 10.0, 20.0);
        let mut motion = MotionPipeline::new();
        motion.pointer_down(&store, "a", Position::new(100.0, 100.0));

        let msg = motion
            .pointer_move(&store, Position::new(103.0, 104.0))
            .unwrap();
        match msg {
            Message::Move { word } => {
                assert_eq!(word.id, "a");
                assert_eq!(word.label, "cat");
                assert_approx_eq!(word.x, 13.0);
                assert_approx_eq!(word.y, 24.0);
                assert_approx_eq!(word.delta_x, 3.0);
                assert_approx_eq!(word.delta_y, 4.0);
            }
            other => panic!("expected move intent, got {:?}", other),
        }

        // Offset accumulates across samples.
        let msg = motion
            .pointer_move(&store, Position::new(101.0, 104.0))
            .unwrap();
        match msg {
            Message::Move { word } => {
                assert_approx_eq!(word.x, 11.0);
                assert_approx_eq!(word.delta_x, 1.0);
            }
            other => panic!("expected move intent, got {:?}", other),
        }
    }

    #[test]
    fn test_drag_does_not_touch_store_until_pointer_up() {
        let mut store = store_with("a", "cat", 10.0, 20.0);
        let mut motion = MotionPipeline::new();
        motion.pointer_down(&store, "a", Position::new(0.0, 0.0));
        motion.pointer_move(&store, Position::new(30.0, 40.0));
        assert_eq!(store.find("a").unwrap().position(), Position::new(10.0, 20.0));

        let (id, committed) = motion.pointer_up(&mut store).unwrap();
        assert_eq!(id, "a");
        assert_eq!(committed, Position::new(40.0, 60.0));
        assert_eq!(store.find("a").unwrap().position(), committed);
        assert!(!motion.is_dragging("a"));
    }

    #[test]
    fn test_many_moves_one_paint_per_tick() {
        let store = store_with("a", "cat", 0.0, 0.0);
        let mut motion = MotionPipeline::new();
        motion.pointer_down(&store, "a", Position::new(0.0, 0.0));

        for i in 1..=20 {
            motion.pointer_move(&store, Position::new(i as f32, 0.0));
        }

        let frame = motion.render_tick();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].id, "a");
        assert_approx_eq!(frame[0].position.x, 20.0);
        assert!(motion.render_tick().is_empty());
    }

    #[test]
    fn test_remote_move_applies_during_local_drag() {
        let mut store = store_with("a", "cat", 0.0, 0.0);
        let mut motion = MotionPipeline::new();
        motion.pointer_down(&store, "a", Position::new(0.0, 0.0));
        motion.pointer_move(&store, Position::new(5.0, 5.0));

        // Another participant wins the frame: their absolute position lands
        // in both the store and the pending paint.
        motion.remote_move(
            &mut store,
            &TileMove {
                label: "cat".to_string(),
                id: "a".to_string(),
                x: 50.0,
                y: 60.0,
                delta_x: 0.0,
                delta_y: 0.0,
            },
        );

        assert_eq!(store.find("a").unwrap().position(), Position::new(50.0, 60.0));
        let frame = motion.render_tick();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].position, Position::new(50.0, 60.0));

        // The drag is still live and continues from the remote position.
        let msg = motion.pointer_move(&store, Position::new(6.0, 5.0)).unwrap();
        match msg {
            Message::Move { word } => assert_approx_eq!(word.x, 51.0),
            other => panic!("expected move intent, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_move_for_unknown_tile_schedules_nothing() {
        let mut store = store_with("a", "cat", 0.0, 0.0);
        let mut motion = MotionPipeline::new();
        motion.remote_move(
            &mut store,
            &TileMove {
                label: "ghost".to_string(),
                id: "ghost".to_string(),
                x: 1.0,
                y: 1.0,
                delta_x: 0.0,
                delta_y: 0.0,
            },
        );
        assert!(motion.render_tick().is_empty());
        assert_eq!(store.len(), 1);
    }
}
