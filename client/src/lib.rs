//! # Board Client Library
//!
//! This library implements the client side of the shared word-magnet board:
//! a set of labeled tiles on an infinite 2-D surface that any connected
//! participant can drag, with every move visible to all others in near real
//! time.
//!
//! The hard problem is not drawing tiles. It is keeping a locally rendered
//! tile position consistent with shared, concurrently mutated,
//! eventually-consistent state over an unreliable, reconnecting channel
//! while a human is dragging at interactive frame rates. The client answers
//! that with three rules:
//!
//! - **Optimistic local edits.** Creations and drags take effect locally
//!   before any relay round trip; the relay's echo of our own add is
//!   absorbed by idempotent, id-keyed inserts.
//! - **Absolute positions on the wire.** Move broadcasts carry the absolute
//!   recomputed position rather than a delta, so out-of-order delivery
//!   degrades to idempotent overwrite and remote clients never need the
//!   dragger's anchor.
//! - **Resync over reliability.** Outbound messages are fire-and-forget.
//!   Every (re)connection begins with a full-state request, which is the
//!   only repair mechanism for updates missed while disconnected.
//!
//! ## Module Organization
//!
//! ### Store Module (`store`)
//! The tile state store: the ordered, id-unique tile collection that is the
//! single source of truth for rendering. All mutations are idempotent.
//!
//! ### Motion Module (`motion`)
//! The motion pipeline: the per-tile drag state machine and the
//! frame-coalescing paint scheduler that collapses any number of updates
//! into at most one paint per tile per render tick.
//!
//! ### Sync Module (`sync`)
//! The sync protocol client: encodes local intents, applies inbound
//! broadcasts in arrival order, and is the sole writer to the outbound
//! channel.
//!
//! ### Connection Module (`connection`)
//! The connection lifecycle manager: owns the WebSocket reconnect loop
//! `Connecting -> Open -> Closed -> ...` and the initial-sync flag.
//!
//! ### Engine Module (`engine`)
//! The single-threaded event loop tying the above together; all client
//! state mutates on one logical execution context, so no locks are needed.
//!
//! ## Known Limitations
//!
//! Two participants dragging the same tile concurrently is neither detected
//! nor prevented: the last update processed wins each frame, with visible
//! jitter. The relay does not persist state, so a client's view is a cache
//! rebuilt by resync.

pub mod connection;
pub mod engine;
pub mod motion;
pub mod store;
pub mod sync;
