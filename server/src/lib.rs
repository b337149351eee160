//! # Board Relay Library
//!
//! This library implements the broadcast relay for the shared word-magnet
//! board. The relay is deliberately thin: it forwards every `add` and
//! `move` to all connected clients except the sender and answers `get`
//! requests with its in-memory word map. It holds no durable state and
//! performs no merging; eventual consistency is the clients' job, repaired
//! through full-state resync on every (re)connection.
//!
//! ## Core Responsibilities
//!
//! ### Fan-out
//! Every inbound edit is broadcast to all other participants in arrival
//! order. The sender is skipped: it already applied its own edit
//! optimistically, and clients absorb stray echoes idempotently anyway.
//!
//! ### Full-state snapshots
//! The hub keeps the latest known tile set keyed by id, upserted on both
//! `add` and `move`, so a freshly connected or reconnected client can
//! rebuild its whole view from a single `get` response.
//!
//! ### Connection lifecycle
//! Each WebSocket connection runs in its own task with a private outbound
//! queue; a failed write or closed socket unregisters the client, nothing
//! more. There is no per-client replay buffer by design.
//!
//! ## Module Organization
//!
//! ### Hub Module (`hub`)
//! The client registry and word map, mutated only by the single hub task:
//! registration, fan-out, and snapshot answering live here.
//!
//! ### Relay Module (`relay`)
//! The TCP accept loop, WebSocket handshakes, and per-connection read and
//! write pumps, all talking to the hub over one mpsc channel.

pub mod hub;
pub mod relay;
