//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the shared-state mutations and the fan-out that
//! goes with them, so the route handler can stay focused on transport
//! framing and dispatch. Every mutating entry point takes the hub write
//! lock once and both applies and broadcasts under it.

pub mod chat;
pub mod hub;
pub mod session;
