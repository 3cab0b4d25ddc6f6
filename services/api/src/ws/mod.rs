//! Realtime WebSocket surface.
//!
//! - `gateway`: bridges the simulation bus onto per-channel, per-session rooms.
//! - `protocol`: the JSON control frames exchanged with clients.
//! - `session`: the lifecycle of one connected client.

pub mod gateway;
pub mod protocol;
pub mod session;

pub use session::{supervised_ws_handler, unsupervised_ws_handler};
