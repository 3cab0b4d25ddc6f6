//! Lyceum API Library Crate
//!
//! HTTP and WebSocket surface for the classroom simulation: configuration,
//! the Postgres roster, REST handlers, the realtime gateway and routing. The
//! `api` binary is a thin wrapper around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
