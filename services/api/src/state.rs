//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources handed to the REST handlers and WebSocket sessions.

use crate::ws::gateway::Gateway;
use lyceum_core::SimulationService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SimulationService>,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Attaches the realtime gateway to the service's bus.
    pub fn new(service: SimulationService, event_bus_capacity: usize) -> Self {
        let gateway = Arc::new(Gateway::attach(service.bus(), event_bus_capacity));
        Self {
            service: Arc::new(service),
            gateway,
        }
    }
}
