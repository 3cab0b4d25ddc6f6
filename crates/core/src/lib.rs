//! Core of the classroom and debate simulation.
//!
//! A session runs as a sequence of turns. The [`orchestrator`] decides who acts
//! on each turn, the [`agent`] models produce the messages, the [`graph`]
//! records who spoke to whom, the [`store`] owns every session and the [`bus`]
//! fans the resulting events out to realtime subscribers. [`service`] is the
//! entry point for API layers.

pub mod agent;
pub mod bus;
pub mod curriculum;
pub mod error;
pub mod graph;
pub mod llm_client;
pub mod model;
pub mod orchestrator;
pub mod roster;
pub mod safety;
pub mod service;
pub mod store;

pub use error::{Result, SimulationError};
pub use service::SimulationService;
