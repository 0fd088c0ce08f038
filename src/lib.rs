//! raffled - raffle daemon.
//!
//! Validates declarative raffle definitions, gates entry through an ordered
//! eligibility battery, and runs draws with configurable end actions. A
//! line-protocol gateway stands in for the chat platform's command layer.

pub mod config;
pub mod dashmap_ext;
pub mod directory;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod network;
pub mod notify;
pub mod raffle;
pub mod store;
pub mod telemetry;
