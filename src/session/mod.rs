//! Session management for autopilot links
//!
//! This module handles:
//! - Opening one fresh link per operation
//! - Heartbeat synchronization and the target vehicle identity
//! - Cached vehicle state derived from heartbeats
//! - Bounded waits for specific messages or states
//! - Guaranteed release of the link on every exit path

mod connection;
mod manager;

pub use connection::{Session, VehicleState};
pub use manager::SessionManager;
