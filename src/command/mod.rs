//! Command orchestration for vehicle control
//!
//! Every operation follows the same path:
//! - Acquire a fresh session from the session manager
//! - Wait for a heartbeat so the target vehicle is known
//! - Run the operation's handler
//! - Release the session, whatever the outcome
//!
//! Failures are turned into operator-facing text or records here; nothing
//! escapes as an error.

mod config;
mod executor;
pub mod handlers;

pub use config::ControlConfig;
pub use executor::CommandExecutor;
