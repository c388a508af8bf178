//! MAVLink Bridge Module
//!
//! Provides integration with ArduPilot flight controllers via the MAVLink
//! protocol: link setup, command construction, mode tables and telemetry
//! translation.

mod commands;
mod connection;
mod modes;
mod telemetry;

pub use commands::{CommandLong, VehicleCommand};
pub use connection::{FcConfig, MavlinkConnector};
pub use modes::ModeTable;
pub use telemetry::{
    severity_to_string, CommandAck, Heartbeat, MessageKind, PositionReport, VehicleMessage,
};

#[cfg(test)]
pub use telemetry::GlobalPosition;
