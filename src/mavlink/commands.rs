//! MAVLink command construction
//!
//! Every vehicle action is a COMMAND_LONG: a command code plus seven float
//! parameters. The target identity is filled in by the session.

use mavlink::ardupilotmega::MavCmd;

/// Arm/disarm magic value in param1
const ARM: f32 = 1.0;
const DISARM: f32 = 0.0;

/// MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
const CUSTOM_MODE_ENABLED: f32 = 1.0;

/// A COMMAND_LONG addressed to a specific vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLong {
    pub target_system: u8,
    pub target_component: u8,
    pub command: MavCmd,
    pub confirmation: u8,
    pub params: [f32; 7],
}

/// A command before it is addressed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleCommand {
    pub command: MavCmd,
    pub params: [f32; 7],
}

impl VehicleCommand {
    /// Arm the motors
    pub fn arm() -> Self {
        Self {
            command: MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
            params: [ARM, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Disarm the motors
    pub fn disarm() -> Self {
        Self {
            command: MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
            params: [DISARM, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Take off to `altitude_m`. Only param7 (altitude) is set; pitch, yaw
    /// and position slots are zero.
    pub fn takeoff(altitude_m: f32) -> Self {
        Self {
            command: MavCmd::MAV_CMD_NAV_TAKEOFF,
            params: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, altitude_m],
        }
    }

    /// Switch to the ArduPilot custom mode `mode_id`
    pub fn set_mode(mode_id: u32) -> Self {
        Self {
            command: MavCmd::MAV_CMD_DO_SET_MODE,
            params: [CUSTOM_MODE_ENABLED, mode_id as f32, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Ask the vehicle to stream `message_id` every `interval_us` microseconds
    pub fn message_interval(message_id: u32, interval_us: f32) -> Self {
        Self {
            command: MavCmd::MAV_CMD_SET_MESSAGE_INTERVAL,
            params: [message_id as f32, interval_us, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Address this command to a vehicle
    pub fn addressed(self, target_system: u8, target_component: u8) -> CommandLong {
        CommandLong {
            target_system,
            target_component,
            command: self.command,
            confirmation: 0,
            params: self.params,
        }
    }
}
