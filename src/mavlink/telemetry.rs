//! MAVLink Telemetry Translation
//!
//! Converts the MAVLink messages the control path cares about into plain
//! crate types, and raw telemetry into the reports returned to callers.

use mavlink::ardupilotmega::{MavCmd, MavMessage, MavResult};
use mavlink::MavHeader;
use serde::Serialize;

use super::modes::MAV_TYPE_GCS;

/// MAV_MODE_FLAG_SAFETY_ARMED
const SAFETY_ARMED: u8 = 0x80;

/// MAV_AUTOPILOT_INVALID, reported by anything that is not a flight stack
const AUTOPILOT_INVALID: u8 = 8;

/// MAV_TYPE values that never describe the vehicle itself
const NON_VEHICLE_TYPES: [u8; 4] = [
    MAV_TYPE_GCS,
    18, // ONBOARD_CONTROLLER
    26, // GIMBAL
    27, // ADSB
];

/// A message received from the vehicle
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleMessage {
    Heartbeat(Heartbeat),
    CommandAck(CommandAck),
    GlobalPosition(GlobalPosition),
    StatusText { severity: u8, text: String },
    /// Anything the control path does not consume
    Other,
}

/// Kinds of message a session can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Heartbeat,
    CommandAck,
    GlobalPosition,
}

impl VehicleMessage {
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            VehicleMessage::Heartbeat(_) => Some(MessageKind::Heartbeat),
            VehicleMessage::CommandAck(_) => Some(MessageKind::CommandAck),
            VehicleMessage::GlobalPosition(_) => Some(MessageKind::GlobalPosition),
            _ => None,
        }
    }

    /// Translate a decoded MAVLink message
    pub fn from_mavlink(header: &MavHeader, msg: &MavMessage) -> Self {
        match msg {
            MavMessage::HEARTBEAT(hb) => VehicleMessage::Heartbeat(Heartbeat {
                system_id: header.system_id,
                component_id: header.component_id,
                mav_type: hb.mavtype as u8,
                autopilot: hb.autopilot as u8,
                base_mode: hb.base_mode.bits(),
                custom_mode: hb.custom_mode,
                system_status: hb.system_status as u8,
            }),
            MavMessage::COMMAND_ACK(ack) => VehicleMessage::CommandAck(CommandAck {
                command: ack.command,
                result: ack.result,
            }),
            MavMessage::GLOBAL_POSITION_INT(pos) => VehicleMessage::GlobalPosition(GlobalPosition {
                system_id: header.system_id,
                lat: pos.lat,
                lon: pos.lon,
                alt: pos.alt,
                relative_alt: pos.relative_alt,
                vx: pos.vx,
                vy: pos.vy,
                vz: pos.vz,
                hdg: pos.hdg,
            }),
            MavMessage::STATUSTEXT(status) => VehicleMessage::StatusText {
                severity: status.severity as u8,
                text: String::from_utf8_lossy(&status.text)
                    .trim_end_matches('\0')
                    .to_string(),
            },
            _ => VehicleMessage::Other,
        }
    }
}

/// Liveness broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub system_id: u8,
    pub component_id: u8,
    pub mav_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub custom_mode: u32,
    pub system_status: u8,
}

impl Heartbeat {
    pub fn is_armed(&self) -> bool {
        self.base_mode & SAFETY_ARMED != 0
    }

    /// Ground stations, companions and peripherals broadcast heartbeats too;
    /// only a flight stack's heartbeat counts as vehicle liveness
    pub fn is_vehicle(&self) -> bool {
        self.autopilot != AUTOPILOT_INVALID && !NON_VEHICLE_TYPES.contains(&self.mav_type)
    }
}

/// Command acknowledgement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandAck {
    pub command: MavCmd,
    pub result: MavResult,
}

impl CommandAck {
    pub fn is_accepted(&self) -> bool {
        self.result == MavResult::MAV_RESULT_ACCEPTED
    }
}

/// Raw GLOBAL_POSITION_INT fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalPosition {
    /// Sender of the report
    pub system_id: u8,
    /// Latitude, degE7
    pub lat: i32,
    /// Longitude, degE7
    pub lon: i32,
    /// Altitude MSL, mm
    pub alt: i32,
    /// Altitude above home, mm
    pub relative_alt: i32,
    /// Ground speed components, cm/s
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    /// Heading, cdeg
    pub hdg: u16,
}

/// Position as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub relative_alt: f64,
    pub heading: f64,
    pub velocity: Velocity,
}

/// Raw velocity components, cm/s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Velocity {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl From<&GlobalPosition> for PositionReport {
    fn from(pos: &GlobalPosition) -> Self {
        Self {
            latitude: pos.lat as f64 / 1e7,
            longitude: pos.lon as f64 / 1e7,
            altitude: pos.alt as f64 / 1000.0,       // mm to m
            relative_alt: pos.relative_alt as f64 / 1000.0,
            heading: pos.hdg as f64 / 100.0,         // cdeg to deg
            velocity: Velocity {
                x: pos.vx,
                y: pos.vy,
                z: pos.vz,
            },
        }
    }
}

/// Convert MAVLink severity to string
pub fn severity_to_string(severity: u8) -> &'static str {
    match severity {
        0 => "EMERGENCY",
        1 => "ALERT",
        2 => "CRITICAL",
        3 => "ERROR",
        4 => "WARNING",
        5 => "NOTICE",
        6 => "INFO",
        7 => "DEBUG",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(base_mode: u8, mav_type: u8) -> Heartbeat {
        Heartbeat {
            system_id: 1,
            component_id: 1,
            mav_type,
            autopilot: 3,
            base_mode,
            custom_mode: 0,
            system_status: 4,
        }
    }

    #[test]
    fn test_armed_flag() {
        assert!(heartbeat(0x80 | 0x01, 2).is_armed());
        assert!(!heartbeat(0x01, 2).is_armed());
    }

    #[test]
    fn test_only_flight_stack_heartbeats_are_vehicles() {
        assert!(heartbeat(0, 2).is_vehicle());
        assert!(!heartbeat(0, MAV_TYPE_GCS).is_vehicle());
        assert!(!heartbeat(0, 26).is_vehicle());

        let companion = Heartbeat {
            autopilot: AUTOPILOT_INVALID,
            ..heartbeat(0, 2)
        };
        assert!(!companion.is_vehicle());
    }

    #[test]
    fn test_position_scale_factors() {
        let raw = GlobalPosition {
            system_id: 1,
            lat: 123456780,
            lon: -1223456780,
            alt: 10000,
            relative_alt: 2500,
            vx: 12,
            vy: -3,
            vz: 1,
            hdg: 9000,
        };
        let report = PositionReport::from(&raw);
        assert_eq!(report.latitude, 12.345678);
        assert_eq!(report.longitude, -122.345678);
        assert_eq!(report.altitude, 10.0);
        assert_eq!(report.relative_alt, 2.5);
        assert_eq!(report.heading, 90.0);
        assert_eq!(report.velocity, Velocity { x: 12, y: -3, z: 1 });
    }

    #[test]
    fn test_ack_acceptance() {
        let ack = CommandAck {
            command: MavCmd::MAV_CMD_NAV_TAKEOFF,
            result: MavResult::MAV_RESULT_ACCEPTED,
        };
        assert!(ack.is_accepted());
        let denied = CommandAck {
            result: MavResult::MAV_RESULT_DENIED,
            ..ack
        };
        assert!(!denied.is_accepted());
    }

    #[test]
    fn test_severity_to_string() {
        assert_eq!(severity_to_string(3), "ERROR");
        assert_eq!(severity_to_string(6), "INFO");
        assert_eq!(severity_to_string(42), "UNKNOWN");
    }
}
