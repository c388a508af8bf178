//! ArduPilot flight mode tables
//!
//! Custom mode numbers differ per vehicle firmware, so the table is chosen
//! from the MAV_TYPE reported in the heartbeat.

/// Mode name <-> custom mode id mapping for one firmware
#[derive(Debug, PartialEq, Eq)]
pub struct ModeTable {
    pub firmware: &'static str,
    modes: &'static [(&'static str, u32)],
}

impl ModeTable {
    /// Look up a mode id by name, ignoring case
    pub fn id_of(&self, name: &str) -> Option<u32> {
        let name = name.to_ascii_uppercase();
        self.modes.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
    }

    /// Name of a mode id, if the firmware defines it
    pub fn name_of(&self, id: u32) -> Option<&'static str> {
        self.modes.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
    }

    /// Display name for a mode id, `Mode(<id>)` when unknown
    pub fn display_name(&self, id: u32) -> String {
        match self.name_of(id) {
            Some(name) => name.to_string(),
            None => format!("Mode({})", id),
        }
    }

    /// All mode names in this table
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.modes.iter().map(|(n, _)| *n)
    }

    /// Pick the table for a MAV_TYPE value, `None` for vehicle types
    /// without ArduPilot custom modes (ground stations, gimbals, ...)
    pub fn for_vehicle(mav_type: u8) -> Option<&'static ModeTable> {
        match mav_type {
            // FIXED_WING and the VTOL family
            1 | 19..=25 => Some(&PLANE),
            // QUADROTOR, COAXIAL, HELICOPTER, HEXAROTOR, OCTOROTOR, TRICOPTER, DODECAROTOR
            2 | 3 | 4 | 13 | 14 | 15 | 29 => Some(&COPTER),
            // GROUND_ROVER, SURFACE_BOAT
            10 | 11 => Some(&ROVER),
            // SUBMARINE
            12 => Some(&SUB),
            _ => None,
        }
    }
}

/// MAV_TYPE_GCS
pub const MAV_TYPE_GCS: u8 = 6;

pub static COPTER: ModeTable = ModeTable {
    firmware: "ArduCopter",
    modes: &[
        ("STABILIZE", 0),
        ("ACRO", 1),
        ("ALT_HOLD", 2),
        ("AUTO", 3),
        ("GUIDED", 4),
        ("LOITER", 5),
        ("RTL", 6),
        ("CIRCLE", 7),
        ("POSITION", 8),
        ("LAND", 9),
        ("OF_LOITER", 10),
        ("DRIFT", 11),
        ("SPORT", 13),
        ("FLIP", 14),
        ("AUTOTUNE", 15),
        ("POSHOLD", 16),
        ("BRAKE", 17),
        ("THROW", 18),
        ("AVOID_ADSB", 19),
        ("GUIDED_NOGPS", 20),
        ("SMART_RTL", 21),
        ("FLOWHOLD", 22),
        ("FOLLOW", 23),
        ("ZIGZAG", 24),
        ("SYSTEMID", 25),
        ("AUTOROTATE", 26),
        ("AUTO_RTL", 27),
    ],
};

pub static PLANE: ModeTable = ModeTable {
    firmware: "ArduPlane",
    modes: &[
        ("MANUAL", 0),
        ("CIRCLE", 1),
        ("STABILIZE", 2),
        ("TRAINING", 3),
        ("ACRO", 4),
        ("FBWA", 5),
        ("FBWB", 6),
        ("CRUISE", 7),
        ("AUTOTUNE", 8),
        ("AUTO", 10),
        ("RTL", 11),
        ("LOITER", 12),
        ("TAKEOFF", 13),
        ("AVOID_ADSB", 14),
        ("GUIDED", 15),
        ("INITIALISING", 16),
        ("QSTABILIZE", 17),
        ("QHOVER", 18),
        ("QLOITER", 19),
        ("QLAND", 20),
        ("QRTL", 21),
        ("QAUTOTUNE", 22),
        ("QACRO", 23),
        ("THERMAL", 24),
    ],
};

pub static ROVER: ModeTable = ModeTable {
    firmware: "Rover",
    modes: &[
        ("MANUAL", 0),
        ("ACRO", 1),
        ("LEARNING", 2),
        ("STEERING", 3),
        ("HOLD", 4),
        ("LOITER", 5),
        ("FOLLOW", 6),
        ("SIMPLE", 7),
        ("AUTO", 10),
        ("RTL", 11),
        ("SMART_RTL", 12),
        ("GUIDED", 15),
        ("INITIALISING", 16),
    ],
};

pub static SUB: ModeTable = ModeTable {
    firmware: "ArduSub",
    modes: &[
        ("STABILIZE", 0),
        ("ACRO", 1),
        ("ALT_HOLD", 2),
        ("AUTO", 3),
        ("GUIDED", 4),
        ("CIRCLE", 7),
        ("SURFACE", 9),
        ("POSHOLD", 16),
        ("MANUAL", 19),
    ],
};
