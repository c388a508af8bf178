//! Timing budgets for the control operations

use std::time::Duration;

/// Per-operation wait budgets
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Heartbeat wait for every operation except disarm
    pub heartbeat_timeout: Duration,
    /// How long to wait for the armed flag after sending arm
    pub arm_timeout: Duration,
    /// How long to wait for the takeoff COMMAND_ACK
    pub ack_timeout: Duration,
    /// Heartbeat and disarmed-flag wait for disarm. `None` blocks.
    pub disarm_timeout: Option<Duration>,
    pub position_timeout: Duration,
    /// Requested GLOBAL_POSITION_INT interval
    pub position_interval: Duration,
    pub mode_confirm_timeout: Duration,
    pub mode_poll_interval: Duration,
    /// Pause between dependent steps of the takeoff sequence
    pub settle_delay: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(10),
            arm_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(10),
            disarm_timeout: None,
            position_timeout: Duration::from_secs(5),
            position_interval: Duration::from_millis(100),
            mode_confirm_timeout: Duration::from_secs(5),
            mode_poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_secs(1),
        }
    }
}
