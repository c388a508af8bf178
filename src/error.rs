//! Error taxonomy for vehicle control operations

use mavlink::ardupilotmega::{MavCmd, MavResult};
use std::time::Duration;
use thiserror::Error;

/// Every way a control operation can fail short of success
#[derive(Error, Debug)]
pub enum ControlError {
    /// Transport could not be established
    #[error("could not connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    /// No liveness broadcast within the budget
    #[error("no heartbeat received within {0:?}")]
    HeartbeatTimeout(Duration),

    /// The vehicle explicitly declined a dispatched command
    #[error("{command:?} rejected by vehicle ({result:?})")]
    CommandRejected { command: MavCmd, result: MavResult },

    /// Command sent but the expected confirmation never arrived
    #[error("{what} not confirmed within {timeout:?}")]
    ConfirmationTimeout { what: &'static str, timeout: Duration },

    /// Unrecognized mode name
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// The vehicle's mode table has no entry the operation depends on
    #[error("mode {0} is not available on this vehicle")]
    ModeUnavailable(&'static str),

    /// A command was attempted before any heartbeat fixed the target
    #[error("target vehicle unknown: no heartbeat observed in this session")]
    TargetUnknown,

    /// Transport I/O failed after the session was established
    #[error("link error: {0}")]
    Link(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
