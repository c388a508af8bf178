//! Operation handlers. Each runs inside a session the executor acquired
//! and will release.

mod arming;
mod mode;
mod status;
mod takeoff;

pub use arming::{arm, disarm};
pub use mode::{change_mode, ModeChange};
pub use status::{get_position, get_status, StatusReport};
pub use takeoff::takeoff;

use super::ControlConfig;
use crate::session::Session;
use crate::transport::AutopilotLink;

/// Context passed to operation handlers
pub struct HandlerContext<'a, L: AutopilotLink> {
    pub session: &'a mut Session<L>,
    pub config: &'a ControlConfig,
}
