//! Flight mode change handler

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::HandlerContext;
use crate::error::{ControlError, Result};
use crate::mavlink::VehicleCommand;
use crate::transport::AutopilotLink;

/// Outcome of a mode change. Not seeing the new mode is a soft failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeChange {
    Confirmed(String),
    Unconfirmed { requested: String, observed: String },
}

/// Switch to `mode` (case-insensitive) and poll for the vehicle to report it
pub async fn change_mode<L: AutopilotLink>(ctx: HandlerContext<'_, L>, mode: &str) -> Result<ModeChange> {
    let HandlerContext { session, config } = ctx;
    session.wait_heartbeat(Some(config.heartbeat_timeout)).await?;

    let name = mode.to_uppercase();
    let table = session.state().mode_table();
    let Some(mode_id) = table.and_then(|table| table.id_of(&name)) else {
        if let Some(table) = table {
            debug!(
                session = session.id(),
                "[MODE] {} has no mode {}; known: {}",
                table.firmware,
                name,
                table.names().collect::<Vec<_>>().join(", ")
            );
        }
        return Err(ControlError::InvalidMode(mode.to_string()));
    };
    session.send(VehicleCommand::set_mode(mode_id)).await?;

    let deadline = Instant::now() + config.mode_confirm_timeout;
    loop {
        if session.state().flight_mode() == name {
            info!(session = session.id(), "[MODE] Now in {}", name);
            return Ok(ModeChange::Confirmed(name));
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        session.pump(config.mode_poll_interval.min(deadline - now)).await?;
    }

    let observed = session.state().flight_mode();
    warn!(session = session.id(), "[MODE] Requested {} but vehicle reports {}", name, observed);
    Ok(ModeChange::Unconfirmed {
        requested: name,
        observed,
    })
}
