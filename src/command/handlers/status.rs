//! Status and position handlers

use serde::Serialize;
use tracing::debug;

use super::HandlerContext;
use crate::error::Result;
use crate::mavlink::{MessageKind, PositionReport, VehicleCommand, VehicleMessage};
use crate::session::VehicleState;
use crate::transport::AutopilotLink;

const GLOBAL_POSITION_INT_ID: u32 = 33;

/// Snapshot of the cached heartbeat state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub armed: bool,
    pub mode: String,
    pub system_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn from_state(state: &VehicleState) -> Self {
        Self {
            armed: state.armed(),
            mode: state.flight_mode(),
            system_status: state.system_status(),
            error: None,
        }
    }

    /// Report for when no heartbeat could be observed
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::from_state(&VehicleState::default())
        }
    }
}

pub async fn get_status<L: AutopilotLink>(ctx: HandlerContext<'_, L>) -> Result<StatusReport> {
    ctx.session
        .wait_heartbeat(Some(ctx.config.heartbeat_timeout))
        .await?;
    Ok(StatusReport::from_state(ctx.session.state()))
}

/// Latest global position, `None` if none arrives within the budget
pub async fn get_position<L: AutopilotLink>(
    ctx: HandlerContext<'_, L>,
) -> Result<Option<PositionReport>> {
    let HandlerContext { session, config } = ctx;
    session.wait_heartbeat(Some(config.heartbeat_timeout)).await?;

    let interval_us = config.position_interval.as_micros() as f32;
    session
        .send(VehicleCommand::message_interval(GLOBAL_POSITION_INT_ID, interval_us))
        .await?;

    match session
        .recv_matching(MessageKind::GlobalPosition, Some(config.position_timeout))
        .await?
    {
        Some(VehicleMessage::GlobalPosition(position)) => Ok(Some(PositionReport::from(&position))),
        _ => {
            debug!(session = session.id(), "[STATUS] No position within {:?}", config.position_timeout);
            Ok(None)
        }
    }
}
