//! Arm and disarm handlers

use mavlink::ardupilotmega::MavCmd;
use tracing::info;

use super::HandlerContext;
use crate::command::ControlConfig;
use crate::error::{ControlError, Result};
use crate::mavlink::VehicleCommand;
use crate::session::Session;
use crate::transport::AutopilotLink;

/// Arm the motors and wait until the vehicle reports armed
pub async fn arm<L: AutopilotLink>(ctx: HandlerContext<'_, L>) -> Result<()> {
    ctx.session
        .wait_heartbeat(Some(ctx.config.heartbeat_timeout))
        .await?;
    arm_confirmed(ctx.session, ctx.config).await
}

/// Send arm and wait for the armed flag. Shared with the takeoff sequence.
pub(super) async fn arm_confirmed<L: AutopilotLink>(
    session: &mut Session<L>,
    config: &ControlConfig,
) -> Result<()> {
    session.send(VehicleCommand::arm()).await?;
    let armed = session
        .wait_for_state(
            Some(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM),
            Some(config.arm_timeout),
            |state| state.armed(),
        )
        .await?;
    if !armed {
        return Err(ControlError::ConfirmationTimeout {
            what: "arming",
            timeout: config.arm_timeout,
        });
    }
    info!(session = session.id(), "[CMD] Motors armed");
    Ok(())
}

/// Disarm the motors and wait until the vehicle reports disarmed.
///
/// Both waits use `disarm_timeout`, which blocks when unset.
pub async fn disarm<L: AutopilotLink>(ctx: HandlerContext<'_, L>) -> Result<()> {
    let HandlerContext { session, config } = ctx;
    session.wait_heartbeat(config.disarm_timeout).await?;
    session.send(VehicleCommand::disarm()).await?;
    let disarmed = session
        .wait_for_state(
            Some(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM),
            config.disarm_timeout,
            |state| !state.armed(),
        )
        .await?;
    if !disarmed {
        return Err(ControlError::ConfirmationTimeout {
            what: "disarming",
            timeout: config.disarm_timeout.unwrap_or_default(),
        });
    }
    info!(session = session.id(), "[CMD] Motors disarmed");
    Ok(())
}
