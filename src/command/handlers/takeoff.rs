//! Takeoff handler
//!
//! Linear sequence with one branch: heartbeat, switch to GUIDED unless
//! already there, arm, settle, send NAV_TAKEOFF, wait for its ack. Any
//! failure aborts the rest.

use mavlink::ardupilotmega::MavCmd;
use tokio::time::sleep;
use tracing::{debug, info};

use super::arming::arm_confirmed;
use super::HandlerContext;
use crate::error::{ControlError, Result};
use crate::mavlink::VehicleCommand;
use crate::session::Session;
use crate::transport::AutopilotLink;

const GUIDED: &str = "GUIDED";

/// Progress through the takeoff sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeoffStage {
    Connected,
    LivenessConfirmed,
    ModeGuided,
    Armed,
    TakeoffRequested,
}

fn advance<L: AutopilotLink>(session: &Session<L>, stage: &mut TakeoffStage, next: TakeoffStage) {
    debug!(session = session.id(), "[TAKEOFF] {:?} -> {:?}", stage, next);
    *stage = next;
}

/// Take off to `altitude` metres
pub async fn takeoff<L: AutopilotLink>(ctx: HandlerContext<'_, L>, altitude: f32) -> Result<()> {
    let HandlerContext { session, config } = ctx;
    let mut stage = TakeoffStage::Connected;

    session.wait_heartbeat(Some(config.heartbeat_timeout)).await?;
    advance(session, &mut stage, TakeoffStage::LivenessConfirmed);

    if session.state().flight_mode() != GUIDED {
        let guided = session
            .state()
            .mode_table()
            .and_then(|table| table.id_of(GUIDED))
            .ok_or(ControlError::ModeUnavailable(GUIDED))?;
        session.send(VehicleCommand::set_mode(guided)).await?;
        let settled = session
            .wait_for_state(None, Some(config.settle_delay), |state| {
                state.flight_mode() == GUIDED
            })
            .await?;
        if !settled {
            debug!(
                session = session.id(),
                "[TAKEOFF] Still in {} after {:?}, continuing",
                session.state().flight_mode(),
                config.settle_delay
            );
        }
        advance(session, &mut stage, TakeoffStage::ModeGuided);
    }

    arm_confirmed(session, config).await?;
    advance(session, &mut stage, TakeoffStage::Armed);
    sleep(config.settle_delay).await;

    session.send(VehicleCommand::takeoff(altitude)).await?;
    advance(session, &mut stage, TakeoffStage::TakeoffRequested);

    match session
        .recv_ack(MavCmd::MAV_CMD_NAV_TAKEOFF, config.ack_timeout)
        .await?
    {
        Some(ack) if ack.is_accepted() => {
            info!(session = session.id(), "[TAKEOFF] Accepted, climbing to {}m", altitude);
            Ok(())
        }
        Some(ack) => Err(ControlError::CommandRejected {
            command: ack.command,
            result: ack.result,
        }),
        None => Err(ControlError::ConfirmationTimeout {
            what: "takeoff",
            timeout: config.ack_timeout,
        }),
    }
}
