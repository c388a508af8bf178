//! A single operation's link to the vehicle

use mavlink::ardupilotmega::MavCmd;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::{ControlError, Result};
use crate::mavlink::{
    severity_to_string, CommandAck, Heartbeat, MessageKind, ModeTable, VehicleCommand,
    VehicleMessage,
};
use crate::transport::AutopilotLink;

/// Flight mode string before any heartbeat has been seen
pub const UNKNOWN_MODE: &str = "UNKNOWN";

/// Identity of the vehicle a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub system_id: u8,
    pub component_id: u8,
}

/// Vehicle state derived from the latest heartbeat
#[derive(Debug, Clone, Default)]
pub struct VehicleState {
    heartbeat: Option<Heartbeat>,
}

impl VehicleState {
    pub fn armed(&self) -> bool {
        self.heartbeat.map(|hb| hb.is_armed()).unwrap_or(false)
    }

    pub fn system_status(&self) -> Option<u8> {
        self.heartbeat.map(|hb| hb.system_status)
    }

    /// Mode table for the vehicle type in the latest heartbeat
    pub fn mode_table(&self) -> Option<&'static ModeTable> {
        self.heartbeat.and_then(|hb| ModeTable::for_vehicle(hb.mav_type))
    }

    /// Current flight mode name, `UNKNOWN` before any heartbeat
    pub fn flight_mode(&self) -> String {
        match (self.heartbeat, self.mode_table()) {
            (None, _) => UNKNOWN_MODE.to_string(),
            (Some(hb), Some(table)) => table.display_name(hb.custom_mode),
            (Some(hb), None) => format!("Mode({})", hb.custom_mode),
        }
    }
}

/// An open link scoped to one operation
///
/// The link is closed by [`Session::release`] or, failing that, on drop.
pub struct Session<L: AutopilotLink> {
    id: u64,
    link: L,
    target: Option<Target>,
    state: VehicleState,
    released: bool,
}

impl<L: AutopilotLink> Session<L> {
    pub(super) fn new(id: u64, link: L) -> Self {
        Self {
            id,
            link,
            target: None,
            state: VehicleState::default(),
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Target identity, known once a vehicle heartbeat has been observed
    #[cfg(test)]
    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Wait for a vehicle heartbeat. `None` waits indefinitely.
    pub async fn wait_heartbeat(&mut self, timeout: Option<Duration>) -> Result<Heartbeat> {
        match self.recv_matching(MessageKind::Heartbeat, timeout).await? {
            Some(VehicleMessage::Heartbeat(hb)) => Ok(hb),
            _ => Err(ControlError::HeartbeatTimeout(timeout.unwrap_or_default())),
        }
    }

    /// Receive messages until one of `kind` arrives or the timeout expires
    pub async fn recv_matching(
        &mut self,
        kind: MessageKind,
        timeout: Option<Duration>,
    ) -> Result<Option<VehicleMessage>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        while let Some(msg) = self.next_message(deadline).await? {
            if msg.kind() == Some(kind) {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    /// Wait for the acknowledgement of `command`, ignoring acks for others
    pub async fn recv_ack(&mut self, command: MavCmd, timeout: Duration) -> Result<Option<CommandAck>> {
        let deadline = Instant::now() + timeout;
        while let Some(msg) = self.next_message(Some(deadline)).await? {
            match msg {
                VehicleMessage::CommandAck(ack) if ack.command == command => return Ok(Some(ack)),
                VehicleMessage::CommandAck(ack) => {
                    debug!(session = self.id, "[SESSION] Ignoring ack for {:?}", ack.command)
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Wait until `done` holds for the cached state. `None` waits
    /// indefinitely. An explicit rejection of `command` ends the wait early.
    pub async fn wait_for_state(
        &mut self,
        command: Option<MavCmd>,
        timeout: Option<Duration>,
        done: impl Fn(&VehicleState) -> bool,
    ) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if done(&self.state) {
                return Ok(true);
            }
            match self.next_message(deadline).await? {
                None => return Ok(false),
                Some(VehicleMessage::CommandAck(ack))
                    if Some(ack.command) == command && !ack.is_accepted() =>
                {
                    return Err(ControlError::CommandRejected {
                        command: ack.command,
                        result: ack.result,
                    });
                }
                Some(_) => {}
            }
        }
    }

    /// Process whatever arrives during `period`, keeping the cache current
    pub async fn pump(&mut self, period: Duration) -> Result<()> {
        let deadline = Instant::now() + period;
        while self.next_message(Some(deadline)).await?.is_some() {}
        Ok(())
    }

    /// Address `command` to the target vehicle and send it
    pub async fn send(&mut self, command: VehicleCommand) -> Result<()> {
        let target = self.target.ok_or(ControlError::TargetUnknown)?;
        debug!(session = self.id, "[SESSION] Sending {:?} {:?}", command.command, command.params);
        self.link
            .send(&command.addressed(target.system_id, target.component_id))
            .await
            .map_err(ControlError::Link)
    }

    /// Close the link. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.link.close();
        info!(session = self.id, "[SESSION] Released");
    }

    /// Next message from the link, `None` once `deadline` passes
    async fn next_message(&mut self, deadline: Option<Instant>) -> Result<Option<VehicleMessage>> {
        let msg = match deadline {
            Some(deadline) => match timeout_at(deadline, self.link.recv()).await {
                Ok(received) => received,
                Err(_) => return Ok(None),
            },
            None => self.link.recv().await,
        }
        .map_err(ControlError::Link)?;

        Ok(Some(self.observe(msg)))
    }

    /// Update cached state. Heartbeats and positions from anything but the
    /// target are turned into `Other` so they never satisfy a wait.
    fn observe(&mut self, msg: VehicleMessage) -> VehicleMessage {
        match &msg {
            VehicleMessage::Heartbeat(hb) => {
                if !self.accept_heartbeat(hb) {
                    return VehicleMessage::Other;
                }
                self.state.heartbeat = Some(*hb);
            }
            VehicleMessage::GlobalPosition(pos) => {
                if self.target.map(|t| t.system_id) != Some(pos.system_id) {
                    debug!(session = self.id, "[SESSION] Dropping position from system {}", pos.system_id);
                    return VehicleMessage::Other;
                }
            }
            VehicleMessage::StatusText { severity, text } => {
                if *severity <= 3 {
                    warn!(session = self.id, "[FC] {}: {}", severity_to_string(*severity), text);
                } else {
                    debug!(session = self.id, "[FC] {}: {}", severity_to_string(*severity), text);
                }
            }
            _ => {}
        }
        msg
    }

    fn accept_heartbeat(&mut self, hb: &Heartbeat) -> bool {
        if !hb.is_vehicle() {
            return false;
        }
        match self.target {
            None => {
                let target = Target {
                    system_id: hb.system_id,
                    component_id: hb.component_id,
                };
                info!(
                    session = self.id,
                    "[SESSION] Heartbeat from system {} component {}",
                    target.system_id,
                    target.component_id
                );
                self.target = Some(target);
                true
            }
            Some(target) => target.system_id == hb.system_id,
        }
    }
}

impl<L: AutopilotLink> Drop for Session<L> {
    fn drop(&mut self) {
        if !self.released {
            debug!(session = self.id, "[SESSION] Releasing on drop");
            self.release();
        }
    }
}
