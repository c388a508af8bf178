//! Simulated vehicle for exercising the control path without an autopilot
//!
//! Emits heartbeats (and optionally position) on a tokio clock, reacts to
//! arm/disarm/set-mode/takeoff commands and counts link opens and closes.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use mavlink::ardupilotmega::{MavCmd, MavResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use super::traits::{AutopilotLink, LinkConnector};
use crate::mavlink::{CommandAck, CommandLong, FcConfig, GlobalPosition, Heartbeat, VehicleMessage};

/// Everything the simulated vehicle knows, plus test counters
#[derive(Debug, Clone)]
pub struct SimState {
    pub system_id: u8,
    pub mav_type: u8,
    pub mode_id: u32,
    pub armed: bool,
    pub system_status: u8,
    /// Whether the vehicle broadcasts heartbeats at all
    pub heartbeats: bool,
    pub heartbeat_period: Duration,
    /// Extra heartbeats from a ground station interleaved with the vehicle's
    pub gcs_heartbeats: bool,
    /// A second vehicle (system 2, armed, GUIDED) on the same link. Its
    /// heartbeat and position follow each of ours.
    pub other_vehicle: bool,
    pub arm_result: MavResult,
    pub mode_change_accepted: bool,
    pub mode_change_delay: Duration,
    /// `None` means the takeoff command is never acknowledged
    pub takeoff_result: Option<MavResult>,
    pub position: Option<GlobalPosition>,
    pub fail_open: bool,

    pub opens: usize,
    pub closes: usize,
    pub commands: Vec<CommandLong>,
    pending_mode: Option<(Instant, u32)>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            system_id: 1,
            mav_type: 2, // QUADROTOR
            mode_id: 0,  // STABILIZE
            armed: false,
            system_status: 3, // STANDBY
            heartbeats: true,
            heartbeat_period: Duration::from_millis(100),
            gcs_heartbeats: false,
            other_vehicle: false,
            arm_result: MavResult::MAV_RESULT_ACCEPTED,
            mode_change_accepted: true,
            mode_change_delay: Duration::from_millis(50),
            takeoff_result: Some(MavResult::MAV_RESULT_ACCEPTED),
            position: None,
            fail_open: false,
            opens: 0,
            closes: 0,
            commands: Vec::new(),
            pending_mode: None,
        }
    }
}

impl SimState {
    fn heartbeat(&mut self, now: Instant) -> Heartbeat {
        if let Some((at, mode)) = self.pending_mode {
            if at <= now {
                self.mode_id = mode;
                self.pending_mode = None;
            }
        }
        Heartbeat {
            system_id: self.system_id,
            component_id: 1,
            mav_type: self.mav_type,
            autopilot: 3, // ARDUPILOTMEGA
            base_mode: if self.armed { 0x80 | 0x01 } else { 0x01 },
            custom_mode: self.mode_id,
            system_status: self.system_status,
        }
    }

    /// Messages sent in one heartbeat slot, ours after any ground station
    fn heartbeat_burst(&mut self, now: Instant) -> Vec<VehicleMessage> {
        let mut burst = Vec::new();
        if self.gcs_heartbeats {
            burst.push(VehicleMessage::Heartbeat(Heartbeat {
                system_id: 255,
                component_id: 190,
                mav_type: 6, // GCS
                autopilot: 8,
                base_mode: 0,
                custom_mode: 0,
                system_status: 4,
            }));
        }
        burst.push(VehicleMessage::Heartbeat(self.heartbeat(now)));
        if self.other_vehicle {
            burst.push(VehicleMessage::Heartbeat(Heartbeat {
                system_id: 2,
                component_id: 1,
                mav_type: 2,
                autopilot: 3,
                base_mode: 0x80 | 0x01,
                custom_mode: 4, // GUIDED
                system_status: 4,
            }));
            burst.push(VehicleMessage::GlobalPosition(GlobalPosition {
                system_id: 2,
                lat: 515000000,
                lon: -1200000,
                ..GlobalPosition::default()
            }));
        }
        burst
    }

    fn react(&mut self, command: &CommandLong, now: Instant) -> Option<CommandAck> {
        self.commands.push(command.clone());
        let result = match command.command {
            MavCmd::MAV_CMD_COMPONENT_ARM_DISARM if command.params[0] == 1.0 => {
                if self.arm_result == MavResult::MAV_RESULT_ACCEPTED {
                    self.armed = true;
                }
                Some(self.arm_result)
            }
            MavCmd::MAV_CMD_COMPONENT_ARM_DISARM => {
                self.armed = false;
                Some(MavResult::MAV_RESULT_ACCEPTED)
            }
            MavCmd::MAV_CMD_DO_SET_MODE if self.mode_change_accepted => {
                self.pending_mode = Some((now + self.mode_change_delay, command.params[1] as u32));
                Some(MavResult::MAV_RESULT_ACCEPTED)
            }
            MavCmd::MAV_CMD_DO_SET_MODE => Some(MavResult::MAV_RESULT_DENIED),
            MavCmd::MAV_CMD_NAV_TAKEOFF => self.takeoff_result,
            _ => Some(MavResult::MAV_RESULT_ACCEPTED),
        };
        result.map(|result| CommandAck {
            command: command.command,
            result,
        })
    }
}

/// Handle to a simulated vehicle; clones share the same vehicle
#[derive(Debug, Clone, Default)]
pub struct SimVehicle {
    state: Arc<Mutex<SimState>>,
}

impl SimVehicle {
    /// A disarmed quadcopter in STABILIZE
    pub fn copter() -> Self {
        Self::default()
    }

    pub fn update(&self, f: impl FnOnce(&mut SimState)) {
        f(&mut self.lock());
    }

    pub fn snapshot(&self) -> SimState {
        self.lock().clone()
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    pub fn commands(&self) -> Vec<CommandLong> {
        self.lock().commands.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LinkConnector for SimVehicle {
    type Link = SimLink;

    async fn open(&self, _config: &FcConfig) -> Result<SimLink> {
        let mut state = self.lock();
        if state.fail_open {
            bail!("Address already in use (os error 98)");
        }
        state.opens += 1;
        let now = Instant::now();
        Ok(SimLink {
            vehicle: self.clone(),
            next_heartbeat: now,
            next_position: now,
            outbox: VecDeque::new(),
            closed: false,
        })
    }

    fn name(&self) -> &'static str {
        "simulator"
    }
}

enum Due {
    Heartbeat,
    Position,
    Outbox,
}

/// One link to the simulated vehicle
pub struct SimLink {
    vehicle: SimVehicle,
    next_heartbeat: Instant,
    next_position: Instant,
    outbox: VecDeque<VehicleMessage>,
    closed: bool,
}

impl SimLink {
    fn next_due(&self) -> Option<(Instant, Due)> {
        if !self.outbox.is_empty() {
            return Some((Instant::now(), Due::Outbox));
        }
        let state = self.vehicle.lock();
        let heartbeat = state
            .heartbeats
            .then_some((self.next_heartbeat, Due::Heartbeat));
        let position = state
            .position
            .map(|_| (self.next_position, Due::Position));
        match (heartbeat, position) {
            (Some(h), Some(p)) => Some(if p.0 < h.0 { p } else { h }),
            (h, p) => h.or(p),
        }
    }
}

#[async_trait]
impl AutopilotLink for SimLink {
    async fn send(&mut self, command: &CommandLong) -> Result<()> {
        if self.closed {
            bail!("link closed");
        }
        let ack = self.vehicle.lock().react(command, Instant::now());
        self.outbox.extend(ack.map(VehicleMessage::CommandAck));
        Ok(())
    }

    async fn recv(&mut self) -> Result<VehicleMessage> {
        if self.closed {
            return Err(anyhow!("link closed"));
        }
        let Some((at, due)) = self.next_due() else {
            return std::future::pending().await;
        };
        sleep_until(at).await;

        let mut state = self.vehicle.lock();
        let period = state.heartbeat_period;
        let msg = match due {
            Due::Outbox => self.outbox.pop_front().unwrap_or(VehicleMessage::Other),
            Due::Position => {
                self.next_position += period;
                state
                    .position
                    .map(|position| {
                        VehicleMessage::GlobalPosition(GlobalPosition {
                            system_id: state.system_id,
                            ..position
                        })
                    })
                    .unwrap_or(VehicleMessage::Other)
            }
            Due::Heartbeat => {
                self.next_heartbeat += period;
                let burst = state.heartbeat_burst(Instant::now());
                self.outbox.extend(burst);
                self.outbox.pop_front().unwrap_or(VehicleMessage::Other)
            }
        };
        Ok(msg)
    }

    fn close(&mut self) {
        self.closed = true;
        self.vehicle.lock().closes += 1;
    }

    fn name(&self) -> &'static str {
        "simulator"
    }
}
