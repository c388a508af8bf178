//! Link capability abstraction for pluggable autopilot transports

use anyhow::Result;
use async_trait::async_trait;

use crate::mavlink::{CommandLong, FcConfig, VehicleMessage};

/// An open link to an autopilot
#[async_trait]
pub trait AutopilotLink: Send + 'static {
    /// Send a command to the vehicle
    async fn send(&mut self, command: &CommandLong) -> Result<()>;

    /// Receive the next message from the vehicle, waiting as long as it takes
    ///
    /// Callers bound this with a timeout; implementations must be cancel-safe
    /// at the message boundary.
    async fn recv(&mut self) -> Result<VehicleMessage>;

    /// Close the link. Must be idempotent.
    fn close(&mut self);

    /// Human-readable name for this link
    fn name(&self) -> &'static str;
}

/// Factory for opening links
#[async_trait]
pub trait LinkConnector: Send + Sync + 'static {
    /// The link type this connector produces
    type Link: AutopilotLink;

    /// Open a fresh link to the endpoint in `config`
    async fn open(&self, config: &FcConfig) -> Result<Self::Link>;

    /// Human-readable name for this connector
    fn name(&self) -> &'static str;
}
