//! Flight Controller Connection
//!
//! Opens MAVLink links to ArduPilot over UDP or TCP using the async
//! connection API of the `mavlink` crate.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use mavlink::ardupilotmega::{MavMessage, COMMAND_LONG_DATA};
use mavlink::error::MessageReadError;
use mavlink::{AsyncMavConnection, MavHeader};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::commands::CommandLong;
use super::telemetry::VehicleMessage;
use crate::transport::{AutopilotLink, LinkConnector};

/// Connection type for flight controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FcConnectionType {
    /// Listen for UDP datagrams on a local address (e.g. MAVProxy `--out`)
    Udp { address: String },
    /// Send UDP datagrams to a remote address
    UdpOut { address: String },
    /// TCP client connection (e.g. SITL "127.0.0.1:5762")
    Tcp { address: String },
}

impl FcConnectionType {
    /// Address string understood by `mavlink::connect_async`
    pub fn mavlink_address(&self) -> String {
        match self {
            FcConnectionType::Udp { address } => format!("udpin:{}", address),
            FcConnectionType::UdpOut { address } => format!("udpout:{}", address),
            FcConnectionType::Tcp { address } => format!("tcpout:{}", address),
        }
    }
}

impl Default for FcConnectionType {
    fn default() -> Self {
        // MAVProxy/SITL secondary output
        Self::Udp {
            address: "127.0.0.1:14552".into(),
        }
    }
}

impl std::fmt::Display for FcConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mavlink_address())
    }
}

impl FromStr for FcConnectionType {
    type Err = anyhow::Error;

    /// Accepts `udp:`/`udpin:`, `udpout:` and `tcp:`/`tcpout:` prefixes
    fn from_str(s: &str) -> Result<Self> {
        let (scheme, address) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("endpoint '{}' has no scheme (expected udp:host:port)", s))?;

        let address = address.trim();
        if address.rsplit_once(':').is_none() {
            bail!("endpoint '{}' has no port", s);
        }
        let address = address.to_string();

        match scheme.to_ascii_lowercase().as_str() {
            "udp" | "udpin" => Ok(Self::Udp { address }),
            "udpout" => Ok(Self::UdpOut { address }),
            "tcp" | "tcpout" => Ok(Self::Tcp { address }),
            other => bail!("unsupported endpoint scheme '{}'", other),
        }
    }
}

/// Configuration for flight controller connection
#[derive(Debug, Clone)]
pub struct FcConfig {
    /// Connection type and parameters
    pub connection: FcConnectionType,
    /// System ID we send as
    pub system_id: u8,
    /// Component ID we send as
    pub component_id: u8,
    /// Reopen the endpoint when the transport fails mid-session
    pub auto_reconnect: bool,
    /// Pause before reopening
    pub reconnect_delay: Duration,
    /// Budget for opening the link
    pub connect_timeout: Duration,
}

impl Default for FcConfig {
    fn default() -> Self {
        Self {
            connection: FcConnectionType::default(),
            system_id: 1,
            component_id: 90,
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl FcConfig {
    /// Defaults overridden by `ARDUPILOT_ENDPOINT`, `ARDUPILOT_SOURCE_SYSTEM`
    /// and `ARDUPILOT_SOURCE_COMPONENT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("ARDUPILOT_ENDPOINT") {
            config.connection = endpoint
                .parse()
                .with_context(|| format!("invalid ARDUPILOT_ENDPOINT '{}'", endpoint))?;
        }
        if let Some(id) = lookup("ARDUPILOT_SOURCE_SYSTEM") {
            config.system_id = id
                .parse()
                .with_context(|| format!("invalid ARDUPILOT_SOURCE_SYSTEM '{}'", id))?;
        }
        if let Some(id) = lookup("ARDUPILOT_SOURCE_COMPONENT") {
            config.component_id = id
                .parse()
                .with_context(|| format!("invalid ARDUPILOT_SOURCE_COMPONENT '{}'", id))?;
        }

        Ok(config)
    }

    /// MAVLink header for outgoing messages
    pub fn make_header(&self) -> MavHeader {
        MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: 0, // Will be set by connection
        }
    }
}

type MavConn = Box<dyn AsyncMavConnection<MavMessage> + Sync + Send>;

/// Opens real MAVLink links
#[derive(Debug, Clone, Copy, Default)]
pub struct MavlinkConnector;

#[async_trait]
impl LinkConnector for MavlinkConnector {
    type Link = MavlinkLink;

    async fn open(&self, config: &FcConfig) -> Result<MavlinkLink> {
        let address = config.connection.mavlink_address();
        let conn = open_connection(&address).await?;

        Ok(MavlinkLink {
            address,
            header: config.make_header(),
            auto_reconnect: config.auto_reconnect,
            reconnect_delay: config.reconnect_delay,
            conn: Some(conn),
        })
    }

    fn name(&self) -> &'static str {
        "MAVLink"
    }
}

async fn open_connection(address: &str) -> Result<MavConn> {
    debug!("[MAVLink] Opening {}", address);
    mavlink::connect_async::<MavMessage>(address)
        .await
        .with_context(|| format!("failed to open {}", address))
}

/// A live MAVLink connection owned by one session
pub struct MavlinkLink {
    address: String,
    header: MavHeader,
    auto_reconnect: bool,
    reconnect_delay: Duration,
    conn: Option<MavConn>,
}

impl MavlinkLink {
    async fn reconnect(&mut self) -> Result<()> {
        self.conn = None;
        tokio::time::sleep(self.reconnect_delay).await;
        self.conn = Some(open_connection(&self.address).await?);
        info!("[MAVLink] Reconnected to {}", self.address);
        Ok(())
    }
}

#[async_trait]
impl AutopilotLink for MavlinkLink {
    async fn send(&mut self, command: &CommandLong) -> Result<()> {
        let conn = self.conn.as_ref().ok_or_else(|| anyhow!("link closed"))?;
        let [param1, param2, param3, param4, param5, param6, param7] = command.params;

        let msg = MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            target_system: command.target_system,
            target_component: command.target_component,
            command: command.command,
            confirmation: command.confirmation,
            param1,
            param2,
            param3,
            param4,
            param5,
            param6,
            param7,
        });

        conn.send(&self.header, &msg)
            .await
            .map_err(|e| anyhow!("failed to send {:?}: {}", command.command, e))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<VehicleMessage> {
        loop {
            let conn = self.conn.as_ref().ok_or_else(|| anyhow!("link closed"))?;
            let received = conn.recv().await;
            match received {
                Ok((header, msg)) => return Ok(VehicleMessage::from_mavlink(&header, &msg)),
                Err(MessageReadError::Io(e)) if self.auto_reconnect => {
                    warn!("[MAVLink] Read error on {}: {}, reconnecting", self.address, e);
                    self.reconnect().await?;
                }
                Err(MessageReadError::Io(e)) => {
                    return Err(anyhow!("read error on {}: {}", self.address, e));
                }
                Err(e) => {
                    debug!("[MAVLink] Skipping undecodable frame: {}", e);
                }
            }
        }
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("[MAVLink] Closed {}", self.address);
        }
    }

    fn name(&self) -> &'static str {
        "MAVLink"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = FcConfig::default();
        assert_eq!(config.system_id, 1);
        assert_eq!(config.component_id, 90);
        assert!(config.auto_reconnect);
        assert_eq!(config.connection.mavlink_address(), "udpin:127.0.0.1:14552");
    }

    #[test]
    fn test_endpoint_parsing() {
        let udp: FcConnectionType = "udp:127.0.0.1:14552".parse().unwrap();
        assert_eq!(
            udp,
            FcConnectionType::Udp {
                address: "127.0.0.1:14552".into()
            }
        );

        let tcp: FcConnectionType = "tcp:127.0.0.1:5762".parse().unwrap();
        assert_eq!(tcp.mavlink_address(), "tcpout:127.0.0.1:5762");

        let out: FcConnectionType = "udpout:10.0.0.2:14550".parse().unwrap();
        assert_eq!(out.mavlink_address(), "udpout:10.0.0.2:14550");
    }

    #[test]
    fn test_endpoint_parsing_errors() {
        assert!("127.0.0.1".parse::<FcConnectionType>().is_err());
        assert!("udp:localhost".parse::<FcConnectionType>().is_err());
        assert!("serial:/dev/ttyACM0:57600".parse::<FcConnectionType>().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ARDUPILOT_ENDPOINT", "tcp:127.0.0.1:5762"),
            ("ARDUPILOT_SOURCE_COMPONENT", "191"),
        ]
        .into_iter()
        .collect();

        let config = FcConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.connection.mavlink_address(), "tcpout:127.0.0.1:5762");
        assert_eq!(config.system_id, 1);
        assert_eq!(config.component_id, 191);
    }

    #[test]
    fn test_env_rejects_bad_ids() {
        let result = FcConfig::from_lookup(|k| {
            (k == "ARDUPILOT_SOURCE_SYSTEM").then(|| "300".to_string())
        });
        assert!(result.is_err());
    }
}
