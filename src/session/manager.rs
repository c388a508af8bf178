//! Session manager: opens a fresh session per operation

use anyhow::anyhow;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::timeout;
use tracing::{error, info};

use super::connection::Session;
use crate::error::{ControlError, Result};
use crate::mavlink::FcConfig;
use crate::transport::{AutopilotLink, LinkConnector};

/// Opens sessions to the configured endpoint. Holds no open links itself.
pub struct SessionManager<C: LinkConnector> {
    connector: C,
    config: FcConfig,
    next_id: AtomicU64,
}

impl<C: LinkConnector> SessionManager<C> {
    pub fn new(connector: C, config: FcConfig) -> Self {
        Self {
            connector,
            config,
            next_id: AtomicU64::new(0),
        }
    }

    /// Configured endpoint, for diagnostics
    pub fn endpoint(&self) -> String {
        self.config.connection.to_string()
    }

    /// Open a new session. Does not wait for a heartbeat.
    pub async fn acquire(&self) -> Result<Session<C::Link>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let endpoint = self.endpoint();

        let link = match timeout(self.config.connect_timeout, self.connector.open(&self.config)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                error!(session = id, endpoint = %endpoint, "[SESSION] Connection failed: {:#}", e);
                return Err(ControlError::Connection {
                    endpoint,
                    source: e,
                });
            }
            Err(_) => {
                error!(session = id, endpoint = %endpoint, "[SESSION] Connection timed out");
                return Err(ControlError::Connection {
                    endpoint,
                    source: anyhow!("timed out after {:?}", self.config.connect_timeout),
                });
            }
        };

        info!(
            session = id,
            endpoint = %endpoint,
            "[SESSION] Opened {} link via {}",
            link.name(),
            self.connector.name()
        );
        Ok(Session::new(id, link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::sim::SimVehicle;

    #[tokio::test(start_paused = true)]
    async fn test_each_acquire_opens_a_new_link() {
        let vehicle = SimVehicle::copter();
        let manager = SessionManager::new(vehicle.clone(), FcConfig::default());

        let mut first = manager.acquire().await.unwrap();
        let mut second = manager.acquire().await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(vehicle.opens(), 2);

        first.release();
        second.release();
        assert_eq!(vehicle.closes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failure_names_endpoint() {
        let vehicle = SimVehicle::copter();
        vehicle.update(|s| s.fail_open = true);
        let manager = SessionManager::new(vehicle.clone(), FcConfig::default());

        match manager.acquire().await {
            Err(ControlError::Connection { endpoint, .. }) => {
                assert_eq!(endpoint, "udpin:127.0.0.1:14552")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a connection failure"),
        }
        assert_eq!(vehicle.opens(), 0);
    }
}
