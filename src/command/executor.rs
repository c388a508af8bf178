//! Command executor: runs each operation in its own session and turns the
//! outcome into operator-facing text or records

use futures::future::{BoxFuture, FutureExt};
use mavlink::ardupilotmega::MavCmd;
use serde::Serialize;
use tracing::{info, warn};

use super::handlers::{self, HandlerContext, ModeChange, StatusReport};
use super::ControlConfig;
use crate::error::{ControlError, Result};
use crate::mavlink::{FcConfig, PositionReport};
use crate::session::SessionManager;
use crate::transport::LinkConnector;

/// Error text when no position telemetry arrives in time
pub const NO_POSITION: &str = "No position data available";

/// Position record, or an error record in its place
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PositionResponse {
    Position(PositionReport),
    Error { error: String },
}

/// Runs vehicle operations against the configured endpoint
pub struct CommandExecutor<C: LinkConnector> {
    sessions: SessionManager<C>,
    config: ControlConfig,
}

impl<C: LinkConnector> CommandExecutor<C> {
    pub fn new(connector: C, fc_config: FcConfig, config: ControlConfig) -> Self {
        Self {
            sessions: SessionManager::new(connector, fc_config),
            config,
        }
    }

    pub async fn arm(&self) -> String {
        match self.with_session("arm", |ctx| handlers::arm(ctx).boxed()).await {
            Ok(()) => "Vehicle armed.".to_string(),
            Err(ControlError::HeartbeatTimeout(t)) => heartbeat_timeout_message(t),
            Err(e) => self.with_hints(&e),
        }
    }

    pub async fn disarm(&self) -> String {
        match self.with_session("disarm", |ctx| handlers::disarm(ctx).boxed()).await {
            Ok(()) => "Vehicle disarmed.".to_string(),
            Err(e) => self.describe(&e),
        }
    }

    pub async fn takeoff(&self, altitude: f32) -> String {
        let result = self
            .with_session("takeoff", move |ctx| handlers::takeoff(ctx, altitude).boxed())
            .await;
        match result {
            Ok(()) => format!("Takeoff initiated to {:?}m.", altitude),
            Err(ControlError::CommandRejected {
                command: MavCmd::MAV_CMD_NAV_TAKEOFF,
                ..
            })
            | Err(ControlError::ConfirmationTimeout { what: "takeoff", .. }) => {
                "Error: takeoff command rejected".to_string()
            }
            Err(e) => self.describe(&e),
        }
    }

    pub async fn change_mode(&self, mode: &str) -> String {
        let requested = mode.to_string();
        let result = self
            .with_session("change_mode", move |ctx| {
                async move { handlers::change_mode(ctx, &requested).await }.boxed()
            })
            .await;
        match result {
            Ok(ModeChange::Confirmed(name)) => format!("Mode changed to {}.", name),
            Ok(ModeChange::Unconfirmed { observed, .. }) => format!(
                "Warning: could not confirm mode change (current mode: {})",
                observed
            ),
            Err(ControlError::InvalidMode(mode)) => format!("Invalid mode: {}", mode),
            Err(e) => self.describe(&e),
        }
    }

    pub async fn get_status(&self) -> StatusReport {
        match self.with_session("get_status", |ctx| handlers::get_status(ctx).boxed()).await {
            Ok(report) => report,
            Err(e) => StatusReport::unavailable(self.describe(&e)),
        }
    }

    pub async fn get_position(&self) -> PositionResponse {
        let result = self
            .with_session("get_position", |ctx| handlers::get_position(ctx).boxed())
            .await;
        match result {
            Ok(Some(position)) => PositionResponse::Position(position),
            Ok(None) => PositionResponse::Error {
                error: NO_POSITION.to_string(),
            },
            Err(e) => PositionResponse::Error {
                error: self.describe(&e),
            },
        }
    }

    /// Acquire a session, run `act` in it, release it
    async fn with_session<T>(
        &self,
        operation: &'static str,
        act: impl for<'a> FnOnce(HandlerContext<'a, C::Link>) -> BoxFuture<'a, Result<T>>,
    ) -> Result<T> {
        let mut session = self.sessions.acquire().await?;
        info!(session = session.id(), "[CMD] {}", operation);

        let result = act(HandlerContext {
            session: &mut session,
            config: &self.config,
        })
        .await;
        session.release();

        match &result {
            Ok(_) => info!(operation, "[CMD] Completed"),
            Err(e) => warn!(operation, "[CMD] Failed: {}", e),
        }
        result
    }

    fn describe(&self, error: &ControlError) -> String {
        match error {
            ControlError::HeartbeatTimeout(t) => heartbeat_timeout_message(*t),
            ControlError::Connection { .. } | ControlError::Link(_) => self.with_hints(error),
            other => format!("Error: {}", other),
        }
    }

    /// Error text followed by connection troubleshooting hints
    fn with_hints(&self, error: &ControlError) -> String {
        format!(
            "Error: {}\nCheck the connection settings:\n\
             - Is SITL or the vehicle running?\n\
             - Is the endpoint correct ({})?\n\
             - Firewall settings",
            error,
            self.sessions.endpoint()
        )
    }
}

fn heartbeat_timeout_message(timeout: std::time::Duration) -> String {
    format!(
        "Error: connection to ArduPilot timed out (no heartbeat within {:?})",
        timeout
    )
}
