//! Vehicle tool catalogue exposed over MCP

use ardupilot_mcp_shared::{ToolDefinition, ToolHandler, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::command::CommandExecutor;
use crate::transport::LinkConnector;

const DEFAULT_ALTITUDE_M: f32 = 10.0;

fn default_altitude() -> f32 {
    DEFAULT_ALTITUDE_M
}

#[derive(Debug, Deserialize)]
struct TakeoffArgs {
    #[serde(default = "default_altitude")]
    altitude: f32,
}

#[derive(Debug, Deserialize)]
struct ChangeModeArgs {
    mode: String,
}

/// Dispatches tool calls onto the command executor
pub struct VehicleTools<C: LinkConnector> {
    executor: CommandExecutor<C>,
}

impl<C: LinkConnector> VehicleTools<C> {
    pub fn new(executor: CommandExecutor<C>) -> Self {
        Self { executor }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, ToolResult> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolResult::error(format!("Invalid arguments for {}: {}", tool, e)))
}

#[async_trait]
impl<C: LinkConnector> ToolHandler for VehicleTools<C> {
    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::without_params("arm", "Arm the vehicle's motors"),
            ToolDefinition::without_params("disarm", "Disarm the vehicle's motors"),
            ToolDefinition::new(
                "takeoff",
                "Switch to GUIDED, arm and take off to the given altitude",
                json!({
                    "type": "object",
                    "properties": {
                        "altitude": {
                            "type": "number",
                            "description": "Target altitude in metres",
                            "default": DEFAULT_ALTITUDE_M
                        }
                    }
                }),
            ),
            ToolDefinition::new(
                "change_mode",
                "Change the flight mode (e.g. GUIDED, LOITER, RTL)",
                json!({
                    "type": "object",
                    "properties": {
                        "mode": {
                            "type": "string",
                            "description": "Flight mode name, case-insensitive"
                        }
                    },
                    "required": ["mode"]
                }),
            ),
            ToolDefinition::without_params(
                "get_status",
                "Armed state, flight mode and system status",
            ),
            ToolDefinition::without_params(
                "get_position",
                "Global position, altitude, heading and velocity",
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        match name {
            "arm" => ToolResult::text(self.executor.arm().await),
            "disarm" => ToolResult::text(self.executor.disarm().await),
            "takeoff" => match parse::<TakeoffArgs>(name, arguments) {
                Ok(args) => ToolResult::text(self.executor.takeoff(args.altitude).await),
                Err(result) => result,
            },
            "change_mode" => match parse::<ChangeModeArgs>(name, arguments) {
                Ok(args) => ToolResult::text(self.executor.change_mode(&args.mode).await),
                Err(result) => result,
            },
            "get_status" => ToolResult::json(&self.executor.get_status().await),
            "get_position" => ToolResult::json(&self.executor.get_position().await),
            other => ToolResult::error(format!("Unknown tool: {}", other)),
        }
    }
}
