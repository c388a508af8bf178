//! MCP stdio server
//!
//! Reads newline-delimited JSON-RPC requests, handles each one on its own
//! task and writes responses through a single writer task. Slow tool calls
//! never hold up other requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{self, Request, RequestId, Response, RpcError};
use crate::tools::{ToolDefinition, ToolResult};
use crate::PROTOCOL_VERSION;

/// Name and version reported in `initialize`
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Implemented by the binary to expose its tools
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    /// Tool catalogue for `tools/list`
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Handle a call to one of the tools returned by [`ToolHandler::tools`]
    async fn call(&self, name: &str, arguments: Value) -> ToolResult;
}

/// MCP Server
pub struct McpServer<H: ToolHandler> {
    handler: Arc<H>,
    info: Arc<ServerInfo>,
    initialized: Arc<AtomicBool>,
}

impl<H: ToolHandler> Clone for McpServer<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            info: self.info.clone(),
            initialized: self.initialized.clone(),
        }
    }
}

impl<H: ToolHandler> McpServer<H> {
    pub fn new(handler: H, info: ServerInfo) -> Self {
        Self {
            handler: Arc::new(handler),
            info: Arc::new(info),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a client has completed `initialize`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Run the server on stdin/stdout until stdin closes
    pub async fn run(&self) -> Result<()> {
        info!("Starting MCP server on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests read from `reader`, writing responses to `writer`
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<Response>();

        let writer_task = tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                let line = match protocol::serialize_response(&response) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Dropping unserializable response");
                        continue;
                    }
                };
                debug!("Sending: {}", line);
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = BufReader::new(reader).lines();
        let mut in_flight = FuturesUnordered::new();

        loop {
            tokio::select! {
                Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Request task failed");
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("EOF received, shutting down");
                        break;
                    };
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("Received: {}", line);

                    let server = self.clone();
                    let response_tx = response_tx.clone();
                    in_flight.push(tokio::spawn(async move {
                        if let Some(response) = server.handle_message(&line).await {
                            let _ = response_tx.send(response);
                        }
                    }));
                }
            }
        }

        while let Some(joined) = in_flight.next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Request task failed");
            }
        }

        drop(response_tx);
        writer_task.await??;
        Ok(())
    }

    /// Handle one line; `None` for notifications
    async fn handle_message(&self, message: &str) -> Option<Response> {
        match protocol::parse_request(message) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => Some(Response::from_error(RequestId::Null, err)),
        }
    }

    async fn handle_request(&self, request: Request) -> Option<Response> {
        let notification = request.is_notification();
        let id = request.id.clone().unwrap_or(RequestId::Null);
        let params = request.params.unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "notifications/initialized" => Response::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            "ping" => Response::success(id, json!({})),
            method => {
                warn!("Unknown method: {}", method);
                Response::from_error(id, RpcError::MethodNotFound(method.to_string()))
            }
        };

        if notification {
            debug!("Notification {} handled", request.method);
            return None;
        }
        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> Response {
        self.initialized.store(true, Ordering::SeqCst);
        info!("MCP server initialized");

        Response::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": self.info.name,
                    "version": self.info.version,
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: RequestId) -> Response {
        Response::success(id, json!({ "tools": self.handler.tools() }))
    }

    async fn handle_tools_call(&self, id: RequestId, params: Value) -> Response {
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return Response::from_error(
                id,
                RpcError::InvalidParams("Missing 'name' field".to_string()),
            );
        };

        if !self.handler.tools().iter().any(|t| t.name == name) {
            return Response::from_error(
                id,
                RpcError::InvalidParams(format!("Unknown tool: {}", name)),
            );
        }

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(args) => args.clone(),
        };

        debug!(tool = %name, "Calling tool with args: {}", arguments);
        let result = self.handler.call(name, arguments).await;

        match serde_json::to_value(result) {
            Ok(value) => Response::success(id, value),
            Err(e) => Response::from_error(id, RpcError::InternalError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    struct TestHandler;

    #[async_trait::async_trait]
    impl ToolHandler for TestHandler {
        fn tools(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::without_params("fast", "answers immediately"),
                ToolDefinition::without_params("slow", "answers after a while"),
            ]
        }

        async fn call(&self, name: &str, _arguments: Value) -> ToolResult {
            if name == "slow" {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            ToolResult::text(name)
        }
    }

    fn server() -> McpServer<TestHandler> {
        McpServer::new(
            TestHandler,
            ServerInfo {
                name: "test-server".into(),
                version: "0.0.1".into(),
            },
        )
    }

    async fn exchange(server: &McpServer<TestHandler>, input: &str) -> Vec<Value> {
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        server.serve(input.as_bytes(), writer).await.unwrap();

        let mut output = String::new();
        reader.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server();
        let responses = exchange(
            &server,
            "{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"params\":{},\"id\":1}\n",
        )
        .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "test-server");
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let responses = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\
             {\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":2}\n",
        )
        .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let responses = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\",\"id\":1}\n",
        )
        .await;

        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let responses = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"method\":\"tools/call\",\"params\":{\"name\":\"nope\"},\"id\":1}\n\
             {\"jsonrpc\":\"2.0\",\"method\":\"unknown/method\",\"id\":2}\n",
        )
        .await;

        let code_for = |id: i64| {
            responses
                .iter()
                .find(|r| r["id"] == id)
                .map(|r| r["error"]["code"].clone())
                .unwrap()
        };
        assert_eq!(code_for(1), -32602);
        assert_eq!(code_for(2), -32601);
    }

    #[tokio::test]
    async fn test_parse_error_answers_with_null_id() {
        let responses = exchange(&server(), "{oops\n").await;
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_does_not_block_fast_call() {
        let responses = exchange(
            &server(),
            "{\"jsonrpc\":\"2.0\",\"method\":\"tools/call\",\"params\":{\"name\":\"slow\"},\"id\":1}\n\
             {\"jsonrpc\":\"2.0\",\"method\":\"tools/call\",\"params\":{\"name\":\"fast\"},\"id\":2}\n",
        )
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[0]["result"]["content"][0]["text"], "fast");
        assert_eq!(responses[1]["id"], 1);
    }
}
