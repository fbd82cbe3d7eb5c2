use crate::app::App;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::catalog::{tool_by_name, tool_catalog, validate_tool_args};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "sshgate";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        "SshgateError".to_string(),
        format!("tool: {}", tool),
        format!("kind: {:?}", error.kind).to_lowercase(),
        format!("code: {}", error.code),
        format!("message: {}", error.message),
    ];
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams => McpError::new(ErrorCode::InvalidParams, message),
        ToolErrorKind::Timeout => McpError::new(ErrorCode::RequestTimeout, message),
        ToolErrorKind::Config
        | ToolErrorKind::Connection
        | ToolErrorKind::NotConnected
        | ToolErrorKind::NotFound => McpError::new(ErrorCode::InvalidRequest, message),
        ToolErrorKind::Internal => McpError::new(ErrorCode::InternalError, message),
    }
}

pub struct McpServer {
    app: App,
}

impl McpServer {
    pub fn new() -> Self {
        Self {
            app: App::initialize(),
        }
    }

    async fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })
    }

    async fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_catalog() })
    }

    async fn handle_tools_call(&self, name: &str, args: Value) -> Result<Value, McpError> {
        if tool_by_name(name).is_none() {
            return Err(McpError::new(
                ErrorCode::InvalidParams,
                format!("Unknown tool: {}", name),
            ));
        }
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        validate_tool_args(name, &args)?;
        let result = self
            .app
            .tool_executor
            .execute(name, args)
            .await
            .map_err(|err| map_tool_error(name, &err))?;
        Ok(serde_json::json!({
            "content": [ { "type": "text", "text": serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string()) } ]
        }))
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        self.app.logger.info(
            "Serving MCP over stdio",
            Some(&serde_json::json!({"tools": tool_catalog().len()})),
        );

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|err| ToolError::internal(err.to_string()))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(req) => req,
                Err(_) => {
                    let response = JsonRpcResponse::failure(
                        Value::Null,
                        ErrorCode::ParseError.as_i32(),
                        "Parse error".to_string(),
                    );
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            let response = match request.method.as_str() {
                "notifications/initialized" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, serde_json::json!({}))),
                _ if request.method.starts_with("notifications/") && request.id.is_none() => None,
                "initialize" => match request.id.clone() {
                    Some(id) => Some(JsonRpcResponse::success(id, self.handle_initialize().await)),
                    None => None,
                },
                "tools/list" => match request.id.clone() {
                    Some(id) => Some(JsonRpcResponse::success(id, self.handle_tools_list().await)),
                    None => None,
                },
                "tools/call" => match request.id.clone() {
                    Some(id) => {
                        let params = request.params.as_object().cloned().unwrap_or_default();
                        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                        if name.is_empty() {
                            Some(JsonRpcResponse::failure(
                                id,
                                ErrorCode::InvalidParams.as_i32(),
                                "Missing tool name".to_string(),
                            ))
                        } else {
                            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                            let call = match self.handle_tools_call(name, args).await {
                                Ok(result) => JsonRpcResponse::success(id, result),
                                Err(err) => {
                                    JsonRpcResponse::failure(id, err.code.as_i32(), err.message)
                                }
                            };
                            Some(call)
                        }
                    }
                    None => None,
                },
                _ => request.id.clone().map(|id| {
                    JsonRpcResponse::failure(
                        id,
                        ErrorCode::MethodNotFound.as_i32(),
                        "Method not found".to_string(),
                    )
                }),
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

async fn write_response(
    writer: &mut BufWriter<tokio::io::Stdout>,
    response: &JsonRpcResponse,
) -> Result<(), ToolError> {
    let payload = serde_json::to_string(response).unwrap_or_default();
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let server = McpServer::new();
    server.run_stdio().await
}
