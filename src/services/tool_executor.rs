use crate::errors::ToolError;
use crate::services::logger::Logger;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, tool: &str, args: Value) -> Result<Value, ToolError>;
}

/// Name-to-handler dispatch with per-call duration logging. Handlers are
/// registered once at startup; the map is read-only afterwards.
pub struct ToolExecutor {
    logger: Logger,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers,
        }
    }

    pub fn has_handler(&self, tool: &str) -> bool {
        self.handlers.contains_key(tool)
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        let Some(handler) = self.handlers.get(tool) else {
            return Err(ToolError::not_found(format!("Unknown tool: {}", tool)));
        };
        let started = Instant::now();
        let result = handler.handle(tool, args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => self.logger.debug(
                "Tool call finished",
                Some(&serde_json::json!({"tool": tool, "duration_ms": duration_ms})),
            ),
            Err(err) => self.logger.warn(
                "Tool call failed",
                Some(&serde_json::json!({
                    "tool": tool,
                    "kind": err.kind,
                    "duration_ms": duration_ms,
                })),
            ),
        }
        result
    }
}
