use crate::errors::{ErrorCode, McpError};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for tool in TOOL_CATALOG.iter() {
        if let Ok(schema) = JSONSchema::compile(&tool.input_schema) {
            map.insert(tool.name.clone(), schema);
        }
    }
    map
});

pub fn tool_catalog() -> &'static Vec<ToolDef> {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_CATALOG.iter().find(|tool| tool.name == name)
}

pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    let Some(schema) = TOOL_VALIDATORS.get(tool_name) else {
        return Ok(());
    };
    if let Err(errors) = schema.validate(args) {
        let rendered: Vec<String> = errors.map(|err| err.to_string()).collect();
        return Err(McpError::new(
            ErrorCode::InvalidParams,
            format!(
                "Invalid arguments for {}: {}",
                tool_name,
                rendered.join("; ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_contains_the_five_ssh_tools() {
        let names: Vec<&str> = tool_catalog().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ssh_list_hosts",
                "ssh_connect",
                "ssh_execute",
                "ssh_disconnect",
                "ssh_status"
            ]
        );
    }

    #[test]
    fn execute_schema_requires_command() {
        let err = validate_tool_args("ssh_execute", &serde_json::json!({"confirmed": true}))
            .expect_err("command is required");
        assert!(err.message.contains("ssh_execute"));
    }

    #[test]
    fn execute_schema_accepts_full_arguments() {
        validate_tool_args(
            "ssh_execute",
            &serde_json::json!({"command": "uptime", "confirmed": false, "use_sudo": false}),
        )
        .expect("valid arguments");
    }

    #[test]
    fn connect_schema_rejects_unknown_fields() {
        let result = validate_tool_args(
            "ssh_connect",
            &serde_json::json!({"host": "vm1", "password": "nope"}),
        );
        assert!(result.is_err());
    }
}
