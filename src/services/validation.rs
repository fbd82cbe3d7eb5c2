use crate::errors::ToolError;
use serde_json::Value;

#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(
        &self,
        value: &Value,
        label: &str,
        trim: bool,
    ) -> Result<String, ToolError> {
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a non-empty string", label))
        })?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(if trim {
            normalized.to_string()
        } else {
            text.to_string()
        })
    }

    pub fn ensure_flag(&self, value: Option<&Value>, label: &str) -> Result<bool, ToolError> {
        match value {
            None => Ok(false),
            Some(val) if val.is_null() => Ok(false),
            Some(val) => val.as_bool().ok_or_else(|| {
                ToolError::invalid_params(format!("{} must be a boolean", label))
            }),
        }
    }

    /// Commands are trimmed before classification and transmission; NUL bytes
    /// would truncate the wire string on the remote side.
    pub fn ensure_command(&self, value: &Value) -> Result<String, ToolError> {
        let command = self.ensure_string(value, "command", true)?;
        if command.contains('\0') {
            return Err(ToolError::invalid_params("command contains null bytes"));
        }
        Ok(command)
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}
