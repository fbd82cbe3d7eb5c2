use crate::constants::limits::COMMAND_SUBSTRING_LENGTH;
use crate::constants::network::{
    SSH_DEFAULT_PORT, SSH_DEFAULT_USERNAME, TIMEOUT_SSH_EXEC_MS, TIMEOUT_SSH_READY_MS,
};
use crate::errors::ToolError;
use crate::services::classifier::{is_destructive, refusal_warning};
use crate::services::logger::Logger;
use crate::services::registry::HostRegistry;
use crate::services::session::{ResolvedTarget, SessionManager};
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SUDO_PROMPT_MARKER: &str = "[sudo]";

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub hostname: String,
    pub command: String,
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub used_sudo: bool,
}

/// The designed non-error outcome of the confirmation gate: the caller must
/// resubmit the same command with `confirmed: true`.
#[derive(Debug, Clone)]
pub struct Refusal {
    pub command: String,
    pub warning: String,
}

/// Tagged outcome of `execute`. A refusal is a successful gate decision, not
/// a failure; hard failures surface as `ToolError`.
#[derive(Debug)]
pub enum ExecOutcome {
    Completed(ExecutionResult),
    Refused(Refusal),
}

struct ExecRequest {
    command: String,
    use_sudo: bool,
}

/// Binds the five SSH control operations: host listing, session lifecycle,
/// and confirmation-gated execution. All blocking remote I/O runs on the
/// blocking thread pool so a slow host cannot starve the serving loop.
pub struct SshManager {
    logger: Logger,
    validation: Validation,
    registry: Arc<HostRegistry>,
    sessions: Arc<SessionManager>,
}

impl SshManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        registry: Arc<HostRegistry>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            logger: logger.child("ssh"),
            validation,
            registry,
            sessions,
        }
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "ssh_list_hosts" => self.list_hosts(),
            "ssh_connect" => self.connect(&args).await,
            "ssh_execute" => self.execute_tool(&args).await,
            "ssh_disconnect" => self.disconnect().await,
            "ssh_status" => self.status(),
            _ => Err(ToolError::not_found(format!("Unknown tool: {}", tool))),
        }
    }

    fn list_hosts(&self) -> Result<Value, ToolError> {
        let hosts = self.registry.list();
        Ok(serde_json::json!({
            "success": true,
            "count": hosts.len(),
            "hosts": hosts,
        }))
    }

    /// A known alias resolves to its profile; anything else is treated as a
    /// literal hostname with defaults and no credential, which `connect`
    /// rejects before dialing.
    fn resolve_target(&self, host: &str) -> ResolvedTarget {
        match self.registry.lookup(host) {
            Some(profile) => ResolvedTarget {
                alias: Some(host.to_string()),
                hostname: profile.hostname.clone(),
                port: profile.port,
                username: profile.username.clone(),
                password: profile.password.clone(),
                description: profile.description.clone(),
                ready_timeout_ms: TIMEOUT_SSH_READY_MS,
            },
            None => ResolvedTarget {
                alias: None,
                hostname: host.to_string(),
                port: SSH_DEFAULT_PORT,
                username: SSH_DEFAULT_USERNAME.to_string(),
                password: None,
                description: String::new(),
                ready_timeout_ms: TIMEOUT_SSH_READY_MS,
            },
        }
    }

    async fn connect(&self, args: &Value) -> Result<Value, ToolError> {
        let host =
            self.validation
                .ensure_string(args.get("host").unwrap_or(&Value::Null), "host", true)?;
        let target = self.resolve_target(&host);
        let sessions = self.sessions.clone();
        let message = tokio::task::spawn_blocking(move || sessions.connect(&target))
            .await
            .map_err(|err| ToolError::internal(format!("Connect task failed: {}", err)))??;
        Ok(serde_json::json!({"success": true, "message": message}))
    }

    async fn execute_tool(&self, args: &Value) -> Result<Value, ToolError> {
        let command = self
            .validation
            .ensure_command(args.get("command").unwrap_or(&Value::Null))?;
        let confirmed = self.validation.ensure_flag(args.get("confirmed"), "confirmed")?;
        let use_sudo = self.validation.ensure_flag(args.get("use_sudo"), "use_sudo")?;
        match self.execute(&command, confirmed, use_sudo).await? {
            ExecOutcome::Refused(refusal) => Ok(serde_json::json!({
                "success": false,
                "destructive": true,
                "command": refusal.command,
                "warning": refusal.warning,
            })),
            ExecOutcome::Completed(result) => serde_json::to_value(&result)
                .map_err(|err| ToolError::internal(format!("Failed to render result: {}", err))),
        }
    }

    /// The confirmation-gated execution path. A destructive command without
    /// `confirmed` is refused before any session access; the gate decision is
    /// made per call, never remembered.
    pub async fn execute(
        &self,
        command: &str,
        confirmed: bool,
        use_sudo: bool,
    ) -> Result<ExecOutcome, ToolError> {
        let command = command.trim().to_string();
        if command.is_empty() {
            return Err(ToolError::invalid_params("command must not be empty"));
        }
        // Auto-detection wins over the caller's flag.
        let use_sudo = use_sudo || is_sudo_prefixed(&command);

        if is_destructive(&command) && !confirmed {
            self.logger.warn(
                "Refusing destructive command without confirmation",
                Some(&serde_json::json!({"command": preview(&command)})),
            );
            return Ok(ExecOutcome::Refused(Refusal {
                warning: refusal_warning(&command),
                command,
            }));
        }

        let sessions = self.sessions.clone();
        let registry = self.registry.clone();
        let request = ExecRequest {
            command: command.clone(),
            use_sudo,
        };
        let result = tokio::task::spawn_blocking(move || exec_once(&sessions, &registry, &request))
            .await
            .map_err(|err| ToolError::internal(format!("Execution task failed: {}", err)))??;
        self.logger.info(
            "Command finished",
            Some(&serde_json::json!({
                "hostname": result.hostname,
                "command": preview(&command),
                "exit_code": result.exit_code,
                "used_sudo": result.used_sudo,
            })),
        );
        Ok(ExecOutcome::Completed(result))
    }

    async fn disconnect(&self) -> Result<Value, ToolError> {
        let sessions = self.sessions.clone();
        let message = tokio::task::spawn_blocking(move || sessions.disconnect())
            .await
            .map_err(|err| ToolError::internal(format!("Disconnect task failed: {}", err)))?;
        Ok(serde_json::json!({"success": true, "message": message}))
    }

    fn status(&self) -> Result<Value, ToolError> {
        serde_json::to_value(self.sessions.status())
            .map_err(|err| ToolError::internal(format!("Failed to render status: {}", err)))
    }
}

#[async_trait]
impl ToolHandler for SshManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        self.handle_tool(tool, args).await
    }
}

fn is_sudo_prefixed(command: &str) -> bool {
    command.split_whitespace().next() == Some("sudo")
}

fn preview(command: &str) -> String {
    command.chars().take(COMMAND_SUBSTRING_LENGTH).collect()
}

/// One channel, one command. The escalation secret comes strictly from the
/// connected alias's profile; a session established from a literal hostname
/// has no alias and runs sudo without injection (the remote side then stalls
/// into the timeout or exits non-zero).
fn exec_once(
    sessions: &SessionManager,
    registry: &HostRegistry,
    request: &ExecRequest,
) -> Result<ExecutionResult, ToolError> {
    let (mut channel, context) = sessions.open_channel(request.use_sudo)?;

    let command_line = if request.use_sudo && !is_sudo_prefixed(&request.command) {
        // -S reads the password from stdin instead of the controlling tty.
        format!("sudo -S {}", request.command)
    } else {
        request.command.clone()
    };
    let stdin = if request.use_sudo {
        context
            .alias
            .as_deref()
            .and_then(|alias| registry.sudo_password(alias))
            .map(|password| format!("{}\n", password).into_bytes())
    } else {
        None
    };

    let output = channel.run(
        &command_line,
        stdin,
        Duration::from_millis(TIMEOUT_SSH_EXEC_MS),
    )?;

    let stdout = if request.use_sudo {
        strip_sudo_prompt(&output.stdout)
    } else {
        output.stdout
    };
    Ok(ExecutionResult {
        hostname: context.hostname,
        command: request.command.clone(),
        exit_code: output.exit_code,
        stdout,
        stderr: output.stderr,
        success: output.exit_code == 0,
        used_sudo: request.use_sudo,
    })
}

/// Drops whole lines carrying the password prompt. A secret echoed elsewhere
/// in the stream is passed through unchanged.
fn strip_sudo_prompt(stdout: &str) -> String {
    if !stdout.contains(SUDO_PROMPT_MARKER) {
        return stdout.to_string();
    }
    stdout
        .split('\n')
        .filter(|line| !line.contains(SUDO_PROMPT_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}
