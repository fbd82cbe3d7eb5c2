use crate::errors::ToolError;
use crate::services::logger::Logger;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fully resolved connection target. Built by the manager layer from a
/// registry profile, or from a literal hostname with defaults (the literal
/// path carries no password and is rejected before dialing).
#[derive(Clone)]
pub struct ResolvedTarget {
    pub alias: Option<String>,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub description: String,
    pub ready_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ChannelOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

/// One command execution on an established connection. Implementations issue
/// the command, write `stdin` (followed by EOF) into the remote input stream,
/// and block until the exit status arrives or `timeout` elapses.
pub trait RemoteChannel: Send {
    fn run(
        &mut self,
        command: &str,
        stdin: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<ChannelOutput, ToolError>;
}

pub trait RemoteConnection: Send {
    fn open_channel(&mut self, pty: bool) -> Result<Box<dyn RemoteChannel>, ToolError>;
    fn close(&mut self);
}

pub trait Dialer: Send + Sync {
    fn dial(&self, target: &ResolvedTarget) -> Result<Box<dyn RemoteConnection>, ToolError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Snapshot of the session identity taken at channel-open time, under the
/// same lock as the connectivity check.
pub struct ChannelContext {
    pub alias: Option<String>,
    pub hostname: String,
}

struct ActiveSession {
    alias: Option<String>,
    hostname: String,
    connection: Box<dyn RemoteConnection>,
}

impl ActiveSession {
    fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.hostname)
    }
}

/// Owner of the single process-wide remote connection. Every state
/// transition (connect, disconnect, the connectivity check inside
/// channel-open) happens under one mutex; channel I/O itself runs after the
/// lock is released. All methods block, so async callers drive them through
/// `tokio::task::spawn_blocking`.
pub struct SessionManager {
    logger: Logger,
    dialer: Arc<dyn Dialer>,
    state: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(logger: Logger, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            logger: logger.child("session"),
            dialer,
            state: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveSession>> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Establishes the session, replacing (and closing) any previous one.
    /// The dial happens outside the lock; a failed dial leaves an existing
    /// session untouched.
    pub fn connect(&self, target: &ResolvedTarget) -> Result<String, ToolError> {
        if target.password.as_deref().map_or(true, str::is_empty) {
            let shown = target.alias.as_deref().unwrap_or(&target.hostname);
            return Err(ToolError::config(format!(
                "no credential for host '{}'",
                shown
            ))
            .with_hint("Add a password for this alias to the hosts file.".to_string()));
        }

        let connection = self.dialer.dial(target)?;

        let mut guard = self.lock();
        if let Some(mut previous) = guard.take() {
            self.logger.info(
                "Closing previous connection before replacing it",
                Some(&serde_json::json!({"host": previous.display_name()})),
            );
            previous.connection.close();
        }
        *guard = Some(ActiveSession {
            alias: target.alias.clone(),
            hostname: target.hostname.clone(),
            connection,
        });
        drop(guard);

        let shown = target.alias.as_deref().unwrap_or(&target.hostname);
        let mut message = format!("Successfully connected to {}", shown);
        if !target.description.is_empty() {
            message.push_str(&format!(" ({})", target.description));
        }
        self.logger.info(
            &message,
            Some(&serde_json::json!({"hostname": target.hostname, "port": target.port})),
        );
        Ok(message)
    }

    /// Idempotent. Names the host on the first call, reports a no-op after.
    pub fn disconnect(&self) -> String {
        let mut guard = self.lock();
        match guard.take() {
            Some(mut active) => {
                active.connection.close();
                let message = format!("Disconnected from {}", active.display_name());
                drop(guard);
                self.logger.info(&message, None);
                message
            }
            None => "No active connection".to_string(),
        }
    }

    pub fn status(&self) -> SessionInfo {
        let guard = self.lock();
        match guard.as_ref() {
            Some(active) => SessionInfo {
                connected: true,
                alias: active.alias.clone(),
                hostname: Some(active.hostname.clone()),
            },
            None => SessionInfo {
                connected: false,
                alias: None,
                hostname: None,
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Opens exactly one channel on the live connection, or fails with
    /// `NotConnected`. The returned channel owns its transport handle, so a
    /// later disconnect invalidates it without racing this call.
    pub fn open_channel(
        &self,
        pty: bool,
    ) -> Result<(Box<dyn RemoteChannel>, ChannelContext), ToolError> {
        let mut guard = self.lock();
        let active = guard.as_mut().ok_or_else(|| {
            ToolError::not_connected("Not connected to any host")
                .with_hint("Connect to a host first with ssh_connect.".to_string())
        })?;
        let channel = active.connection.open_channel(pty)?;
        let context = ChannelContext {
            alias: active.alias.clone(),
            hostname: active.hostname.clone(),
        };
        Ok((channel, context))
    }
}
