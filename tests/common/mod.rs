#![allow(dead_code)]

use once_cell::sync::Lazy;
use sshgate::errors::ToolError;
use sshgate::managers::ssh::SshManager;
use sshgate::services::logger::Logger;
use sshgate::services::registry::HostRegistry;
use sshgate::services::session::{
    ChannelOutput, Dialer, RemoteChannel, RemoteConnection, ResolvedTarget, SessionManager,
};
use sshgate::services::validation::Validation;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

pub static ENV_LOCK: Lazy<AsyncMutex<()>> = Lazy::new(|| AsyncMutex::new(()));

pub fn tmp_dir(prefix: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()))
}

/// A command as the mock transport saw it.
#[derive(Debug, Clone)]
pub struct SentCommand {
    pub command: String,
    pub stdin: Option<Vec<u8>>,
    pub pty: bool,
}

/// Shared observation point for one dialed connection.
#[derive(Default)]
pub struct MockHandle {
    pub channel_opens: AtomicUsize,
    pub closed: AtomicBool,
    pub sent: Mutex<Vec<SentCommand>>,
    pub responses: Mutex<VecDeque<Result<ChannelOutput, ToolError>>>,
}

impl MockHandle {
    pub fn push_response(&self, response: Result<ChannelOutput, ToolError>) {
        self.responses.lock().expect("responses lock").push_back(response);
    }

    pub fn opens(&self) -> usize {
        self.channel_opens.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn sent_commands(&self) -> Vec<SentCommand> {
        self.sent.lock().expect("sent lock").clone()
    }
}

/// Dialer that records every connection it hands out. Channels answer from a
/// scripted response queue, defaulting to a clean exit with empty output.
#[derive(Default)]
pub struct MockDialer {
    pub handles: Mutex<Vec<Arc<MockHandle>>>,
}

impl MockDialer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handle(&self, index: usize) -> Arc<MockHandle> {
        self.handles.lock().expect("handles lock")[index].clone()
    }

    pub fn last_handle(&self) -> Arc<MockHandle> {
        self.handles
            .lock()
            .expect("handles lock")
            .last()
            .expect("at least one dialed connection")
            .clone()
    }

    pub fn dial_count(&self) -> usize {
        self.handles.lock().expect("handles lock").len()
    }
}

impl Dialer for MockDialer {
    fn dial(&self, _target: &ResolvedTarget) -> Result<Box<dyn RemoteConnection>, ToolError> {
        let handle = Arc::new(MockHandle::default());
        self.handles.lock().expect("handles lock").push(handle.clone());
        Ok(Box::new(MockConnection { handle }))
    }
}

struct MockConnection {
    handle: Arc<MockHandle>,
}

impl RemoteConnection for MockConnection {
    fn open_channel(&mut self, pty: bool) -> Result<Box<dyn RemoteChannel>, ToolError> {
        self.handle.channel_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockChannel {
            handle: self.handle.clone(),
            pty,
        }))
    }

    fn close(&mut self) {
        self.handle.closed.store(true, Ordering::SeqCst);
    }
}

struct MockChannel {
    handle: Arc<MockHandle>,
    pty: bool,
}

impl RemoteChannel for MockChannel {
    fn run(
        &mut self,
        command: &str,
        stdin: Option<Vec<u8>>,
        _timeout: Duration,
    ) -> Result<ChannelOutput, ToolError> {
        self.handle.sent.lock().expect("sent lock").push(SentCommand {
            command: command.to_string(),
            stdin,
            pty: self.pty,
        });
        self.handle
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(Ok(ChannelOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}

pub struct TestStack {
    pub dialer: Arc<MockDialer>,
    pub sessions: Arc<SessionManager>,
    pub manager: SshManager,
}

/// Builds the full manager stack over a mock transport and an in-memory
/// hosts file written to a temp dir.
pub fn stack_with_hosts(hosts_json: &str) -> TestStack {
    let logger = Logger::new("test");
    let dir = tmp_dir("sshgate-test");
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let hosts_path = dir.join("hosts.json");
    std::fs::write(&hosts_path, hosts_json).expect("write hosts file");

    let registry = Arc::new(HostRegistry::load_from(logger.clone(), &hosts_path));
    let dialer = MockDialer::new();
    let sessions = Arc::new(SessionManager::new(
        logger.clone(),
        dialer.clone() as Arc<dyn Dialer>,
    ));
    let manager = SshManager::new(logger, Validation::new(), registry, sessions.clone());
    TestStack {
        dialer,
        sessions,
        manager,
    }
}

pub const VM1_HOSTS: &str = r#"{
  "vm1": {
    "hostname": "10.0.0.5",
    "username": "admin",
    "password": "s3cret",
    "description": "primary test VM"
  },
  "vm2": {
    "hostname": "10.0.0.6"
  }
}"#;
