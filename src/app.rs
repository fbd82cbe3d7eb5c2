use crate::managers::ssh::SshManager;
use crate::mcp::catalog::tool_catalog;
use crate::services::logger::Logger;
use crate::services::registry::HostRegistry;
use crate::services::session::SessionManager;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::transport::SshDialer;
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

/// Explicitly owned application state. Everything is constructed once here
/// and shared by `Arc`; there are no process-wide singletons.
pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    pub fn initialize() -> Self {
        let logger = Logger::new("sshgate");
        let validation = Validation::new();

        let registry = Arc::new(HostRegistry::load(logger.clone()));
        let dialer = Arc::new(SshDialer::new(logger.clone()));
        let sessions = Arc::new(SessionManager::new(logger.clone(), dialer));
        let ssh_manager = Arc::new(SshManager::new(
            logger.clone(),
            validation,
            registry,
            sessions,
        ));

        // Every catalogued tool routes to the SSH manager; registering from
        // the catalog keeps the wiring complete by construction.
        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        for tool in tool_catalog().iter() {
            handlers.insert(tool.name.clone(), ssh_manager.clone() as Arc<dyn ToolHandler>);
        }
        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));

        Self {
            logger,
            tool_executor,
        }
    }
}
