use crate::constants::network::{SSH_DEFAULT_PORT, SSH_DEFAULT_USERNAME};
use crate::services::logger::Logger;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

fn default_port() -> u16 {
    SSH_DEFAULT_PORT
}

fn default_username() -> String {
    SSH_DEFAULT_USERNAME.to_string()
}

/// One entry of the hosts file. The password stays inside the registry and is
/// only handed out through [`HostRegistry::sudo_password`] and the connect
/// path; listings never carry it.
#[derive(Debug, Clone, Deserialize)]
pub struct HostProfile {
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Secret-free projection of a profile for listings.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HostInfo {
    pub alias: String,
    pub hostname: String,
    pub username: String,
    pub port: u16,
    pub description: String,
}

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn resolve_hosts_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("SSHGATE_HOSTS_PATH").ok()) {
        return path;
    }
    let config_home = normalize_env_path(env::var("XDG_CONFIG_HOME").ok()).or_else(|| {
        env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config"))
    });
    config_home
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sshgate")
        .join("hosts.json")
}

/// Alias-keyed credential table, loaded once at startup and read-only for the
/// process lifetime. A missing or unreadable hosts file means zero hosts
/// configured, never a startup failure.
pub struct HostRegistry {
    hosts: BTreeMap<String, HostProfile>,
}

impl HostRegistry {
    pub fn load(logger: Logger) -> Self {
        Self::load_from(logger, &resolve_hosts_path())
    }

    pub fn load_from(logger: Logger, path: &std::path::Path) -> Self {
        let logger = logger.child("registry");
        let hosts = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, HostProfile>>(&raw) {
                Ok(hosts) => hosts,
                Err(err) => {
                    logger.warn(
                        "Hosts file is not valid JSON, starting with zero hosts",
                        Some(&serde_json::json!({
                            "path": path.display().to_string(),
                            "error": err.to_string(),
                        })),
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => {
                logger.warn(
                    "Hosts file not found, starting with zero hosts",
                    Some(&serde_json::json!({"path": path.display().to_string()})),
                );
                BTreeMap::new()
            }
        };
        logger.info(
            "Loaded host configurations",
            Some(&serde_json::json!({"count": hosts.len()})),
        );
        Self { hosts }
    }

    pub fn lookup(&self, alias: &str) -> Option<&HostProfile> {
        self.hosts.get(alias)
    }

    pub fn sudo_password(&self, alias: &str) -> Option<String> {
        self.hosts.get(alias).and_then(|p| p.password.clone())
    }

    pub fn list(&self) -> Vec<HostInfo> {
        self.hosts
            .iter()
            .map(|(alias, profile)| HostInfo {
                alias: alias.clone(),
                hostname: profile.hostname.clone(),
                username: profile.username.clone(),
                port: profile.port,
                description: profile.description.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults_fill_port_and_username() {
        let profile: HostProfile =
            serde_json::from_str(r#"{"hostname": "10.0.0.5"}"#).expect("must parse");
        assert_eq!(profile.port, 22);
        assert_eq!(profile.username, "root");
        assert!(profile.password.is_none());
        assert!(profile.description.is_empty());
    }

    #[test]
    fn host_info_serializes_without_password_field() {
        let info = HostInfo {
            alias: "vm1".to_string(),
            hostname: "10.0.0.5".to_string(),
            username: "admin".to_string(),
            port: 22,
            description: String::new(),
        };
        let rendered = serde_json::to_string(&info).expect("must serialize");
        assert!(!rendered.contains("password"));
    }
}
