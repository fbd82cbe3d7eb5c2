pub mod network {
    pub const SSH_DEFAULT_PORT: u16 = 22;
    pub const SSH_DEFAULT_USERNAME: &str = "root";
    pub const TIMEOUT_SSH_READY_MS: u64 = 10_000;
    pub const TIMEOUT_SSH_EXEC_MS: u64 = 30_000;
    pub const TIMEOUT_SSH_EXEC_HARD_GRACE_MS: u64 = 2_000;
    pub const KEEPALIVE_INTERVAL_MS: u64 = 30_000;
}

pub mod limits {
    pub const COMMAND_SUBSTRING_LENGTH: usize = 80;
}
