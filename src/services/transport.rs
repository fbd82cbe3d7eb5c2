use crate::constants::network::{KEEPALIVE_INTERVAL_MS, TIMEOUT_SSH_EXEC_HARD_GRACE_MS};
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::session::{
    ChannelOutput, Dialer, RemoteChannel, RemoteConnection, ResolvedTarget,
};
use base64::Engine;
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

fn map_ssh_error(err: ssh2::Error) -> ToolError {
    let io_err: std::io::Error = err.into();
    match io_err.kind() {
        std::io::ErrorKind::TimedOut => ToolError::timeout("SSH operation timed out"),
        _ => ToolError::connection(format!("SSH error: {}", io_err)),
    }
}

fn fingerprint_host_key_sha256(session: &Session) -> Option<String> {
    let hash = session.host_key_hash(ssh2::HashType::Sha256)?;
    let encoded = base64::engine::general_purpose::STANDARD_NO_PAD.encode(hash);
    Some(format!("SHA256:{}", encoded))
}

/// Password-only SSH dialer. The host key is accepted on first use; its
/// SHA-256 fingerprint is logged so an operator can compare across
/// connections. Public-key and agent authentication are intentionally not
/// attempted, keeping the stored password the single credential path.
pub struct SshDialer {
    logger: Logger,
}

impl SshDialer {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.child("dial"),
        }
    }
}

impl Dialer for SshDialer {
    fn dial(&self, target: &ResolvedTarget) -> Result<Box<dyn RemoteConnection>, ToolError> {
        let ready_timeout = Duration::from_millis(target.ready_timeout_ms);
        let addr = (target.hostname.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|err| {
                ToolError::connection(format!(
                    "Failed to resolve {}:{}: {}",
                    target.hostname, target.port, err
                ))
            })?
            .next()
            .ok_or_else(|| {
                ToolError::connection(format!(
                    "No address found for {}:{}",
                    target.hostname, target.port
                ))
            })?;
        let tcp = TcpStream::connect_timeout(&addr, ready_timeout)
            .map_err(|err| ToolError::connection(format!("Failed to connect SSH: {}", err)))?;
        tcp.set_read_timeout(Some(ready_timeout)).ok();
        tcp.set_write_timeout(Some(ready_timeout)).ok();

        let mut session =
            Session::new().map_err(|_| ToolError::internal("Failed to create SSH session"))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| ToolError::connection(format!("SSH handshake failed: {}", err)))?;

        if let Some(fingerprint) = fingerprint_host_key_sha256(&session) {
            self.logger.info(
                "Accepted host key on first use",
                Some(&serde_json::json!({
                    "hostname": target.hostname,
                    "fingerprint": fingerprint,
                })),
            );
        }

        if let Some(password) = target.password.as_deref() {
            session
                .userauth_password(&target.username, password)
                .map_err(|err| {
                    ToolError::connection(format!("SSH authentication failed: {}", err))
                })?;
        }
        if !session.authenticated() {
            return Err(ToolError::connection("SSH authentication failed"));
        }
        let interval = std::cmp::max(1, (KEEPALIVE_INTERVAL_MS / 1000) as u32);
        session.set_keepalive(true, interval);

        Ok(Box::new(Ssh2Connection { session }))
    }
}

struct Ssh2Connection {
    session: Session,
}

impl RemoteConnection for Ssh2Connection {
    fn open_channel(&mut self, pty: bool) -> Result<Box<dyn RemoteChannel>, ToolError> {
        // A prior exec loop leaves the session non-blocking.
        self.session.set_blocking(true);
        let mut channel = self.session.channel_session().map_err(map_ssh_error)?;
        if pty {
            let _ = channel.request_pty("xterm", None, None);
        }
        Ok(Box::new(Ssh2Channel {
            session: self.session.clone(),
            channel,
        }))
    }

    fn close(&mut self) {
        self.session.set_blocking(true);
        let _ = self
            .session
            .disconnect(None, "closing session", None);
    }
}

struct Ssh2Channel {
    session: Session,
    channel: ssh2::Channel,
}

impl RemoteChannel for Ssh2Channel {
    fn run(
        &mut self,
        command: &str,
        stdin: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<ChannelOutput, ToolError> {
        self.channel.exec(command).map_err(map_ssh_error)?;
        self.session.set_blocking(false);

        let stdin_bytes = stdin;
        let mut stdin_offset = 0usize;
        let mut stdin_done = stdin_bytes.is_none();
        let mut stdout_buf: Vec<u8> = Vec::new();
        let mut stderr_buf: Vec<u8> = Vec::new();
        let started = Instant::now();
        let mut timed_out = false;

        loop {
            let mut progressed = false;
            let mut buf = [0u8; 8192];

            if !stdin_done {
                if let Some(bytes) = stdin_bytes.as_ref() {
                    match self.channel.write(&bytes[stdin_offset..]) {
                        Ok(n) if n > 0 => {
                            stdin_offset = std::cmp::min(stdin_offset + n, bytes.len());
                            progressed = true;
                        }
                        Ok(_) => {}
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                        Err(_) => {
                            stdin_done = true;
                        }
                    }
                    if !stdin_done && stdin_offset >= bytes.len() {
                        let _ = self.channel.send_eof();
                        stdin_done = true;
                    }
                }
            }

            match self.channel.read(&mut buf) {
                Ok(n) if n > 0 => {
                    stdout_buf.extend_from_slice(&buf[..n]);
                    progressed = true;
                }
                Ok(_) => {}
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    self.session.set_blocking(true);
                    return Err(ToolError::connection(format!(
                        "SSH stdout read failed: {}",
                        err
                    )));
                }
            }
            match self.channel.stderr().read(&mut buf) {
                Ok(n) if n > 0 => {
                    stderr_buf.extend_from_slice(&buf[..n]);
                    progressed = true;
                }
                Ok(_) => {}
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    self.session.set_blocking(true);
                    return Err(ToolError::connection(format!(
                        "SSH stderr read failed: {}",
                        err
                    )));
                }
            }

            if self.channel.eof() {
                break;
            }
            if started.elapsed() > timeout {
                timed_out = true;
                break;
            }
            if !progressed {
                std::thread::sleep(Duration::from_millis(20));
            }
        }

        if timed_out {
            // Invalidate this channel only; the session stays usable.
            let _ = self.channel.close();
            let deadline =
                Instant::now() + Duration::from_millis(TIMEOUT_SSH_EXEC_HARD_GRACE_MS);
            while Instant::now() < deadline && !self.channel.eof() {
                std::thread::sleep(Duration::from_millis(20));
            }
            self.session.set_blocking(true);
            return Err(ToolError::timeout(format!(
                "Remote command exceeded {}ms",
                timeout.as_millis()
            )));
        }

        let _ = self.channel.wait_close();
        let exit_code = i64::from(self.channel.exit_status().unwrap_or(-1));
        self.session.set_blocking(true);

        Ok(ChannelOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout_buf).to_string(),
            stderr: String::from_utf8_lossy(&stderr_buf).to_string(),
        })
    }
}
