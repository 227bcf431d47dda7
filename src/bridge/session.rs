//! # Caller Session Management
//!
//! One [`Session`] per accepted inbound connection. The session walks the
//! caller through a small menu, dials the chosen destination, and hands both
//! streams to the relay. All state transitions are driven by bytes read from
//! the inbound stream; nothing outside the session task touches it.
//!
//! ## Session Lifecycle
//!
//! 1. **TopLevel** - the welcome menu (`1` = BBS, `2` = local commands)
//! 2. **LocalCommands** - `HELP`, `STATUS`, `BBS`, `CONNECT <host>[:port]`,
//!    `EXIT`
//! 3. **ForwardingBbs** / **ForwardingRemote** - outbound connect, then the
//!    relay runs until either side closes
//! 4. **ExitConfirm** - y/n confirmation before disconnect
//! 5. **Closed** - terminal; both streams torn down exactly once
//!
//! A caller that sends nothing, garbage, or vanishes mid-menu ends up in
//! `Closed` the same way an explicit disconnect does. Inbound I/O failures
//! are ordinary session ends, logged at debug and never surfaced as faults.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::forward::forward;
use super::governor::Governor;
use crate::logutil::escape_log;
use crate::validation::{validate_target, Target};

/// Largest single menu read. Matches the relay chunk size; menu lines are
/// a handful of bytes in practice.
const MAX_INPUT: usize = 1024;

const TOP_MENU: &str = "Welcome to the AX.25 Bridge\n\n\
                        1. Connect to BBS\n\
                        2. Local Commands\n\n\
                        Choose an option: ";

const LOCAL_BANNER: &str = "Local mode. Type HELP for commands.\n";

const HELP_TEXT: &str = "Commands:\n\
                         HELP - Show this help\n\
                         STATUS - Show bridge status\n\
                         BBS - Connect to BBS\n\
                         CONNECT <host>[:port] - Connect to any telnet server\n\
                         EXIT - Disconnect\n";

const PROMPT: &str = "> ";
const EXIT_PROMPT: &str = "Are you sure you want to exit the bridge? (y/n): ";
const GOODBYE: &str = "Goodbye\n";
const EXIT_CANCELLED: &str = "Exit cancelled\n";
const UNKNOWN_COMMAND: &str = "Unknown command. Type HELP for help.\n";
const INVALID_CHOICE: &str = "Invalid choice. Disconnecting.\n";

const ERR_TIMEOUT: &str = "Connection timed out\n";
const ERR_HOST_NOT_FOUND: &str = "Host not found\n";
const ERR_CONNECT_FAILED: &str = "Failed to connect\n";

/// Menu position. One per session; transitions come only from inbound data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuState {
    TopLevel,
    LocalCommands,
    ForwardingBbs,
    ForwardingRemote(Target),
    ExitConfirm,
    Closed,
}

/// Why an outbound connect attempt did not produce a stream.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection timed out")]
    Timeout,
    #[error("host not found")]
    HostNotFound,
    #[error("failed to connect: {0}")]
    Failed(#[from] std::io::Error),
}

/// Tunables a session needs from the configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// The default destination (menu option 1 / `BBS`).
    pub bbs: Target,
    /// Station callsign, used in the identification banner.
    pub callsign: String,
    /// Outbound connect timeout (resolution + dial).
    pub connect_timeout: Duration,
}

/// One accepted inbound connection and its lifecycle.
pub struct Session<S> {
    id: u64,
    stream: S,
    peer: Option<String>,
    state: MenuState,
    started: DateTime<Utc>,
    settings: SessionSettings,
    governor: Arc<Governor>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        id: u64,
        stream: S,
        peer: Option<String>,
        settings: SessionSettings,
        governor: Arc<Governor>,
    ) -> Self {
        Session {
            id,
            stream,
            peer,
            state: MenuState::TopLevel,
            started: Utc::now(),
            settings,
            governor,
        }
    }

    fn peer_label(&self) -> &str {
        self.peer.as_deref().unwrap_or("unknown")
    }

    /// Drive the session to completion and tear the inbound stream down.
    ///
    /// Never returns an error: inbound I/O failures mean the caller went
    /// away, which is a normal way for a session to end.
    pub async fn run(mut self) {
        info!("session {}: connected from {}", self.id, self.peer_label());

        if let Err(e) = self.drive().await {
            debug!("session {}: inbound stream ended: {}", self.id, e);
        }

        // Sole close of the inbound stream, on every path.
        let _ = self.stream.shutdown().await;
        let duration = Utc::now() - self.started;
        info!(
            "session {}: closed after {}s",
            self.id,
            duration.num_seconds()
        );
    }

    /// The state-machine loop. An `Err` here always means the inbound
    /// stream failed or closed; `run` turns that into a normal session end.
    async fn drive(&mut self) -> std::io::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, MenuState::Closed) {
                MenuState::TopLevel => self.top_level().await?,
                MenuState::LocalCommands => self.local_commands().await?,
                MenuState::ExitConfirm => self.exit_confirm().await?,
                MenuState::ForwardingBbs => {
                    let bbs = self.settings.bbs.clone();
                    self.bridge_to(&bbs).await?
                }
                MenuState::ForwardingRemote(target) => self.bridge_to(&target).await?,
                MenuState::Closed => return Ok(()),
            };
        }
    }

    async fn top_level(&mut self) -> std::io::Result<MenuState> {
        self.send(TOP_MENU).await?;
        let Some(line) = self.read_line().await? else {
            return Ok(MenuState::Closed);
        };
        match line.to_ascii_uppercase().as_str() {
            "1" | "BBS" | "CONNECT" | "C" => Ok(MenuState::ForwardingBbs),
            "2" | "LOCAL" | "L" => {
                self.send(LOCAL_BANNER).await?;
                Ok(MenuState::LocalCommands)
            }
            _ => {
                debug!(
                    "session {}: invalid menu choice {:?}",
                    self.id,
                    escape_log(&line)
                );
                self.send(INVALID_CHOICE).await?;
                Ok(MenuState::Closed)
            }
        }
    }

    async fn local_commands(&mut self) -> std::io::Result<MenuState> {
        self.send(PROMPT).await?;
        let Some(line) = self.read_line().await? else {
            return Ok(MenuState::Closed);
        };
        let upper = line.to_ascii_uppercase();
        let (command, rest) = match upper.split_once(char::is_whitespace) {
            Some((command, _)) => {
                // Argument taken from the line as typed, not the uppercased copy.
                let rest = line[command.len()..].trim();
                (command, rest)
            }
            None => (upper.as_str(), ""),
        };

        match command {
            "HELP" | "H" | "?" => {
                self.send(HELP_TEXT).await?;
                Ok(MenuState::LocalCommands)
            }
            "STATUS" | "S" => {
                let status = format!(
                    "Bridge status: Running\n\
                     Active connections: {}\n\
                     Total sessions: {}\n",
                    self.governor.active(),
                    self.governor.total()
                );
                self.send(&status).await?;
                Ok(MenuState::LocalCommands)
            }
            "BBS" | "B" => {
                self.send("Connecting to BBS...\n").await?;
                Ok(MenuState::ForwardingBbs)
            }
            "CONNECT" | "C" => match validate_target(rest) {
                Ok(target) => {
                    self.send(&format!("Connecting to {}...\n", target)).await?;
                    Ok(MenuState::ForwardingRemote(target))
                }
                Err(reason) => {
                    debug!(
                        "session {}: rejected target {:?}: {}",
                        self.id,
                        escape_log(rest),
                        reason
                    );
                    self.send(&format!("{}\n", reason)).await?;
                    Ok(MenuState::LocalCommands)
                }
            },
            "EXIT" | "E" | "QUIT" | "Q" => {
                self.send(EXIT_PROMPT).await?;
                Ok(MenuState::ExitConfirm)
            }
            _ => {
                debug!(
                    "session {}: unknown command {:?}",
                    self.id,
                    escape_log(&line)
                );
                self.send(UNKNOWN_COMMAND).await?;
                Ok(MenuState::LocalCommands)
            }
        }
    }

    async fn exit_confirm(&mut self) -> std::io::Result<MenuState> {
        let Some(line) = self.read_line().await? else {
            return Ok(MenuState::Closed);
        };
        match line.to_ascii_uppercase().as_str() {
            "Y" | "YES" => {
                self.send(GOODBYE).await?;
                Ok(MenuState::Closed)
            }
            _ => {
                self.send(EXIT_CANCELLED).await?;
                Ok(MenuState::LocalCommands)
            }
        }
    }

    /// Connect to `target` and relay until either side closes.
    ///
    /// The outbound stream is scoped to this call: opened once, shut down
    /// exactly once on every path out, and gone by the time we return.
    async fn bridge_to(&mut self, target: &Target) -> std::io::Result<MenuState> {
        let mut outbound = match self.connect(target).await {
            Ok(stream) => stream,
            Err(e) => {
                info!("session {}: connect to {} failed: {}", self.id, target, e);
                let line = match e {
                    ConnectError::Timeout => ERR_TIMEOUT,
                    ConnectError::HostNotFound => ERR_HOST_NOT_FOUND,
                    ConnectError::Failed(_) => ERR_CONNECT_FAILED,
                };
                self.send(line).await?;
                return Ok(MenuState::Closed);
            }
        };

        // Identification banner to the destination, ahead of any caller
        // payload. Best-effort: the relay starts regardless.
        let banner = match &self.peer {
            Some(peer) => format!(
                "*** {} bridge: incoming connection from {} ***\n",
                self.settings.callsign, peer
            ),
            None => format!("*** {} bridge: incoming connection ***\n", self.settings.callsign),
        };
        if let Err(e) = outbound.write_all(banner.as_bytes()).await {
            debug!("session {}: banner write failed: {}", self.id, e);
        }

        info!("session {}: bridged to {}", self.id, target);
        let totals = forward(&mut self.stream, &mut outbound).await;
        info!(
            "session {}: relay to {} finished ({} bytes out, {} bytes in)",
            self.id, target, totals.a_to_b, totals.b_to_a
        );

        // Sole close of the outbound stream.
        let _ = outbound.shutdown().await;
        Ok(MenuState::Closed)
    }

    /// Resolve and dial `target` under the configured timeout, mapping
    /// failures onto the caller-facing taxonomy: resolution failures are
    /// "host not found", dial errors are "failed to connect", and the
    /// deadline covers both steps.
    async fn connect(&mut self, target: &Target) -> Result<TcpStream, ConnectError> {
        let attempt = async {
            let mut addrs = tokio::net::lookup_host((target.host.as_str(), target.port))
                .await
                .map_err(|e| {
                    debug!("session {}: lookup {} failed: {}", self.id, target.host, e);
                    ConnectError::HostNotFound
                })?;
            let addr = addrs.next().ok_or(ConnectError::HostNotFound)?;
            let stream = TcpStream::connect(addr).await?;
            Ok(stream)
        };
        match tokio::time::timeout(self.settings.connect_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout),
        }
    }

    async fn send(&mut self, text: &str) -> std::io::Result<()> {
        self.stream.write_all(text.as_bytes()).await
    }

    /// Read one chunk of caller input, trimmed. `None` means the caller
    /// closed the stream. Input that is not valid UTF-8 is taken lossily,
    /// mirroring how the menu treats any unrecognized text.
    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = [0u8; MAX_INPUT];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        Ok(Some(text))
    }
}

/// Refuse a caller over the session ceiling: one fixed line, then close.
/// Runs before any menu interaction.
pub async fn refuse_at_capacity<S>(mut stream: S, id: u64, peer: Option<&str>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    warn!(
        "session {}: refused at capacity (peer {})",
        id,
        peer.unwrap_or("unknown")
    );
    let _ = stream
        .write_all(b"Bridge at capacity. Try again later.\n")
        .await;
    let _ = stream.shutdown().await;
}
