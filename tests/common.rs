//! Test utilities & fixtures.
//!
//! Sessions are exercised over in-memory duplex pairs where possible; the
//! end-to-end tests use real loopback TCP. Helpers here keep every read
//! bounded so a regression deadlocks a test instead of hanging the suite.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axbridge::bridge::{Governor, Session, SessionSettings};
use axbridge::transport::PacketListener;
use axbridge::validation::Target;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

/// Read deadline for every expectation; generous for CI machines.
pub const READ_DEADLINE: Duration = Duration::from_secs(5);

/// A [`PacketListener`] fed from a channel of pre-made duplex streams, so
/// tests control exactly when callers "arrive".
pub struct ChannelListener {
    rx: mpsc::Receiver<(DuplexStream, Option<String>)>,
}

impl ChannelListener {
    #[allow(dead_code)] // Not every test binary drives a full server.
    pub fn new() -> (mpsc::Sender<(DuplexStream, Option<String>)>, Self) {
        let (tx, rx) = mpsc::channel(8);
        (tx, Self { rx })
    }
}

impl PacketListener for ChannelListener {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<(Self::Stream, Option<String>)> {
        self.rx.recv().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "test listener channel closed")
        })
    }
}

/// The caller's end of a session, with a persistent receive buffer.
///
/// The session writes banner and prompt in separate calls that may or may
/// not coalesce into one chunk on the wire, so expectations must not drop
/// whatever trails the text they matched. `expect` consumes through its
/// needle and keeps the tail buffered for the next expectation.
pub struct TestCaller<S> {
    stream: S,
    buf: String,
}

impl<S> TestCaller<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: String::new(),
        }
    }

    #[allow(dead_code)]
    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream
            .write_all(bytes)
            .await
            .expect("write to session");
    }

    /// Wait until `needle` has arrived (buffered bytes count), returning
    /// everything up to and including it. Bytes after the needle stay
    /// buffered for the next expectation.
    #[allow(dead_code)]
    pub async fn expect(&mut self, needle: &str) -> String {
        let mut chunk = [0u8; 1024];
        loop {
            if let Some(pos) = self.buf.find(needle) {
                let end = pos + needle.len();
                return self.buf.drain(..end).collect();
            }
            let n = tokio::time::timeout(READ_DEADLINE, self.stream.read(&mut chunk))
                .await
                .unwrap_or_else(|_| {
                    panic!("timed out waiting for {needle:?}, buffered {:?}", self.buf)
                })
                .expect("stream read");
            if n == 0 {
                panic!("stream closed waiting for {needle:?}, buffered {:?}", self.buf);
            }
            self.buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    }

    /// Read until EOF, asserting it arrives before the deadline. Anything
    /// still in flight (goodbye lines and the like) is discarded.
    #[allow(dead_code)]
    pub async fn expect_eof(&mut self) {
        let mut chunk = [0u8; 1024];
        loop {
            let n = tokio::time::timeout(READ_DEADLINE, self.stream.read(&mut chunk))
                .await
                .expect("timed out waiting for EOF")
                .expect("stream read");
            if n == 0 {
                return;
            }
        }
    }
}

/// Session settings pointing at the given upstream, with a short connect
/// timeout suitable for tests.
#[allow(dead_code)]
pub fn settings(host: &str, port: u16) -> SessionSettings {
    SessionSettings {
        bbs: Target {
            host: host.to_string(),
            port,
        },
        callsign: "N0CALL".to_string(),
        connect_timeout: Duration::from_secs(5),
    }
}

/// Spawn a session over a fresh duplex pair, returning the far (caller) end
/// and the session task handle.
#[allow(dead_code)]
pub fn spawn_session(
    settings: SessionSettings,
    governor: Arc<Governor>,
) -> (TestCaller<DuplexStream>, tokio::task::JoinHandle<()>) {
    let (far, near) = duplex(4096);
    let session = Session::new(1, near, Some("TEST-1".to_string()), settings, governor);
    let handle = tokio::spawn(session.run());
    (TestCaller::new(far), handle)
}
