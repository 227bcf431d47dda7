//! Full-duplex byte relay between two open streams.
//!
//! Once a caller has picked a destination the bridge stops interpreting
//! anything: bytes are shuttled verbatim in both directions until either
//! side closes. Connection resets and broken pipes are the normal way these
//! sessions end and are absorbed here, not propagated.

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

/// Read/write chunk size for the relay loops.
const CHUNK_SIZE: usize = 1024;

/// Byte totals for one completed relay, by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayTotals {
    /// Bytes copied from `a` to `b`.
    pub a_to_b: u64,
    /// Bytes copied from `b` to `a`.
    pub b_to_a: u64,
}

/// Relay bytes between `a` and `b` until both directions finish.
///
/// Runs one copy loop per direction concurrently and returns only after both
/// have terminated, so neither stream is touched by a relay task once this
/// returns. Neither stream is closed here; the caller owns teardown and
/// closes each exactly once.
pub async fn forward<A, B>(a: &mut A, b: &mut B) -> RelayTotals
where
    A: AsyncRead + AsyncWrite + Unpin + Send,
    B: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut a_read, mut a_write) = tokio::io::split(a);
    let (mut b_read, mut b_write) = tokio::io::split(b);

    let (a_to_b, b_to_a) = tokio::join!(
        copy_chunks(&mut a_read, &mut b_write, "caller->remote"),
        copy_chunks(&mut b_read, &mut a_write, "remote->caller"),
    );

    RelayTotals { a_to_b, b_to_a }
}

/// Copy `reader` to `writer` in chunks until EOF or a connection-level
/// error. On EOF the write side is shut down so the far end sees the close
/// and the opposite direction can unwind. Returns bytes copied.
async fn copy_chunks<R, W>(reader: &mut ReadHalf<R>, writer: &mut WriteHalf<W>, dir: &str) -> u64
where
    R: AsyncRead + Send,
    W: AsyncWrite + Send,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut copied: u64 = 0;
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("relay {dir}: peer closed after {copied} bytes");
                let _ = writer.shutdown().await;
                break;
            }
            Ok(n) => {
                if let Err(e) = writer.write_all(&buf[..n]).await {
                    debug!("relay {dir}: write ended after {copied} bytes: {e}");
                    break;
                }
                copied += n as u64;
            }
            Err(e) => {
                debug!("relay {dir}: read ended after {copied} bytes: {e}");
                break;
            }
        }
    }
    copied
}
