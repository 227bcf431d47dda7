//! Full-path scenarios over loopback TCP: a caller picks the BBS, the
//! relay carries bytes both ways, and teardown propagates.

mod common;

use axbridge::bridge::BridgeServer;
use axbridge::config::Config;
use axbridge::transport::TcpPacketListener;
use common::TestCaller;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Bind a mock upstream service and a bridge in front of it. Returns the
/// bridge's dial address and the upstream listener.
async fn start_bridge(max_sessions: u32) -> (std::net::SocketAddr, TcpListener) {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap();

    let mut config = Config::default();
    config.bridge.listen = "127.0.0.1:0".to_string();
    config.upstream.host = upstream_addr.ip().to_string();
    config.upstream.port = upstream_addr.port();
    config.limits.max_sessions = max_sessions;

    let listener = TcpPacketListener::bind(&config.bridge.listen).await.unwrap();
    let bridge_addr = listener.local_addr().unwrap();
    let mut server = BridgeServer::new(config, listener);
    tokio::spawn(async move { server.run().await });

    (bridge_addr, upstream)
}

#[tokio::test]
async fn option_one_relays_both_directions() {
    let (bridge_addr, upstream) = start_bridge(4).await;

    let mut caller = TestCaller::new(TcpStream::connect(bridge_addr).await.unwrap());
    caller.expect("Choose an option: ").await;
    caller.send(b"1\n").await;

    let (remote, _) = upstream.accept().await.unwrap();
    let mut remote = BufReader::new(remote);

    // The identification banner arrives before any caller payload.
    let mut banner = String::new();
    tokio::io::AsyncBufReadExt::read_line(&mut remote, &mut banner)
        .await
        .unwrap();
    assert!(banner.contains("N0CALL bridge"), "banner was {banner:?}");

    caller.send(b"HELLO\n").await;
    let mut line = String::new();
    tokio::io::AsyncBufReadExt::read_line(&mut remote, &mut line)
        .await
        .unwrap();
    assert_eq!(line, "HELLO\n");

    remote
        .get_mut()
        .write_all(b"WELCOME TO THE BBS\n")
        .await
        .unwrap();
    caller.expect("WELCOME TO THE BBS").await;

    // Upstream hanging up unwinds the whole session within the deadline.
    drop(remote);
    caller.expect_eof().await;
}

#[tokio::test]
async fn local_mode_connect_reaches_arbitrary_target() {
    let (bridge_addr, _default_upstream) = start_bridge(4).await;

    // A second service the caller dials explicitly.
    let other = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let other_addr = other.local_addr().unwrap();

    let mut caller = TestCaller::new(TcpStream::connect(bridge_addr).await.unwrap());
    caller.expect("Choose an option: ").await;
    caller.send(b"2\n").await;
    caller.expect("> ").await;
    caller
        .send(format!("CONNECT {}:{}\n", other_addr.ip(), other_addr.port()).as_bytes())
        .await;
    caller
        .expect(&format!(
            "Connecting to {}:{}...",
            other_addr.ip(),
            other_addr.port()
        ))
        .await;

    let (mut remote, _) = other.accept().await.unwrap();
    let mut first = [0u8; 1024];
    let n = remote.read(&mut first).await.unwrap();
    assert!(String::from_utf8_lossy(&first[..n]).contains("N0CALL bridge"));

    caller.send(b"ping\n").await;
    let mut buf = [0u8; 5];
    remote.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping\n");

    // Caller hangs up; the remote side sees the close.
    drop(caller);
    let mut rest = Vec::new();
    tokio::time::timeout(common::READ_DEADLINE, remote.read_to_end(&mut rest))
        .await
        .expect("remote should see the close")
        .unwrap();
}

#[tokio::test]
async fn refused_target_closes_without_touching_upstream() {
    let (bridge_addr, _upstream) = start_bridge(4).await;

    // Dial a port with nothing listening: connect is refused on loopback.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let mut caller = TestCaller::new(TcpStream::connect(bridge_addr).await.unwrap());
    caller.expect("Choose an option: ").await;
    caller.send(b"2\n").await;
    caller.expect("> ").await;
    caller
        .send(format!("C {}:{}\n", dead_addr.ip(), dead_addr.port()).as_bytes())
        .await;
    caller.expect("Failed to connect").await;
    caller.expect_eof().await;
}
