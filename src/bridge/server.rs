//! The accept loop.
//!
//! [`BridgeServer`] pulls caller connections off the transport listener,
//! asks the [`Governor`] for a slot, and runs each admitted session in its
//! own task. The loop itself never waits on a session: refusals are written
//! from a small spawned task too, so one slow peer cannot stall accepts.
//!
//! Shutdown is cooperative: on ctrl-c the listener stops accepting and the
//! loop returns, while in-flight sessions run to natural completion.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use super::governor::Governor;
use super::session::{refuse_at_capacity, Session, SessionSettings};
use crate::config::Config;
use crate::transport::PacketListener;
use crate::validation::Target;

pub struct BridgeServer<L> {
    config: Config,
    listener: L,
    governor: Arc<Governor>,
    next_session_id: u64,
}

impl<L: PacketListener> BridgeServer<L> {
    pub fn new(config: Config, listener: L) -> Self {
        let governor = Governor::new(config.limits.max_sessions);
        BridgeServer {
            config,
            listener,
            governor,
            next_session_id: 0,
        }
    }

    /// Shared session counters, exposed for status reporting and tests.
    pub fn governor(&self) -> Arc<Governor> {
        Arc::clone(&self.governor)
    }

    fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            bbs: Target {
                host: self.config.upstream.host.clone(),
                port: self.config.upstream.port,
            },
            callsign: self.config.bridge.callsign.clone(),
            connect_timeout: Duration::from_secs(self.config.limits.connect_timeout_secs),
        }
    }

    /// Accept callers until shutdown is requested.
    ///
    /// Each accepted connection is dispatched without awaiting its session;
    /// accept errors are logged and the loop keeps going. Returns once
    /// ctrl-c is received, leaving admitted sessions to finish on their own.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "bridge '{}' listening, upstream BBS {}:{} (max {} sessions)",
            self.config.bridge.callsign,
            self.config.upstream.host,
            self.config.upstream.port,
            self.config.limits.max_sessions
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.dispatch(stream, peer),
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            // Transient accept errors (EMFILE and friends)
                            // should not spin the loop hot.
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }

        info!(
            "listener closed; {} session(s) still active, {} served in total",
            self.governor.active(),
            self.governor.total()
        );
        Ok(())
    }

    /// Admission check plus task spawn for one accepted caller.
    fn dispatch(&mut self, stream: L::Stream, peer: Option<String>) {
        let id = self.next_session_id;
        self.next_session_id += 1;

        match self.governor.try_admit() {
            Some(permit) => {
                let session = Session::new(
                    id,
                    stream,
                    peer,
                    self.session_settings(),
                    Arc::clone(&self.governor),
                );
                tokio::spawn(async move {
                    session.run().await;
                    // Slot held until the session, relay included, is done.
                    drop(permit);
                });
            }
            None => {
                tokio::spawn(async move {
                    refuse_at_capacity(stream, id, peer.as_deref()).await;
                });
            }
        }
    }
}
