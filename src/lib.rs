//! # Axbridge - Packet Radio to TCP Bridge
//!
//! Axbridge bridges AX.25 packet-radio callers to TCP text services. Each
//! caller gets a small interactive menu to pick a destination (the configured
//! BBS, or any `host[:port]` target) before the bridge starts relaying bytes
//! in both directions until either side closes.
//!
//! ## Features
//!
//! - **Interactive Menu**: Top-level choice plus a local-command mode with
//!   `HELP`, `STATUS`, `BBS`, `CONNECT`, and `EXIT`.
//! - **Arbitrary Targets**: `CONNECT <host>[:port]` with conservative
//!   hostname/port validation before any connect attempt.
//! - **Admission Control**: A process-wide session ceiling; callers over
//!   capacity are told so and disconnected before the menu.
//! - **Bounded Connects**: Outbound connects are resolved and dialed under a
//!   configurable timeout; failures are reported by cause.
//! - **Async Design**: Built with Tokio, one task per session plus two copy
//!   tasks per active relay.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axbridge::bridge::BridgeServer;
//! use axbridge::config::Config;
//! use axbridge::transport::TcpPacketListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let listener = TcpPacketListener::bind(&config.bridge.listen).await?;
//!     let mut server = BridgeServer::new(config, listener);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bridge`] - Core bridge functionality: accept loop, sessions, relay,
//!   admission control
//! - [`transport`] - Inbound listener seam (the packet-radio binding lives
//!   behind the [`transport::PacketListener`] trait)
//! - [`config`] - Configuration management
//! - [`validation`] - Target string validation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   Accept Loop    │ ← admission check, one task per caller
//! └──────────────────┘
//!          │
//! ┌──────────────────┐
//! │   Menu Session   │ ← state machine, outbound connect
//! └──────────────────┘
//!          │
//! ┌──────────────────┐
//! │    Forwarder     │ ← full-duplex byte relay
//! └──────────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod logutil;
pub mod transport;
pub mod validation;
