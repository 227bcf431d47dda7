//! Core bridge functionality: admission control, the per-caller menu
//! session, the byte relay, and the accept loop that ties them together.
//!
//! Data flow for one caller:
//!
//! ```text
//! accept -> Governor (admit?) -> Session (menu) -> connect -> forward
//!                                                              |
//!                     slot released <----- both directions joined
//! ```

pub mod forward;
pub mod governor;
pub mod server;
pub mod session;

pub use forward::{forward, RelayTotals};
pub use governor::{Governor, Permit};
pub use server::BridgeServer;
pub use session::{MenuState, Session, SessionSettings};
