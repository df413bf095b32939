//! # switchboard-transport
//!
//! Transport abstraction layer for the Switchboard relay.
//!
//! The relay core never touches sockets. It talks to connections through
//! the [`Peer`] trait, which offers exactly two operations: `is_open` and a
//! non-blocking `send`.
//!
//! ```rust,ignore
//! use switchboard_transport::websocket;
//!
//! async fn handle(socket: axum::extract::ws::WebSocket) {
//!     let (outbox, mut inbound) = websocket::accept(socket);
//!     // hand `outbox` to the relay
//!     while let Ok(Some(raw)) = inbound.recv().await {
//!         // forward `raw` to the relay
//!     }
//! }
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{ConnectionId, OpenFlag, Outbox, Peer, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::Inbound;
