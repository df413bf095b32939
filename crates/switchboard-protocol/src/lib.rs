//! # switchboard-protocol
//!
//! Wire protocol definitions for the Switchboard channel relay.
//!
//! Every message is one UTF-8 JSON object tagged by `type`.
//!
//! ## Envelope Kinds
//!
//! - `join` / `message` - Client requests
//! - `system` - Welcome, join confirmations and peer notices
//! - `error` - Rejected requests
//! - `broadcast` - Fan-out of another member's message
//!
//! ## Example
//!
//! ```rust
//! use switchboard_protocol::{codec, Decoded, Request};
//!
//! let text = codec::encode(&Request::join("room1", None)).unwrap();
//! let decoded = codec::decode(text.as_bytes()).unwrap();
//! assert_eq!(decoded, Decoded::Request(Request::join("room1", None)));
//! ```

pub mod codec;
pub mod envelope;

pub use codec::{decode, encode, Decoded, ProtocolError};
pub use envelope::{Kind, Request, Sender, ServerEnvelope, SystemMessage};
