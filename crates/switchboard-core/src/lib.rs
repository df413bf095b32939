//! # switchboard-core
//!
//! Channel membership and broadcast routing for the Switchboard relay.
//!
//! - **Channel** - A named set of member connections
//! - **Router** - The channel table: join, publish, disconnect
//! - **Relay** - Connection lifecycle: turns transport events into router
//!   operations and delivers the results
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐ Event ┌─────────────┐     ┌─────────────┐
//! │  Transport  │──────▶│    Relay    │────▶│   Router    │
//! └─────────────┘       └─────────────┘     └─────────────┘
//!        ▲                     │ Outbound
//!        └─────── Peer::send ──┘
//! ```

pub mod channel;
pub mod message;
pub mod relay;
pub mod router;

pub use channel::{Channel, ChannelId};
pub use message::Outbound;
pub use relay::{Event, Relay, Report};
pub use router::{Router, RouterError, RouterStats};
