//! # switchboard-server
//!
//! HTTP/WebSocket front end for the Switchboard relay: configuration,
//! listener, liveness probe and metrics.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod probe;

pub use config::Config;
pub use handlers::{run_server, AppState, RelayServer, ServerError};
