//! Connection handlers for the Switchboard server.
//!
//! This module owns the HTTP listener and bridges each WebSocket into
//! relay events.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard_core::{Event, Relay, Report};
use switchboard_transport::{websocket, Outbox};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Body returned to plain HTTP requests on the relay endpoint.
pub const LIVENESS_BODY: &str = "WebSocket relay server running";

/// Server startup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen port is taken, usually by another relay.
    #[error("Port {0} is already in use")]
    PortInUse(u16),

    /// Binding failed for another reason.
    #[error("Failed to bind {host}:{port}: {source}")]
    Bind {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared server state.
pub struct AppState {
    /// The relay. One lock serializes every join, publish and disconnect.
    pub relay: Mutex<Relay<Outbox>>,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            relay: Mutex::new(Relay::new()),
            config,
        }
    }

    /// Apply one event to the relay.
    pub async fn dispatch(&self, event: Event<Outbox>) -> Report {
        let mut relay = self.relay.lock().await;
        let report = relay.handle(event);

        metrics::record_report(&report);
        metrics::set_active_channels(relay.router().stats().channel_count);

        report
    }
}

/// A bound but not yet serving relay.
pub struct RelayServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl RelayServer {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::PortInUse`] if the port is taken and
    /// [`ServerError::Bind`] for any other bind failure.
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AddrInUse => ServerError::PortInUse(config.port),
                _ => ServerError::Bind {
                    host: config.host.clone(),
                    port: config.port,
                    source: e,
                },
            })?;

        Ok(Self {
            listener,
            state: Arc::new(AppState::new(config)),
        })
    }

    /// Get the address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Serve until the process stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        let path = self.state.config.transport.websocket_path.clone();
        let app = app(self.state);

        info!("WebSocket relay server running on port {}", addr.port());
        info!("WebSocket endpoint: ws://{}{}", addr, path);

        axum::serve(self.listener, app).await?;

        Ok(())
    }
}

/// Run the relay server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<(), ServerError> {
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    RelayServer::bind(config).await?.serve().await
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let path = state.config.transport.websocket_path.clone();

    Router::new()
        .route(&path, get(relay_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let relay = state.relay.lock().await;
    let stats = relay.router().stats();

    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": relay.connection_count(),
        "channels": stats.channel_count,
    }))
}

/// Upgrade WebSocket requests; answer anything else as a liveness probe.
async fn relay_handler(
    ws: Option<WebSocketUpgrade>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match ws {
        Some(ws) => ws
            .max_message_size(state.config.limits.max_message_size)
            .on_upgrade(move |socket| handle_websocket(socket, state))
            .into_response(),
        None => LIVENESS_BODY.into_response(),
    }
}

/// Handle a WebSocket connection from open to close.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (outbox, mut inbound) = websocket::accept(socket);
    let connection_id = inbound.id().clone();

    debug!(connection = %connection_id, "WebSocket connected");
    state.dispatch(Event::Opened(outbox)).await;

    loop {
        match inbound.recv().await {
            Ok(Some(raw)) => {
                metrics::record_inbound(raw.len());
                state
                    .dispatch(Event::Received(connection_id.clone(), raw))
                    .await;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "WebSocket receive failed");
                metrics::record_error("websocket");
                break;
            }
        }
    }

    drop(inbound);
    state.dispatch(Event::Closed(connection_id.clone())).await;

    debug!(connection = %connection_id, "WebSocket disconnected");
}
