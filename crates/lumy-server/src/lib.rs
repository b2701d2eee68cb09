//! Message dispatch and transports for the Lumy middleware.
//!
//! Inbound payloads enter through a transport, are decoded by an
//! [`EnvelopeCodec`], routed by the [`DispatchController`] to the handler of
//! their target, and answered on the same target. Backend events are pushed
//! by the handlers that subscribed to them.
//!
//! ```text
//!            ┌──────────────── DispatchController ────────────────┐
//! client ──▶ │ codec ─▶ handlers[target] ─▶ Backend (lumy-pipeline) │
//!        ◀── │ codec ◀─ Publisher ◀──────── backend event hubs      │
//!            └─────────────────────────────────────────────────────┘
//! ```
//!
//! Two transports are provided: [`StandaloneClient`] (in-memory, same
//! process) and the axum WebSocket [`Server`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumy_pipeline::{MockBackend, WorkflowCatalog};
//! use lumy_server::{AppState, Server, ServerConfig};
//!
//! let state = AppState::new(Arc::new(MockBackend::default()), WorkflowCatalog::new(), ServerConfig::new())?;
//! Server::new(state).run().await?;
//! ```

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod notes;
pub mod publisher;
pub mod routes;
pub mod standalone;
pub mod state;

pub use codec::{EnvelopeCodec, JsonCodec, Sender, StandaloneCodec};
pub use config::ServerConfig;
pub use controller::{DispatchController, DispatchControllerBuilder};
pub use error::{CodecError, HandlerError, HandlerResult, Result, ServerError, error_chain};
pub use handler::{Handler, HandlerBuilder, MessageHandler, Reply, reply};
pub use notes::{InMemoryNotesStore, NotesStore};
pub use publisher::{Publisher, Transport};
pub use routes::WsTransport;
pub use standalone::{StandaloneClient, StandaloneSubscription, StandaloneTransport};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Lumy HTTP/WebSocket server.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .route("/ws/{target}", get(routes::ws_handler))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                routes::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let router = self.router();
        if let Ok(addr) = listener.local_addr() {
            info!(
                "Serving targets {:?} on ws://{}/ws/{{target}}",
                self.state.controller.targets(),
                addr
            );
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
