//! Application state shared across routes.

use std::sync::Arc;

use lumy_pipeline::{Backend, WorkflowCatalog};

use crate::config::ServerConfig;
use crate::controller::DispatchController;
use crate::error::Result;
use crate::notes::NotesStore;
use crate::routes::ws::WsTransport;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Routes inbound frames to handlers.
    pub controller: Arc<DispatchController>,

    /// Fans outbound frames out to sockets.
    pub transport: Arc<WsTransport>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the controller over `backend` with a WebSocket transport.
    pub fn new(
        backend: Arc<dyn Backend>,
        catalog: WorkflowCatalog,
        config: ServerConfig,
    ) -> Result<Self> {
        Self::builder(backend, catalog, config).build()
    }

    pub fn builder(
        backend: Arc<dyn Backend>,
        catalog: WorkflowCatalog,
        config: ServerConfig,
    ) -> AppStateBuilder {
        AppStateBuilder {
            backend,
            catalog,
            config,
            notes: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Builder for [`AppState`].
pub struct AppStateBuilder {
    backend: Arc<dyn Backend>,
    catalog: WorkflowCatalog,
    config: ServerConfig,
    notes: Option<Arc<dyn NotesStore>>,
}

impl AppStateBuilder {
    pub fn with_notes(mut self, notes: Arc<dyn NotesStore>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn build(self) -> Result<AppState> {
        let transport = Arc::new(WsTransport::new(self.config.channel_capacity));
        let mut builder = DispatchController::builder(self.backend, transport.clone())
            .with_catalog(self.catalog)
            .with_max_log_len(self.config.max_log_len);
        if let Some(notes) = self.notes {
            builder = builder.with_notes(notes);
        }
        Ok(AppState {
            controller: Arc::new(builder.build()?),
            transport,
            config: Arc::new(self.config),
        })
    }
}
