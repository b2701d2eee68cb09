//! Dispatch controller: the single entry point for inbound client payloads.
//!
//! ```text
//! transport ──payload──▶ codec.decode ──envelope──▶ handler[target]
//!                                                      │ reply
//! transport ◀──payload── codec.encode ◀────────────────┘
//! ```
//!
//! Every failure on that path ends here: it gets a correlation id, is logged,
//! and is published as one `Error` message on `activity`. Nothing below this
//! layer publishes errors.

use std::collections::HashMap;
use std::sync::Arc;

use lumy_pipeline::{Backend, WorkflowCatalog};
use lumy_types::messages::MsgError;
use lumy_types::{MessageEnvelope, Target, TargetRegistry};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::codec::{EnvelopeCodec, JsonCodec};
use crate::error::{CodecError, Result, error_chain};
use crate::handler::MessageHandler;
use crate::handlers::{
    activity_handler, data_repository_handler, module_io_handler, notes_handler,
    workflow_handler,
};
use crate::notes::{InMemoryNotesStore, NotesStore};
use crate::publisher::{DEFAULT_MAX_LOG_LEN, Publisher, Transport, truncate};

/// Routes decoded envelopes to per-target handlers.
pub struct DispatchController {
    handlers: HashMap<Target, Arc<dyn MessageHandler>>,
    codec: Arc<dyn EnvelopeCodec>,
    publisher: Publisher,
    backend: Arc<dyn Backend>,
    registry: Arc<TargetRegistry>,
    max_log_len: usize,
}

impl DispatchController {
    pub fn builder(
        backend: Arc<dyn Backend>,
        transport: Arc<dyn Transport>,
    ) -> DispatchControllerBuilder {
        DispatchControllerBuilder {
            backend,
            transport,
            codec: Arc::new(JsonCodec),
            notes: None,
            catalog: WorkflowCatalog::new(),
            registry: None,
            max_log_len: DEFAULT_MAX_LOG_LEN,
        }
    }

    /// Decode a transport payload and dispatch it.
    ///
    /// Never fails: errors are reported on `activity`.
    pub async fn handle_client_message(&self, target: Target, payload: &Value) {
        let decoded = self.codec.decode(payload);
        self.dispatch_decoded(target, decoded, || payload.to_string())
            .await;
    }

    /// Like [`handle_client_message`](Self::handle_client_message), for raw
    /// frame text.
    pub async fn handle_client_text(&self, target: Target, text: &str) {
        let decoded = self.codec.decode_text(text);
        self.dispatch_decoded(target, decoded, || text.to_string())
            .await;
    }

    async fn dispatch_decoded(
        &self,
        target: Target,
        decoded: std::result::Result<Option<MessageEnvelope>, CodecError>,
        raw: impl Fn() -> String,
    ) {
        let envelope = match decoded {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                debug!(target = %target, "No envelope in payload, dropping");
                return;
            }
            Err(e) => {
                self.report_error(target, &e, &raw());
                return;
            }
        };

        let Some(handler) = self.handlers.get(&target) else {
            warn!(target = %target, action = %envelope.action, "No handler for target, dropping");
            return;
        };

        let action = envelope.action.clone();
        match handler.handle(envelope).await {
            Ok(Some(reply)) => self.publish_on_target(target, &reply),
            Ok(None) => {}
            Err(e) => {
                debug!(target = %target, action = %action, "Handler failed");
                self.report_error(target, &e, &raw());
            }
        }
    }

    /// Publish an envelope on a target.
    pub fn publish_on_target(&self, target: Target, envelope: &MessageEnvelope) {
        self.publisher.publish_on_target(target, envelope);
    }

    /// Log `err` under a fresh correlation id and publish it as `Error`.
    fn report_error(&self, target: Target, err: &(dyn std::error::Error + 'static), raw: &str) {
        let id = Uuid::new_v4().to_string();
        let chain = error_chain(err);
        error!(
            correlation_id = %id,
            target = %target,
            raw = %truncate(raw, self.max_log_len),
            "Failed to handle client message: {}",
            chain
        );

        let message = MsgError {
            id: id.clone(),
            message: format!("{err} (error id: {id})"),
            extended_message: Some(chain),
        };
        if let Err(e) = self.publisher.publish(&message) {
            error!(correlation_id = %id, "Failed to publish error message: {}", e);
        }
    }

    /// Targets with a handler, in wire-name order.
    pub fn targets(&self) -> Vec<Target> {
        let mut targets: Vec<Target> = self.handlers.keys().copied().collect();
        targets.sort_by_key(|t| t.as_str());
        targets
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }
}

impl std::fmt::Debug for DispatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchController")
            .field("targets", &self.targets())
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`DispatchController`].
pub struct DispatchControllerBuilder {
    backend: Arc<dyn Backend>,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn EnvelopeCodec>,
    notes: Option<Arc<dyn NotesStore>>,
    catalog: WorkflowCatalog,
    registry: Option<Arc<TargetRegistry>>,
    max_log_len: usize,
}

impl DispatchControllerBuilder {
    pub fn with_codec(mut self, codec: Arc<dyn EnvelopeCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_notes(mut self, notes: Arc<dyn NotesStore>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn with_catalog(mut self, catalog: WorkflowCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TargetRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_max_log_len(mut self, max_log_len: usize) -> Self {
        self.max_log_len = max_log_len;
        self
    }

    /// Build the registry (unless given) and subscribe every handler.
    pub fn build(self) -> Result<DispatchController> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(TargetRegistry::standard()?),
        };
        let publisher = Publisher::new(Arc::clone(&self.codec), self.transport)
            .with_max_log_len(self.max_log_len);
        let notes = self
            .notes
            .unwrap_or_else(|| Arc::new(InMemoryNotesStore::new()));
        let backend = self.backend;

        let handlers: Vec<Arc<dyn MessageHandler>> = vec![
            Arc::new(workflow_handler(
                Arc::clone(&backend),
                self.catalog,
                publisher.clone(),
                Arc::clone(&registry),
            )),
            Arc::new(module_io_handler(
                Arc::clone(&backend),
                publisher.clone(),
                Arc::clone(&registry),
            )),
            Arc::new(data_repository_handler(
                Arc::clone(&backend),
                Arc::clone(&registry),
            )),
            Arc::new(notes_handler(notes, Arc::clone(&registry))),
            Arc::new(activity_handler(
                backend.as_ref(),
                publisher.clone(),
                Arc::clone(&registry),
            )),
        ];

        let handlers: HashMap<Target, Arc<dyn MessageHandler>> = handlers
            .into_iter()
            .map(|handler| (handler.target(), handler))
            .collect();
        for handler in handlers.values() {
            debug!(target = %handler.target(), actions = ?handler.actions(), "Handler ready");
        }
        info!(backend = backend.name(), "Dispatch controller ready");

        Ok(DispatchController {
            handlers,
            codec: self.codec,
            publisher,
            backend,
            registry,
            max_log_len: self.max_log_len,
        })
    }
}
