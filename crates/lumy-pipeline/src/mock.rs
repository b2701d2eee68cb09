//! Engine-less backend.
//!
//! Keeps page I/O values in a plain store keyed by page id. Inputs can only be
//! set for ids the page declares; outputs are whatever [`MockBackend::set_output`]
//! put there. Used for protocol tests and demos.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use lumy_types::{DataTabularDataFilter, LumyWorkflow, Metadata};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::backend::{
    Backend, BackendEvents, ExecuteRequest, IoValue, LoadProgress, WorkflowSource,
    with_processing_state,
};
use crate::catalog::load_workflow_file;
use crate::data_registry::{DataRegistry, InMemoryDataRegistry};
use crate::error::{BackendError, Result};
use crate::mapping::UpdatedIO;
use crate::table::shape_value;

#[derive(Debug, Default)]
struct PageValues {
    inputs: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
}

#[derive(Debug, Default)]
struct MockState {
    workflow: Option<Arc<LumyWorkflow>>,
    metadata: Option<Metadata>,
    pages: HashMap<String, PageValues>,
}

/// Page-level value store with no processing engine.
pub struct MockBackend {
    state: RwLock<MockState>,
    events: BackendEvents,
    registry: Arc<dyn DataRegistry>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MockBackend")
            .field("workflow", &state.workflow.as_ref().map(|w| &w.meta.label))
            .field("pages", &state.pages.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryDataRegistry::new()))
    }
}

impl MockBackend {
    pub fn new(registry: Arc<dyn DataRegistry>) -> Self {
        Self {
            state: RwLock::new(MockState::default()),
            events: BackendEvents::default(),
            registry,
        }
    }

    /// Set a page output and publish the change.
    pub fn set_output(&self, page_id: &str, output_id: &str, value: Value) {
        self.state
            .write()
            .pages
            .entry(page_id.to_string())
            .or_default()
            .outputs
            .insert(output_id.to_string(), value);
        self.events.step_outputs_changed.publish(&UpdatedIO {
            step_id: page_id.to_string(),
            io_ids: vec![output_id.to_string()],
        });
    }

    fn declares_input(&self, page_id: &str, input_id: &str) -> bool {
        let state = self.state.read();
        state
            .workflow
            .as_ref()
            .and_then(|w| w.page(page_id))
            .and_then(|page| page.mapping.as_ref())
            .is_some_and(|mapping| mapping.inputs.iter().any(|b| b.page_io_id == input_id))
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn load_workflow(
        &self,
        source: WorkflowSource,
        metadata: Option<Metadata>,
    ) -> BoxStream<'_, LoadProgress> {
        Box::pin(stream! {
            yield LoadProgress::loading("Loading workflow");
            let (workflow, metadata) = match source {
                WorkflowSource::Path(path) => match load_workflow_file(&path) {
                    Ok(workflow) => {
                        let uri = path.display().to_string();
                        (workflow, metadata.unwrap_or(Metadata { uri: Some(uri) }))
                    }
                    Err(e) => {
                        yield LoadProgress::not_loaded(e.to_string());
                        return;
                    }
                },
                WorkflowSource::Inline(workflow) => (*workflow, metadata.unwrap_or_default()),
            };
            if let Err(e) = workflow.validate() {
                yield LoadProgress::not_loaded(e.to_string());
                return;
            }

            let workflow = Arc::new(workflow);
            *self.state.write() = MockState {
                workflow: Some(Arc::clone(&workflow)),
                metadata: Some(metadata),
                pages: HashMap::new(),
            };
            self.events.workflow_updated.publish(&workflow);
            yield LoadProgress::loaded(format!("Workflow '{}' loaded", workflow.meta.label));
        })
    }

    fn current_workflow(&self) -> Option<Arc<LumyWorkflow>> {
        self.state.read().workflow.clone()
    }

    fn current_metadata(&self) -> Option<Metadata> {
        self.state.read().metadata.clone()
    }

    async fn get_step_input_value(
        &self,
        page_id: &str,
        input_id: &str,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue> {
        let value = self
            .state
            .read()
            .pages
            .get(page_id)
            .and_then(|page| page.inputs.get(input_id))
            .cloned();
        Ok(match value {
            Some(value) => shape_value(Some(value), filter),
            None => IoValue::default(),
        })
    }

    async fn get_step_output_value(
        &self,
        page_id: &str,
        output_id: &str,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue> {
        let value = self
            .state
            .read()
            .pages
            .get(page_id)
            .and_then(|page| page.outputs.get(output_id))
            .cloned();
        Ok(match value {
            Some(value) => shape_value(Some(value), filter),
            None => IoValue::default(),
        })
    }

    async fn update_step_input_values(
        &self,
        page_id: &str,
        values: BTreeMap<String, Value>,
    ) -> Result<Vec<String>> {
        let mut accepted = Vec::new();
        for (input_id, value) in values {
            if !self.declares_input(page_id, &input_id) {
                debug!(page = %page_id, io = %input_id, "Undeclared page input skipped");
                continue;
            }
            if value.is_null() {
                debug!(page = %page_id, io = %input_id, "Null page input skipped");
                continue;
            }
            self.state
                .write()
                .pages
                .entry(page_id.to_string())
                .or_default()
                .inputs
                .insert(input_id.clone(), value);
            accepted.push(input_id);
        }

        if !accepted.is_empty() {
            self.events.step_inputs_changed.publish(&UpdatedIO {
                step_id: page_id.to_string(),
                io_ids: accepted.clone(),
            });
        }
        Ok(accepted)
    }

    async fn run_processing(&self, _page_id: Option<&str>) -> Result<()> {
        with_processing_state(&self.events, async { Ok(()) }).await
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<HashMap<String, String>> {
        Err(BackendError::module_failed(
            request.module_name,
            "the mock backend has no processing engine",
        ))
    }

    fn events(&self) -> &BackendEvents {
        &self.events
    }

    fn data_registry(&self) -> Arc<dyn DataRegistry> {
        Arc::clone(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use lumy_types::messages::{LoadProgressStatus, State};
    use serde_json::json;

    fn workflow() -> LumyWorkflow {
        serde_json::from_value(json!({
            "meta": {"label": "Mock"},
            "processing": {"workflow": {"name": "mock"}},
            "ui": {"pages": [{
                "id": "P",
                "mapping": {"inputs": [{"pageIoId": "a", "workflowIoId": "x"}]}
            }]}
        }))
        .unwrap()
    }

    async fn loaded() -> MockBackend {
        let backend = MockBackend::default();
        let progress: Vec<_> = backend
            .load_workflow(WorkflowSource::Inline(Box::new(workflow())), None)
            .collect()
            .await;
        assert_eq!(progress.last().unwrap().status, LoadProgressStatus::Loaded);
        backend
    }

    #[tokio::test]
    async fn test_only_declared_inputs_are_accepted() {
        let backend = loaded().await;
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let _sub = {
            let seen = Arc::clone(&seen);
            backend
                .events()
                .step_inputs_changed
                .subscribe(move |u: &UpdatedIO| seen.lock().push(u.clone()))
        };

        let accepted = backend
            .update_step_input_values(
                "P",
                BTreeMap::from([("a".into(), json!(1)), ("b".into(), json!(2))]),
            )
            .await
            .unwrap();

        assert_eq!(accepted, vec!["a".to_string()]);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(
            backend.get_step_input_value("P", "a", None).await.unwrap(),
            IoValue::simple(json!(1))
        );
        assert_eq!(
            backend.get_step_input_value("P", "b", None).await.unwrap(),
            IoValue::default()
        );
    }

    #[tokio::test]
    async fn test_null_input_is_skipped() {
        let backend = loaded().await;
        let accepted = backend
            .update_step_input_values("P", BTreeMap::from([("a".into(), Value::Null)]))
            .await
            .unwrap();
        assert!(accepted.is_empty());
        assert_eq!(
            backend.get_step_input_value("P", "a", None).await.unwrap(),
            IoValue::default()
        );
    }

    #[tokio::test]
    async fn test_outputs_and_processing_state() {
        let backend = loaded().await;
        backend.set_output("P", "y", json!("done"));
        assert_eq!(
            backend.get_step_output_value("P", "y", None).await.unwrap(),
            IoValue::simple(json!("done"))
        );

        let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let _sub = {
            let states = Arc::clone(&states);
            backend
                .events()
                .processing_state_changed
                .subscribe(move |s: &State| states.lock().push(*s))
        };
        backend.run_processing(Some("P")).await.unwrap();
        assert_eq!(*states.lock(), vec![State::Busy, State::Idle]);
    }

    #[tokio::test]
    async fn test_execute_fails_without_engine() {
        let backend = MockBackend::default();
        let err = backend
            .execute(ExecuteRequest {
                module_name: "logic.and".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ModuleFailed { .. }));
    }

    #[tokio::test]
    async fn test_debug_shows_loaded_workflow() {
        let backend = loaded().await;
        let rendered = format!("{backend:?}");
        assert!(rendered.starts_with("MockBackend"));
        assert!(rendered.contains("Mock"));
    }
}
