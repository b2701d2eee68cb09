//! [`Backend`] over a [`ProcessingEngine`].
//!
//! The handlers speak page ids; the engine speaks step ids. This backend owns
//! the [`IoMappingEngine`] and translates in both directions: forward on
//! reads and updates, reverse when engine change events are fanned out to
//! page-scoped [`UpdatedIO`](crate::mapping::UpdatedIO) notifications.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use lumy_types::{DataTabularDataFilter, LumyWorkflow, Metadata};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{
    Backend, BackendEvents, ExecuteRequest, IoValue, LoadProgress, WorkflowSource,
    with_processing_state,
};
use crate::catalog::load_workflow_file;
use crate::data_registry::{DataRegistry, table_metadata, value_type_of};
use crate::engine::{EngineIoChanged, ProcessingEngine};
use crate::error::Result;
use crate::events::Subscription;
use crate::mapping::{IoDirection, IoMappingEngine};
use crate::table::shape_value;

#[derive(Default)]
struct Current {
    workflow: Option<Arc<LumyWorkflow>>,
    metadata: Option<Metadata>,
}

/// Backend that drives a processing engine through the page I/O mapping.
pub struct EngineBackend {
    engine: Arc<dyn ProcessingEngine>,
    mapping: Arc<IoMappingEngine>,
    events: Arc<BackendEvents>,
    registry: Arc<dyn DataRegistry>,
    current: RwLock<Current>,
    auto_process: bool,
    _engine_subscriptions: Vec<Subscription>,
}

impl EngineBackend {
    /// Wrap an engine. Engine change events are fanned out from here on.
    pub fn new(engine: Arc<dyn ProcessingEngine>, registry: Arc<dyn DataRegistry>) -> Self {
        let mapping = Arc::new(IoMappingEngine::new());
        let events = Arc::new(BackendEvents::default());

        let subscriptions = vec![
            forward_changes(
                engine.inputs_changed(),
                &mapping,
                &events,
                IoDirection::Input,
            ),
            forward_changes(
                engine.outputs_changed(),
                &mapping,
                &events,
                IoDirection::Output,
            ),
        ];

        Self {
            engine,
            mapping,
            events,
            registry,
            current: RwLock::new(Current::default()),
            auto_process: true,
            _engine_subscriptions: subscriptions,
        }
    }

    /// Run processing after every accepted input update (default on).
    pub fn with_auto_process(mut self, auto_process: bool) -> Self {
        self.auto_process = auto_process;
        self
    }

    /// The mapping engine.
    pub fn mapping(&self) -> &IoMappingEngine {
        &self.mapping
    }

    /// Distinct engine steps bound on a page, in pipeline order.
    fn page_steps(&self, page_id: &str) -> Option<Vec<String>> {
        let snapshot = self.mapping.snapshot();
        let workflow = snapshot.workflow()?;
        let page = workflow.page(page_id)?;
        let mapping = page.mapping.as_ref()?;
        let bound: Vec<&str> = mapping
            .inputs
            .iter()
            .chain(&mapping.outputs)
            .map(|binding| binding.engine_step_id())
            .collect();

        Some(
            workflow
                .processing
                .workflow
                .steps
                .iter()
                .filter(|step| bound.contains(&step.id.as_str()))
                .map(|step| step.id.clone())
                .collect(),
        )
    }

    async fn process_page(&self, page_id: Option<&str>) -> Result<()> {
        let Some(page_id) = page_id else {
            return self.engine.process(None).await;
        };
        let Some(steps) = self.page_steps(page_id) else {
            debug!(page = %page_id, "No bindings for page, nothing to process");
            return Ok(());
        };
        for step in steps {
            self.engine.process(Some(&step)).await?;
        }
        Ok(())
    }

    async fn get_value(
        &self,
        page_id: &str,
        io_id: &str,
        direction: IoDirection,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue> {
        let Some((step_id, engine_io)) = self.mapping.resolve_engine_io(page_id, io_id, direction)
        else {
            return Ok(IoValue::default());
        };
        let value = match direction {
            IoDirection::Input => self.engine.get_input(&step_id, &engine_io)?,
            IoDirection::Output => self.engine.get_output(&step_id, &engine_io)?,
        };
        Ok(shape_value(value, filter))
    }
}

impl std::fmt::Debug for EngineBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBackend")
            .field("engine", &self.engine.name())
            .field("auto_process", &self.auto_process)
            .finish_non_exhaustive()
    }
}

fn forward_changes(
    hub: &crate::events::EventHub<EngineIoChanged>,
    mapping: &Arc<IoMappingEngine>,
    events: &Arc<BackendEvents>,
    direction: IoDirection,
) -> Subscription {
    let mapping = Arc::clone(mapping);
    let events = Arc::clone(events);
    hub.subscribe(move |changed: &EngineIoChanged| {
        let target = match direction {
            IoDirection::Input => &events.step_inputs_changed,
            IoDirection::Output => &events.step_outputs_changed,
        };
        for update in mapping.fan_out(changed, direction) {
            target.publish(&update);
        }
    })
}

#[async_trait]
impl Backend for EngineBackend {
    fn name(&self) -> &'static str {
        "engine"
    }

    fn load_workflow(
        &self,
        source: WorkflowSource,
        metadata: Option<Metadata>,
    ) -> BoxStream<'_, LoadProgress> {
        Box::pin(stream! {
            let (workflow, metadata) = match source {
                WorkflowSource::Path(path) => {
                    yield LoadProgress::loading(format!("Loading workflow from {}", path.display()));
                    match load_workflow_file(&path) {
                        Ok(workflow) => {
                            let metadata = metadata.unwrap_or_else(|| Metadata {
                                uri: Some(path.display().to_string()),
                            });
                            (workflow, metadata)
                        }
                        Err(e) => {
                            warn!("Failed to read workflow {}: {}", path.display(), e);
                            yield LoadProgress::not_loaded(e.to_string());
                            return;
                        }
                    }
                }
                WorkflowSource::Inline(workflow) => {
                    yield LoadProgress::loading(format!("Loading workflow '{}'", workflow.meta.label));
                    (*workflow, metadata.unwrap_or_default())
                }
            };

            if let Err(e) = workflow.validate() {
                yield LoadProgress::not_loaded(e.to_string());
                return;
            }

            yield LoadProgress::loading(format!(
                "Building pipeline '{}'",
                workflow.processing.workflow.name
            ));
            if let Err(e) = self.engine.load(&workflow.processing.workflow).await {
                warn!(engine = self.engine.name(), "Pipeline load failed: {}", e);
                yield LoadProgress::not_loaded(e.to_string());
                return;
            }

            let workflow = Arc::new(workflow);
            self.mapping.rebuild(Arc::clone(&workflow));
            {
                let mut current = self.current.write();
                current.workflow = Some(Arc::clone(&workflow));
                current.metadata = Some(metadata);
            }
            info!(label = %workflow.meta.label, "Workflow loaded");
            self.events.workflow_updated.publish(&workflow);

            if let Err(e) = self.engine.process(None).await {
                debug!("Initial processing failed: {}", e);
            }

            yield LoadProgress::loaded(format!("Workflow '{}' loaded", workflow.meta.label));
        })
    }

    fn current_workflow(&self) -> Option<Arc<LumyWorkflow>> {
        self.current.read().workflow.clone()
    }

    fn current_metadata(&self) -> Option<Metadata> {
        self.current.read().metadata.clone()
    }

    async fn get_step_input_value(
        &self,
        page_id: &str,
        input_id: &str,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue> {
        self.get_value(page_id, input_id, IoDirection::Input, filter)
            .await
    }

    async fn get_step_output_value(
        &self,
        page_id: &str,
        output_id: &str,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue> {
        self.get_value(page_id, output_id, IoDirection::Output, filter)
            .await
    }

    async fn update_step_input_values(
        &self,
        page_id: &str,
        values: BTreeMap<String, Value>,
    ) -> Result<Vec<String>> {
        let mut accepted = Vec::new();
        for (io_id, value) in values {
            let Some((step_id, engine_io)) =
                self.mapping
                    .resolve_engine_io(page_id, &io_id, IoDirection::Input)
            else {
                debug!(page = %page_id, io = %io_id, "Unmapped page input skipped");
                continue;
            };
            if value.is_null() {
                debug!(page = %page_id, io = %io_id, "Null page input skipped");
                continue;
            }
            match self.engine.set_input(&step_id, &engine_io, value)? {
                Some(_) => accepted.push(io_id),
                None => debug!(
                    page = %page_id,
                    io = %io_id,
                    "Connected input skipped"
                ),
            }
        }

        if !accepted.is_empty() && self.auto_process {
            self.run_processing(None).await?;
        }
        Ok(accepted)
    }

    async fn run_processing(&self, page_id: Option<&str>) -> Result<()> {
        with_processing_state(&self.events, self.process_page(page_id)).await
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<HashMap<String, String>> {
        let outputs = self
            .engine
            .execute_module(&request.module_name, request.inputs)
            .await?;
        if !request.save {
            return Ok(HashMap::new());
        }

        let mut saved = HashMap::with_capacity(outputs.len());
        for (output, value) in outputs {
            let label = format!("{}.{}", request.module_name, output);
            let value_type = value_type_of(&value);
            let metadata = table_metadata(&value);
            let id = self.registry.save(&label, value_type, value, metadata);
            saved.insert(output, id);
        }
        Ok(saved)
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
    use crate::data_registry::InMemoryDataRegistry;
    use crate::local::LocalEngine;
    use crate::mapping::UpdatedIO;
    use futures::StreamExt;
    use lumy_types::messages::{LoadProgressStatus, State};
    use serde_json::json;

    fn workflow() -> LumyWorkflow {
        serde_json::from_value(json!({
            "meta": {"label": "Xor"},
            "processing": {"workflow": {
                "name": "xor",
                "inputs": {"x": {"default": false}, "y": {"default": false}},
                "steps": [
                    {"id": "xor", "module": "logic.xor", "inputs": {"a": "__pipeline__.x", "b": "__pipeline__.y"}}
                ]
            }},
            "ui": {"pages": [{
                "id": "P",
                "component": {"id": "p"},
                "mapping": {
                    "inputs": [
                        {"pageIoId": "a", "workflowIoId": "x"},
                        {"pageIoId": "b", "workflowIoId": "b", "workflowStepId": "xor"}
                    ],
                    "outputs": [{"pageIoId": "result", "workflowIoId": "y", "workflowStepId": "xor"}]
                }
            }]}
        }))
        .unwrap()
    }

    fn backend() -> EngineBackend {
        EngineBackend::new(
            Arc::new(LocalEngine::new()),
            Arc::new(InMemoryDataRegistry::new()),
        )
    }

    async fn load(backend: &EngineBackend) -> Vec<LoadProgress> {
        backend
            .load_workflow(WorkflowSource::Inline(Box::new(workflow())), None)
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_load_inline_workflow() {
        let backend = backend();
        let progress = load(&backend).await;
        assert_eq!(progress.last().unwrap().status, LoadProgressStatus::Loaded);
        assert_eq!(backend.current_workflow().unwrap().meta.label, "Xor");
        assert_eq!(backend.current_metadata(), Some(Metadata::default()));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_loaded() {
        let backend = backend();
        let progress: Vec<_> = backend
            .load_workflow(WorkflowSource::Path("/nonexistent/flow.yml".into()), None)
            .collect()
            .await;
        assert_eq!(progress.last().unwrap().status, LoadProgressStatus::NotLoaded);
        assert!(backend.current_workflow().is_none());
    }

    #[tokio::test]
    async fn test_update_translates_and_processes() {
        let backend = backend();
        load(&backend).await;

        let inputs = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let outputs = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let _subs = {
            let (i, o, s) = (Arc::clone(&inputs), Arc::clone(&outputs), Arc::clone(&states));
            vec![
                backend
                    .events()
                    .step_inputs_changed
                    .subscribe(move |u: &UpdatedIO| i.lock().push(u.clone())),
                backend
                    .events()
                    .step_outputs_changed
                    .subscribe(move |u: &UpdatedIO| o.lock().push(u.clone())),
                backend
                    .events()
                    .processing_state_changed
                    .subscribe(move |st: &State| s.lock().push(*st)),
            ]
        };

        let accepted = backend
            .update_step_input_values(
                "P",
                BTreeMap::from([
                    ("a".to_string(), json!(true)),
                    ("missing".to_string(), json!(1)),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(accepted, vec!["a".to_string()]);
        assert_eq!(
            inputs.lock()[0],
            UpdatedIO {
                step_id: "P".into(),
                io_ids: vec!["a".into()]
            }
        );
        assert_eq!(
            *outputs.lock(),
            vec![UpdatedIO {
                step_id: "P".into(),
                io_ids: vec!["result".into()]
            }]
        );
        assert_eq!(*states.lock(), vec![State::Busy, State::Idle]);

        let value = backend
            .get_step_output_value("P", "result", None)
            .await
            .unwrap();
        assert_eq!(value, IoValue::simple(json!(true)));
    }

    #[tokio::test]
    async fn test_null_inputs_are_not_accepted() {
        let backend = backend();
        load(&backend).await;
        backend
            .update_step_input_values("P", BTreeMap::from([("a".to_string(), json!(true))]))
            .await
            .unwrap();

        let accepted = backend
            .update_step_input_values("P", BTreeMap::from([("a".to_string(), Value::Null)]))
            .await
            .unwrap();

        assert!(accepted.is_empty());
        let value = backend.get_step_input_value("P", "a", None).await.unwrap();
        assert_eq!(value, IoValue::simple(json!(true)));
    }

    #[tokio::test]
    async fn test_mapping_miss_yields_empty_value() {
        let backend = backend();
        load(&backend).await;
        let value = backend
            .get_step_input_value("P", "nope", None)
            .await
            .unwrap();
        assert_eq!(value, IoValue::default());
        let value = backend
            .get_step_input_value("Q", "a", None)
            .await
            .unwrap();
        assert_eq!(value, IoValue::default());
    }

    #[tokio::test]
    async fn test_execute_with_save() {
        let backend = backend();
        let saved = backend
            .execute(ExecuteRequest {
                module_name: "math.add".into(),
                inputs: HashMap::from([("a".into(), json!(2)), ("b".into(), json!(3))]),
                save: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let id = &saved["c"];
        let stored = backend.data_registry().get_item_value(id).unwrap();
        assert_eq!(stored.value, json!(5));
        assert_eq!(stored.value_type, "number");

        let unsaved = backend
            .execute(ExecuteRequest {
                module_name: "math.add".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(unsaved.is_empty());
    }
}
