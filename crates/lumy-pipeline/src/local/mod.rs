//! In-process processing engine.
//!
//! Runs a pipeline as an ordered list of steps. Every step input is wired
//! either to a pipeline input (`__pipeline__.<input>`) or to an output of an
//! earlier step (`<step>.<output>`); steps run in declaration order.

mod modules;

pub use modules::BuiltinModule;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use lumy_types::{PIPELINE_ID, PipelineDefinition, PipelineInput};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::engine::{EngineIoChanged, ProcessingEngine};
use crate::error::{BackendError, Result};
use crate::events::EventHub;

/// Where a step input reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Pipeline(String),
    Step { step: String, output: String },
}

impl Source {
    fn parse(source: &str) -> Option<Self> {
        let (step, io) = source.split_once('.')?;
        if step.is_empty() || io.is_empty() {
            return None;
        }
        Some(if step == PIPELINE_ID {
            Source::Pipeline(io.to_string())
        } else {
            Source::Step {
                step: step.to_string(),
                output: io.to_string(),
            }
        })
    }
}

#[derive(Debug, Clone)]
struct LoadedStep {
    id: String,
    module: BuiltinModule,
    wiring: BTreeMap<String, Source>,
}

#[derive(Debug, Default)]
struct Pipeline {
    inputs: BTreeMap<String, PipelineInput>,
    steps: Vec<LoadedStep>,
    pipeline_values: HashMap<String, Value>,
    outputs: HashMap<String, HashMap<String, Value>>,
}

impl Pipeline {
    fn build(definition: &PipelineDefinition) -> Result<Self> {
        let mut steps: Vec<LoadedStep> = Vec::with_capacity(definition.steps.len());
        let mut seen: HashMap<&str, BuiltinModule> = HashMap::new();

        for step in &definition.steps {
            let module = BuiltinModule::from_name(&step.module)
                .ok_or_else(|| BackendError::UnknownModule(step.module.clone()))?;

            let mut wiring = BTreeMap::new();
            for (input, raw) in &step.inputs {
                if !module.inputs().contains(&input.as_str()) {
                    return Err(BackendError::InvalidWorkflow(format!(
                        "Step '{}' ({}) has no input '{}'",
                        step.id,
                        module.name(),
                        input
                    )));
                }
                let source = Source::parse(raw).ok_or_else(|| {
                    BackendError::InvalidWorkflow(format!(
                        "Step '{}' input '{}' has malformed source '{}'",
                        step.id, input, raw
                    ))
                })?;
                let known = match &source {
                    Source::Pipeline(name) => definition.inputs.contains_key(name),
                    Source::Step { step, output } => seen
                        .get(step.as_str())
                        .is_some_and(|m| m.outputs().contains(&output.as_str())),
                };
                if !known {
                    return Err(BackendError::InvalidWorkflow(format!(
                        "Step '{}' input '{}' reads from unknown source '{}'",
                        step.id, input, raw
                    )));
                }
                wiring.insert(input.clone(), source);
            }

            seen.insert(step.id.as_str(), module);
            steps.push(LoadedStep {
                id: step.id.clone(),
                module,
                wiring,
            });
        }

        let pipeline_values = definition
            .inputs
            .iter()
            .filter_map(|(id, input)| input.default.clone().map(|v| (id.clone(), v)))
            .collect();

        Ok(Self {
            inputs: definition.inputs.clone(),
            steps,
            pipeline_values,
            outputs: HashMap::new(),
        })
    }

    fn step(&self, step_id: &str) -> Result<&LoadedStep> {
        self.steps
            .iter()
            .find(|s| s.id == step_id)
            .ok_or_else(|| BackendError::UnknownStep(step_id.to_string()))
    }

    fn read(&self, source: &Source) -> Option<Value> {
        match source {
            Source::Pipeline(name) => self.pipeline_values.get(name).cloned(),
            Source::Step { step, output } => self.outputs.get(step)?.get(output).cloned(),
        }
    }

    /// Run one step; returns the outputs whose value changed.
    fn run_step(&mut self, index: usize) -> Result<Vec<String>> {
        let step = &self.steps[index];
        let inputs: HashMap<String, Value> = step
            .module
            .inputs()
            .iter()
            .map(|name| {
                let value = step
                    .wiring
                    .get(*name)
                    .and_then(|source| self.read(source))
                    .unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();

        let module = step.module;
        let produced = module.run(&inputs)?;
        let previous = self.outputs.entry(step.id.clone()).or_default();
        let mut changed: Vec<String> = Vec::new();
        for name in module.outputs() {
            let Some(value) = produced.get(*name) else {
                continue;
            };
            if previous.get(*name) != Some(value) {
                previous.insert(name.to_string(), value.clone());
                changed.push(name.to_string());
            }
        }
        Ok(changed)
    }

    /// Step inputs fed by `source`.
    fn readers_of(&self, source: &Source) -> Vec<(String, String)> {
        self.steps
            .iter()
            .flat_map(|step| {
                step.wiring
                    .iter()
                    .filter(|(_, wired)| *wired == source)
                    .map(|(input, _)| (step.id.clone(), input.clone()))
            })
            .collect()
    }
}

/// Ordered in-process engine with the [`BuiltinModule`] set.
#[derive(Debug, Default)]
pub struct LocalEngine {
    pipeline: RwLock<Pipeline>,
    inputs_changed: EventHub<EngineIoChanged>,
    outputs_changed: EventHub<EngineIoChanged>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn publish(&self, inputs: EngineIoChanged, outputs: EngineIoChanged) {
        if !outputs.is_empty() {
            self.outputs_changed.publish(&outputs);
        }
        if !inputs.is_empty() {
            self.inputs_changed.publish(&inputs);
        }
    }
}

#[async_trait]
impl ProcessingEngine for LocalEngine {
    fn name(&self) -> &str {
        "local"
    }

    async fn load(&self, definition: &PipelineDefinition) -> Result<()> {
        let pipeline = Pipeline::build(definition)?;
        debug!(
            pipeline = %definition.name,
            steps = pipeline.steps.len(),
            "Pipeline loaded"
        );
        *self.pipeline.write() = pipeline;
        Ok(())
    }

    fn get_input(&self, step_id: &str, input_id: &str) -> Result<Option<Value>> {
        let pipeline = self.pipeline.read();
        if step_id == PIPELINE_ID {
            return Ok(pipeline.pipeline_values.get(input_id).cloned());
        }
        let step = pipeline.step(step_id)?;
        Ok(step
            .wiring
            .get(input_id)
            .and_then(|source| pipeline.read(source)))
    }

    fn get_output(&self, step_id: &str, output_id: &str) -> Result<Option<Value>> {
        let pipeline = self.pipeline.read();
        if step_id == PIPELINE_ID {
            return Ok(None);
        }
        pipeline.step(step_id)?;
        Ok(pipeline
            .outputs
            .get(step_id)
            .and_then(|outputs| outputs.get(output_id))
            .cloned())
    }

    fn set_input(&self, step_id: &str, input_id: &str, value: Value) -> Result<Option<String>> {
        let mut changed = EngineIoChanged::new();
        let accepted = {
            let mut pipeline = self.pipeline.write();

            let pipeline_input = if step_id == PIPELINE_ID {
                if !pipeline.inputs.contains_key(input_id) {
                    return Err(BackendError::UnknownIo {
                        step_id: step_id.to_string(),
                        io_id: input_id.to_string(),
                    });
                }
                input_id.to_string()
            } else {
                let step = pipeline.step(step_id)?;
                match step.wiring.get(input_id) {
                    Some(Source::Pipeline(name)) => name.clone(),
                    Some(Source::Step { .. }) => return Ok(None),
                    None if step.module.inputs().contains(&input_id) => return Ok(None),
                    None => {
                        return Err(BackendError::UnknownIo {
                            step_id: step_id.to_string(),
                            io_id: input_id.to_string(),
                        });
                    }
                }
            };

            pipeline
                .pipeline_values
                .insert(pipeline_input.clone(), value);

            changed.push(PIPELINE_ID, pipeline_input.clone());
            for (step, input) in pipeline.readers_of(&Source::Pipeline(pipeline_input.clone())) {
                changed.push(&step, input);
            }
            pipeline_input
        };

        self.publish(changed, EngineIoChanged::new());
        Ok(Some(accepted))
    }

    async fn process(&self, step_id: Option<&str>) -> Result<()> {
        let mut inputs_changed = EngineIoChanged::new();
        let mut outputs_changed = EngineIoChanged::new();

        let result = {
            let mut pipeline = self.pipeline.write();
            let indices: Vec<usize> = match step_id {
                Some(id) => {
                    pipeline.step(id)?;
                    pipeline
                        .steps
                        .iter()
                        .position(|s| s.id == id)
                        .into_iter()
                        .collect()
                }
                None => (0..pipeline.steps.len()).collect(),
            };

            let mut result = Ok(());
            for index in indices {
                let changed = match pipeline.run_step(index) {
                    Ok(changed) => changed,
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                };
                let id = pipeline.steps[index].id.clone();
                for output in changed {
                    let source = Source::Step {
                        step: id.clone(),
                        output: output.clone(),
                    };
                    for (reader, input) in pipeline.readers_of(&source) {
                        inputs_changed.push(&reader, input);
                    }
                    outputs_changed.push(&id, output);
                }
            }
            result
        };

        self.publish(inputs_changed, outputs_changed);
        result
    }

    async fn execute_module(
        &self,
        module: &str,
        inputs: HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>> {
        let module = BuiltinModule::from_name(module)
            .ok_or_else(|| BackendError::UnknownModule(module.to_string()))?;
        module.run(&inputs)
    }

    fn inputs_changed(&self) -> &EventHub<EngineIoChanged> {
        &self.inputs_changed
    }

    fn outputs_changed(&self) -> &EventHub<EngineIoChanged> {
        &self.outputs_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn xor_pipeline() -> PipelineDefinition {
        serde_json::from_value(json!({
            "name": "xor",
            "inputs": {
                "a": {"type": "boolean", "default": false},
                "b": {"type": "boolean", "default": true}
            },
            "steps": [
                {"id": "xor", "module": "logic.xor", "inputs": {"a": "__pipeline__.a", "b": "__pipeline__.b"}},
                {"id": "not", "module": "logic.not", "inputs": {"a": "xor.y"}}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_applies_defaults() {
        let engine = LocalEngine::new();
        engine.load(&xor_pipeline()).await.unwrap();
        assert_eq!(engine.get_input(PIPELINE_ID, "b").unwrap(), Some(json!(true)));
        assert_eq!(engine.get_input("xor", "a").unwrap(), Some(json!(false)));
        assert_eq!(engine.get_output("xor", "y").unwrap(), None);
    }

    #[tokio::test]
    async fn test_process_propagates_through_steps() {
        let engine = LocalEngine::new();
        engine.load(&xor_pipeline()).await.unwrap();
        engine.process(None).await.unwrap();
        assert_eq!(engine.get_output("xor", "y").unwrap(), Some(json!(true)));
        assert_eq!(engine.get_input("not", "a").unwrap(), Some(json!(true)));
        assert_eq!(engine.get_output("not", "y").unwrap(), Some(json!(false)));
    }

    #[tokio::test]
    async fn test_set_input_through_step_wiring() {
        let engine = LocalEngine::new();
        engine.load(&xor_pipeline()).await.unwrap();

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let _sub = {
            let events = Arc::clone(&events);
            engine
                .inputs_changed()
                .subscribe(move |e: &EngineIoChanged| events.lock().push(e.clone()))
        };

        let set = engine.set_input("xor", "a", json!(true)).unwrap();
        assert_eq!(set.as_deref(), Some("a"));
        assert_eq!(engine.get_input(PIPELINE_ID, "a").unwrap(), Some(json!(true)));
        assert_eq!(
            *events.lock(),
            vec![EngineIoChanged::new().with(PIPELINE_ID, ["a"]).with("xor", ["a"])]
        );
    }

    #[tokio::test]
    async fn test_connected_input_is_rejected() {
        let engine = LocalEngine::new();
        engine.load(&xor_pipeline()).await.unwrap();
        assert_eq!(engine.set_input("not", "a", json!(false)).unwrap(), None);
        assert!(matches!(
            engine.set_input(PIPELINE_ID, "zzz", json!(1)),
            Err(BackendError::UnknownIo { .. })
        ));
        assert!(matches!(
            engine.set_input("nope", "a", json!(1)),
            Err(BackendError::UnknownStep(_))
        ));
    }

    #[tokio::test]
    async fn test_process_reports_only_changed_outputs() {
        let engine = LocalEngine::new();
        engine.load(&xor_pipeline()).await.unwrap();
        engine.process(None).await.unwrap();

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let _sub = {
            let events = Arc::clone(&events);
            engine
                .outputs_changed()
                .subscribe(move |e: &EngineIoChanged| events.lock().push(e.clone()))
        };
        engine.process(None).await.unwrap();
        assert!(events.lock().is_empty());

        engine.set_input(PIPELINE_ID, "a", json!(true)).unwrap();
        engine.process(Some("xor")).await.unwrap();
        assert_eq!(
            *events.lock(),
            vec![EngineIoChanged::new().with("xor", ["y"])]
        );
    }

    #[tokio::test]
    async fn test_invalid_pipelines() {
        let engine = LocalEngine::new();
        let unknown_module: PipelineDefinition = serde_json::from_value(json!({
            "name": "bad",
            "steps": [{"id": "s", "module": "logic.nand"}]
        }))
        .unwrap();
        assert!(matches!(
            engine.load(&unknown_module).await,
            Err(BackendError::UnknownModule(_))
        ));

        let forward_reference: PipelineDefinition = serde_json::from_value(json!({
            "name": "bad",
            "steps": [
                {"id": "first", "module": "logic.not", "inputs": {"a": "second.y"}},
                {"id": "second", "module": "logic.not"}
            ]
        }))
        .unwrap();
        let err = engine.load(&forward_reference).await.unwrap_err();
        assert!(err.to_string().contains("unknown source"));
    }

    #[tokio::test]
    async fn test_execute_module() {
        let engine = LocalEngine::new();
        let outputs = engine
            .execute_module(
                "math.mul",
                HashMap::from([("a".to_string(), json!(3)), ("b".to_string(), json!(7))]),
            )
            .await
            .unwrap();
        assert_eq!(outputs["c"], json!(21));
    }
}
