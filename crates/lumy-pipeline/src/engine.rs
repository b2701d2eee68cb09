//! Processing engine interface, in the engine's own namespace.
//!
//! Step ids and I/O ids here are the pipeline's, never page ids. Pipeline-level
//! I/O uses [`PIPELINE_ID`](lumy_types::PIPELINE_ID) as its step id.

use std::collections::HashMap;

use async_trait::async_trait;
use lumy_types::PipelineDefinition;
use serde_json::Value;

use crate::Result;
use crate::events::EventHub;

/// Engine-level change event: which I/O ids changed on which steps.
///
/// Entries keep the order in which the engine reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineIoChanged {
    steps: Vec<(String, Vec<String>)>,
}

impl EngineIoChanged {
    /// An empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one changed I/O id, appending to the step's entry.
    pub fn push(&mut self, step_id: &str, io_id: impl Into<String>) {
        let io_id = io_id.into();
        match self.steps.iter_mut().find(|(step, _)| step == step_id) {
            Some((_, ios)) => ios.push(io_id),
            None => self.steps.push((step_id.to_string(), vec![io_id])),
        }
    }

    /// Builder form of [`push`](Self::push) for a whole step entry.
    pub fn with<I, S>(mut self, step_id: &str, io_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for io_id in io_ids {
            self.push(step_id, io_id);
        }
        self
    }

    /// Iterate `(step_id, io_ids)` entries in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.steps
            .iter()
            .map(|(step, ios)| (step.as_str(), ios.as_slice()))
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for EngineIoChanged {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut event = Self::new();
        for (step, ios) in iter {
            event = event.with(&step, ios);
        }
        event
    }
}

/// Narrow interface to the workflow execution engine.
#[async_trait]
pub trait ProcessingEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Replace the current pipeline. Values from the previous one are dropped.
    async fn load(&self, pipeline: &PipelineDefinition) -> Result<()>;

    /// Current value of a step input, `None` when unset.
    fn get_input(&self, step_id: &str, input_id: &str) -> Result<Option<Value>>;

    /// Current value of a step output, `None` when not produced yet.
    fn get_output(&self, step_id: &str, output_id: &str) -> Result<Option<Value>>;

    /// Set a step input.
    ///
    /// Only inputs fed by a pipeline input can be set; the pipeline input is
    /// set and its id returned. Inputs connected to another step's output are
    /// rejected with `Ok(None)`.
    fn set_input(&self, step_id: &str, input_id: &str, value: Value) -> Result<Option<String>>;

    /// Run one step, or every step in order.
    async fn process(&self, step_id: Option<&str>) -> Result<()>;

    /// Run a module on its own, outside the loaded pipeline.
    async fn execute_module(
        &self,
        module: &str,
        inputs: HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>>;

    /// Fired after step inputs changed.
    fn inputs_changed(&self) -> &EventHub<EngineIoChanged>;

    /// Fired after step outputs changed.
    fn outputs_changed(&self) -> &EventHub<EngineIoChanged>;
}
