//! The backend collaborator interface used by the message handlers.
//!
//! Every id crossing this interface is in the page namespace: `page_id` is a
//! UI page id and I/O ids are that page's I/O ids. Implementations translate
//! to whatever their engine uses.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use lumy_types::messages::{LoadProgressStatus, MsgWorkflowLumyWorkflowLoadProgress, State};
use lumy_types::{DataTabularDataFilter, LumyWorkflow, Metadata, TableStats};
use serde_json::Value;

use crate::Result;
use crate::data_registry::DataRegistry;
use crate::events::EventHub;
use crate::mapping::UpdatedIO;

/// Where to load a workflow from.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowSource {
    Path(PathBuf),
    Inline(Box<LumyWorkflow>),
}

/// One step of a workflow load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub status: LoadProgressStatus,
    pub message: String,
}

impl LoadProgress {
    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            status: LoadProgressStatus::Loading,
            message: message.into(),
        }
    }

    pub fn loaded(message: impl Into<String>) -> Self {
        Self {
            status: LoadProgressStatus::Loaded,
            message: message.into(),
        }
    }

    pub fn not_loaded(message: impl Into<String>) -> Self {
        Self {
            status: LoadProgressStatus::NotLoaded,
            message: message.into(),
        }
    }
}

impl From<LoadProgress> for MsgWorkflowLumyWorkflowLoadProgress {
    fn from(progress: LoadProgress) -> Self {
        MsgWorkflowLumyWorkflowLoadProgress::new(progress.status, progress.message)
    }
}

/// A value as shipped to the client.
///
/// Simple values carry the value and no stats. Tables carry stats, and a
/// value only when a filter asked for one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoValue {
    pub value: Option<Value>,
    pub stats: Option<TableStats>,
}

impl IoValue {
    pub fn simple(value: Value) -> Self {
        Self {
            value: Some(value),
            stats: None,
        }
    }
}

/// Run one module on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteRequest {
    pub module_name: String,
    pub workflow_id: Option<String>,
    pub inputs: HashMap<String, Value>,
    /// Store the outputs in the data registry.
    pub save: bool,
}

/// Events every backend emits.
#[derive(Debug, Default)]
pub struct BackendEvents {
    pub workflow_updated: EventHub<Arc<LumyWorkflow>>,
    pub step_inputs_changed: EventHub<UpdatedIO>,
    pub step_outputs_changed: EventHub<UpdatedIO>,
    pub processing_state_changed: EventHub<State>,
}

/// Backend the message handlers talk to.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Load a workflow and make it current.
    ///
    /// The stream is lazy: nothing happens until it is polled. The last
    /// item is `Loaded` on success or `NotLoaded` on failure.
    fn load_workflow(
        &self,
        source: WorkflowSource,
        metadata: Option<Metadata>,
    ) -> BoxStream<'_, LoadProgress>;

    /// The current workflow.
    fn current_workflow(&self) -> Option<Arc<LumyWorkflow>>;

    /// Where the current workflow came from.
    fn current_metadata(&self) -> Option<Metadata>;

    /// Value of a page input. A mapping miss yields an empty value.
    async fn get_step_input_value(
        &self,
        page_id: &str,
        input_id: &str,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue>;

    /// Value of a page output. A mapping miss yields an empty value.
    async fn get_step_output_value(
        &self,
        page_id: &str,
        output_id: &str,
        filter: Option<&DataTabularDataFilter>,
    ) -> Result<IoValue>;

    /// Partially update a page's inputs; returns the accepted page input ids.
    ///
    /// Unmapped ids, null values and ids bound to connected inputs are skipped.
    async fn update_step_input_values(
        &self,
        page_id: &str,
        values: BTreeMap<String, Value>,
    ) -> Result<Vec<String>>;

    /// Run processing for one page, or the whole workflow.
    ///
    /// Publishes `Busy`, then always `Idle`.
    async fn run_processing(&self, page_id: Option<&str>) -> Result<()>;

    /// Run one module; returns `output id → saved item id` for saved outputs.
    async fn execute(&self, request: ExecuteRequest) -> Result<HashMap<String, String>>;

    /// Event lists.
    fn events(&self) -> &BackendEvents;

    /// The data registry.
    fn data_registry(&self) -> Arc<dyn DataRegistry>;
}

/// Publish `Busy`, run `work`, then publish `Idle` whatever the outcome.
pub(crate) async fn with_processing_state<F, T>(events: &BackendEvents, work: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    events.processing_state_changed.publish(&State::Busy);
    let result = work.await;
    events.processing_state_changed.publish(&State::Idle);
    result
}
