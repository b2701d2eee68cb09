//! Lumy workflow definition.
//!
//! A workflow couples a processing pipeline with the UI pages that expose
//! its inputs and outputs. Each page declares how its own I/O ids bind to
//! pipeline-level or step-level I/O ids.
//!
//! # Example YAML
//!
//! ```yaml
//! meta:
//!   label: Logic XOR
//! processing:
//!   workflow:
//!     name: logicXor
//!     inputs:
//!       a: { type: boolean, default: false }
//!       b: { type: boolean, default: false }
//!     steps:
//!       - id: xor
//!         module: logic.xor
//!         inputs: { a: __pipeline__.a, b: __pipeline__.b }
//! ui:
//!   pages:
//!     - id: inputs
//!       component: { id: xorInputs }
//!       mapping:
//!         inputs:
//!           - pageIoId: left
//!             workflowIoId: a
//!     - id: result
//!       component: { id: xorResult, url: file:///opt/lumy/xor.tsx }
//!       mapping:
//!         outputs:
//!           - pageIoId: value
//!             workflowStepId: xor
//!             workflowIoId: y
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, Result};

/// Step id used for pipeline-level I/O, i.e. bindings with no step.
pub const PIPELINE_ID: &str = "__pipeline__";

/// A complete Lumy workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LumyWorkflow {
    pub meta: WorkflowMeta,
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Package dependencies; recorded, never installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMeta {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingConfig {
    pub workflow: PipelineDefinition,
    /// Data transformation settings, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The processing pipeline a workflow runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, PipelineInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInput {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One processing step.
///
/// Each input is wired to a source written as `<step>.<output>`, or
/// `__pipeline__.<input>` for a pipeline input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub id: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    #[serde(default)]
    pub pages: Vec<WorkflowPageDetails>,
}

/// A UI page and its bindings into the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPageDetails {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(default)]
    pub component: WorkflowPageComponent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<WorkflowPageMappings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPageComponent {
    #[serde(default)]
    pub id: String,
    /// Where the component code lives (`file://...` or a plain path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPageMappings {
    #[serde(default)]
    pub inputs: Vec<WorkflowPageMapping>,
    #[serde(default)]
    pub outputs: Vec<WorkflowPageMapping>,
}

/// One page I/O binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPageMapping {
    pub page_io_id: String,
    pub workflow_io_id: String,
    /// `None` binds to pipeline-level I/O.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_step_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<Value>,
}

impl WorkflowPageMapping {
    /// Engine step id of the binding, [`PIPELINE_ID`] when step-less.
    pub fn engine_step_id(&self) -> &str {
        self.workflow_step_id.as_deref().unwrap_or(PIPELINE_ID)
    }
}

/// Where a loaded workflow came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Entry of the workflow catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowListItem {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<LumyWorkflow>,
}

impl LumyWorkflow {
    /// Find a page by id.
    pub fn page(&self, page_id: &str) -> Option<&WorkflowPageDetails> {
        self.ui.pages.iter().find(|p| p.id == page_id)
    }

    /// Check structural invariants that the mapping engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.processing.workflow.name.is_empty() {
            return Err(ProtocolError::InvalidWorkflow(
                "Pipeline name cannot be empty".into(),
            ));
        }

        let mut page_ids = HashSet::new();
        for page in &self.ui.pages {
            if page.id.is_empty() {
                return Err(ProtocolError::InvalidWorkflow(
                    "Page ID cannot be empty".into(),
                ));
            }
            if !page_ids.insert(page.id.as_str()) {
                return Err(ProtocolError::InvalidWorkflow(format!(
                    "Duplicate page ID: {}",
                    page.id
                )));
            }
            let Some(mapping) = &page.mapping else {
                continue;
            };
            for binding in mapping.inputs.iter().chain(&mapping.outputs) {
                if binding.page_io_id.is_empty() || binding.workflow_io_id.is_empty() {
                    return Err(ProtocolError::InvalidWorkflow(format!(
                        "Page '{}' has a binding with an empty I/O id",
                        page.id
                    )));
                }
            }
        }

        let mut step_ids = HashSet::new();
        for step in &self.processing.workflow.steps {
            if step.id.is_empty() || step.id == PIPELINE_ID {
                return Err(ProtocolError::InvalidWorkflow(format!(
                    "Invalid step ID: '{}'",
                    step.id
                )));
            }
            if !step_ids.insert(step.id.as_str()) {
                return Err(ProtocolError::InvalidWorkflow(format!(
                    "Duplicate step ID: {}",
                    step.id
                )));
            }
            for (input, source) in &step.inputs {
                if !source.contains('.') {
                    return Err(ProtocolError::InvalidWorkflow(format!(
                        "Step '{}' input '{}' has malformed source '{}'",
                        step.id, input, source
                    )));
                }
            }
        }

        Ok(())
    }
}
