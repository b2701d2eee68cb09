//! `workflow` target: loading, listing and executing workflows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LumyWorkflow, Metadata, WorkflowListItem, message_types};

/// Current workflow, sent on request and after every successful load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowUpdated {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<LumyWorkflow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A workflow given either by uri/path or inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowReference {
    Uri(String),
    Inline(Box<LumyWorkflow>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowLoadLumyWorkflow {
    pub workflow: WorkflowReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadProgressStatus {
    Loading,
    Loaded,
    NotLoaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowLumyWorkflowLoadProgress {
    pub status: LoadProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MsgWorkflowLumyWorkflowLoadProgress {
    pub fn new(status: LoadProgressStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowGetWorkflowList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_workflow: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowWorkflowList {
    pub workflows: Vec<WorkflowListItem>,
}

/// Run a single module outside of the current workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowExecute {
    pub module_name: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<HashMap<String, Value>>,
    /// Store the outputs in the data registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowExecutionResult {
    pub request_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Page component source, keyed by a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgWorkflowPageComponentsCode {
    pub code: Vec<Code>,
}

message_types!(
    MsgWorkflowUpdated,
    MsgWorkflowLoadLumyWorkflow,
    MsgWorkflowLumyWorkflowLoadProgress,
    MsgWorkflowGetWorkflowList,
    MsgWorkflowWorkflowList,
    MsgWorkflowExecute,
    MsgWorkflowExecutionResult,
    MsgWorkflowPageComponentsCode,
);
