//! `workflow` target: loading, listing and running workflows.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use lumy_pipeline::{
    Backend, ExecuteRequest, WorkflowCatalog, WorkflowSource, page_components_code,
};
use lumy_types::messages::{
    ExecutionStatus, LoadProgressStatus, MsgWorkflowExecute, MsgWorkflowExecutionResult,
    MsgWorkflowGetWorkflowList, MsgWorkflowLoadLumyWorkflow, MsgWorkflowLumyWorkflowLoadProgress,
    MsgWorkflowPageComponentsCode, MsgWorkflowUpdated, MsgWorkflowWorkflowList,
    WorkflowReference,
};
use lumy_types::{Metadata, Target, TargetRegistry};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::HandlerResult;
use crate::handler::{Handler, Reply, reply};
use crate::publisher::Publisher;

pub const GET_CURRENT: &str = "GetCurrent";
pub const GET_PAGE_COMPONENTS_CODE: &str = "GetPageComponentsCode";

pub struct WorkflowContext {
    backend: Arc<dyn Backend>,
    catalog: WorkflowCatalog,
    publisher: Publisher,
}

pub fn workflow_handler(
    backend: Arc<dyn Backend>,
    catalog: WorkflowCatalog,
    publisher: Publisher,
    registry: Arc<TargetRegistry>,
) -> Handler<WorkflowContext> {
    let context = Arc::new(WorkflowContext {
        backend,
        catalog,
        publisher,
    });
    Handler::builder(Target::Workflow, context, registry)
        .on_unit(GET_CURRENT, |ctx| async move { ctx.get_current() })
        .on::<MsgWorkflowLoadLumyWorkflow, _, _>(|ctx, msg| async move {
            ctx.load_workflow(msg).await
        })
        .on::<MsgWorkflowGetWorkflowList, _, _>(|ctx, msg| async move {
            ctx.get_workflow_list(msg)
        })
        .on::<MsgWorkflowExecute, _, _>(|ctx, msg| async move { ctx.execute(msg).await })
        .on_unit(GET_PAGE_COMPONENTS_CODE, |ctx| async move {
            ctx.get_page_components_code()
        })
        .build()
}

impl WorkflowContext {
    fn updated(&self) -> MsgWorkflowUpdated {
        MsgWorkflowUpdated {
            workflow: self.backend.current_workflow().map(|w| (*w).clone()),
            metadata: self.backend.current_metadata(),
        }
    }

    fn get_current(&self) -> HandlerResult<Reply> {
        reply(&self.updated())
    }

    async fn load_workflow(&self, msg: MsgWorkflowLoadLumyWorkflow) -> HandlerResult<Reply> {
        let (source, metadata) = match msg.workflow {
            WorkflowReference::Uri(uri) => {
                let path = uri.strip_prefix("file://").unwrap_or(&uri);
                let metadata = Metadata {
                    uri: Some(uri.clone()),
                };
                (WorkflowSource::Path(PathBuf::from(path)), Some(metadata))
            }
            WorkflowReference::Inline(workflow) => {
                let metadata = Metadata {
                    uri: self.catalog.find_uri(&workflow),
                };
                (WorkflowSource::Inline(workflow), Some(metadata))
            }
        };

        let mut last = None;
        let mut progress = self.backend.load_workflow(source, metadata);
        while let Some(event) = progress.next().await {
            last = Some(event.status);
            self.publisher
                .publish(&MsgWorkflowLumyWorkflowLoadProgress::from(event))?;
        }

        if last == Some(LoadProgressStatus::Loaded) {
            let updated = self.updated();
            if let Some(workflow) = &updated.workflow {
                info!(label = %workflow.meta.label, "Workflow now current");
            }
            reply(&updated)
        } else {
            warn!("Workflow load did not complete");
            Ok(None)
        }
    }

    fn get_workflow_list(&self, msg: MsgWorkflowGetWorkflowList) -> HandlerResult<Reply> {
        let workflows = self.catalog.list(msg.include_workflow.unwrap_or(false));
        reply(&MsgWorkflowWorkflowList { workflows })
    }

    async fn execute(&self, msg: MsgWorkflowExecute) -> HandlerResult<Reply> {
        let request = ExecuteRequest {
            module_name: msg.module_name.clone(),
            workflow_id: msg.workflow_id,
            inputs: msg.inputs.unwrap_or_default(),
            save: msg.save.unwrap_or(false),
        };

        let result = match self.backend.execute(request).await {
            Ok(outputs) => MsgWorkflowExecutionResult {
                request_id: msg.request_id,
                status: ExecutionStatus::Ok,
                result: Some(json!({ "outputs": outputs_value(outputs) })),
                error_message: None,
            },
            Err(e) => {
                warn!(module = %msg.module_name, "Execution failed: {}", e);
                MsgWorkflowExecutionResult {
                    request_id: msg.request_id,
                    status: ExecutionStatus::Error,
                    result: None,
                    error_message: Some(e.to_string()),
                }
            }
        };
        reply(&result)
    }

    fn get_page_components_code(&self) -> HandlerResult<Reply> {
        let code = match self.backend.current_workflow() {
            Some(workflow) => page_components_code(&workflow)?,
            None => Vec::new(),
        };
        reply(&MsgWorkflowPageComponentsCode { code })
    }
}

fn outputs_value(outputs: HashMap<String, String>) -> Value {
    Value::Object(
        outputs
            .into_iter()
            .map(|(output, id)| (output, Value::String(id)))
            .collect(),
    )
}
