//! Dispatch tests over the in-memory transport.

mod common;

use std::sync::Arc;

use anyhow::Result;
use lumy_pipeline::MockBackend;
use lumy_server::StandaloneClient;
use lumy_types::{MessageEnvelope, Target};
use serde_json::json;

async fn load(client: &StandaloneClient, uri: String) {
    client
        .publish(
            Target::Workflow,
            &MessageEnvelope::new("LoadLumyWorkflow", Some(json!({"workflow": uri}))),
        )
        .await;
}

#[tokio::test]
async fn test_unknown_action_produces_nothing() -> Result<()> {
    let client = StandaloneClient::new(Arc::new(MockBackend::default()))?;
    let mut module_io = client.subscribe(Target::ModuleIo);
    let mut activity = client.subscribe(Target::Activity);

    client
        .publish(Target::ModuleIo, &MessageEnvelope::empty("NoSuchAction"))
        .await;

    assert!(module_io.drain().is_empty());
    assert!(activity.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_handler_failure_is_contained() -> Result<()> {
    let client = StandaloneClient::new(Arc::new(MockBackend::default()))?;
    let mut activity = client.subscribe(Target::Activity);

    client
        .publish(
            Target::ModuleIo,
            &MessageEnvelope::new("GetInputValue", Some(json!({"stepId": 1}))),
        )
        .await;

    let errors = activity.drain();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].action, "Error");
    let content = errors[0].content.clone().unwrap_or_default();
    let id = content["id"].as_str().unwrap_or_default();
    assert!(!id.is_empty());
    assert!(content["extendedMessage"].as_str().is_some());

    // Later messages still work.
    let mut notes = client.subscribe(Target::Notes);
    client
        .publish(
            Target::Notes,
            &MessageEnvelope::new("GetNotes", Some(json!({"stepId": "P"}))),
        )
        .await;
    assert_eq!(notes.drain().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_page_update_fans_out_to_page_ids() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_workflow(dir.path())?;
    let client = StandaloneClient::new(common::engine_backend())?;

    let mut workflow = client.subscribe(Target::Workflow);
    load(&client, path.display().to_string()).await;
    let actions: Vec<String> = workflow.drain().into_iter().map(|e| e.action).collect();
    assert_eq!(actions.last().map(String::as_str), Some("Updated"));
    assert!(actions.iter().any(|a| a == "LumyWorkflowLoadProgress"));

    let mut module_io = client.subscribe(Target::ModuleIo);
    client
        .publish(
            Target::ModuleIo,
            &MessageEnvelope::new(
                "UpdateInputValues",
                Some(json!({
                    "stepId": "P",
                    "inputValues": {"a": {"dataType": "simple", "value": true}}
                })),
            ),
        )
        .await;

    let pushed = module_io.drain();
    let inputs_updated: Vec<_> = pushed
        .iter()
        .filter(|e| e.action == "InputValuesUpdated")
        .collect();
    assert!(!inputs_updated.is_empty());
    for envelope in &inputs_updated {
        assert_eq!(
            envelope.content,
            Some(json!({"stepId": "P", "inputIds": ["a"]}))
        );
    }
    assert!(pushed.iter().any(|e| e.action == "OutputValuesUpdated"
        && e.content == Some(json!({"stepId": "P", "outputIds": ["negated"]}))));

    client
        .publish(
            Target::ModuleIo,
            &MessageEnvelope::new(
                "GetOutputValue",
                Some(json!({"stepId": "P", "outputId": "negated"})),
            ),
        )
        .await;
    let value = module_io.drain().pop().unwrap_or_else(|| MessageEnvelope::empty("none"));
    assert_eq!(value.action, "OutputValue");
    assert_eq!(value.content.unwrap_or_default()["value"], json!(false));
    Ok(())
}

#[tokio::test]
async fn test_processing_state_reaches_activity() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = common::write_workflow(dir.path())?;
    let client = StandaloneClient::new(common::engine_backend())?;
    load(&client, path.display().to_string()).await;

    let mut activity = client.subscribe(Target::Activity);
    client
        .publish(
            Target::ModuleIo,
            &MessageEnvelope::new(
                "UpdateInputValues",
                Some(json!({
                    "stepId": "Q",
                    "inputValues": {"n": {"dataType": "simple", "value": 3}}
                })),
            ),
        )
        .await;

    let states: Vec<_> = activity
        .drain()
        .into_iter()
        .filter(|e| e.action == "ExecutionState")
        .filter_map(|e| e.content)
        .map(|c| c["state"].clone())
        .collect();
    assert_eq!(states, vec![json!("busy"), json!("idle")]);
    Ok(())
}

#[tokio::test]
async fn test_failed_load_reports_progress_only() -> Result<()> {
    let client = StandaloneClient::new(common::engine_backend())?;
    let mut workflow = client.subscribe(Target::Workflow);
    let mut activity = client.subscribe(Target::Activity);

    load(&client, "file:///definitely/not/here.yml".to_string()).await;

    let envelopes = workflow.drain();
    let last = envelopes.last().cloned().unwrap_or_else(|| MessageEnvelope::empty("none"));
    assert_eq!(last.action, "LumyWorkflowLoadProgress");
    assert_eq!(last.content.unwrap_or_default()["status"], "notLoaded");
    assert!(envelopes.iter().all(|e| e.action != "Updated"));
    assert!(activity.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_execute_failure_is_a_result_not_an_error() -> Result<()> {
    let client = StandaloneClient::new(Arc::new(MockBackend::default()))?;
    let mut workflow = client.subscribe(Target::Workflow);
    let mut activity = client.subscribe(Target::Activity);

    client
        .publish(
            Target::Workflow,
            &MessageEnvelope::new(
                "Execute",
                Some(json!({"moduleName": "logic.and", "requestId": "r1"})),
            ),
        )
        .await;

    let result = workflow.drain().pop().unwrap_or_else(|| MessageEnvelope::empty("none"));
    assert_eq!(result.action, "ExecutionResult");
    let content = result.content.unwrap_or_default();
    assert_eq!(content["requestId"], "r1");
    assert_eq!(content["status"], "error");
    assert!(content["errorMessage"].as_str().is_some());
    assert!(activity.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_execute_module_on_engine() -> Result<()> {
    let client = StandaloneClient::new(common::engine_backend())?;
    let mut workflow = client.subscribe(Target::Workflow);

    client
        .publish(
            Target::Workflow,
            &MessageEnvelope::new(
                "Execute",
                Some(json!({
                    "moduleName": "logic.and",
                    "requestId": "r2",
                    "inputs": {"a": true, "b": true},
                    "save": true
                })),
            ),
        )
        .await;

    let result = workflow.drain().pop().unwrap_or_else(|| MessageEnvelope::empty("none"));
    let content = result.content.unwrap_or_default();
    assert_eq!(content["status"], "ok");
    assert!(content["result"]["outputs"]["y"].as_str().is_some());
    Ok(())
}
