//! WebSocket transport tests against a running server.

mod common;

use std::time::Duration;

use anyhow::Result;
use common::TestServer;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_request_reply_on_same_target() -> Result<()> {
    let server = TestServer::start().await?;
    let mut notes = server.connect("notes").await?;

    notes
        .send(json!({"action": "Add", "content": {"stepId": "P", "note": {"content": "hello"}}}))
        .await?;
    let reply = notes.recv().await?;

    assert_eq!(reply["action"], "Notes");
    assert_eq!(reply["content"]["stepId"], "P");
    assert_eq!(reply["content"]["notes"][0]["content"], "hello");
    notes.close().await
}

#[tokio::test]
async fn test_publishes_reach_every_socket_on_target() -> Result<()> {
    let server = TestServer::start().await?;
    let mut first = server.connect("workflow").await?;
    let mut second = server.connect("workflow").await?;
    let mut other = server.connect("notes").await?;

    first.send(json!({"action": "GetCurrent"})).await?;

    assert_eq!(first.recv().await?["action"], "Updated");
    assert_eq!(second.recv().await?["action"], "Updated");
    assert!(other.recv_within(Duration::from_millis(200)).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_workflow_list_and_load() -> Result<()> {
    let server = TestServer::start_with(common::engine_backend()).await?;
    let mut workflow = server.connect("workflow").await?;

    workflow
        .send(json!({"action": "GetWorkflowList", "content": {"includeWorkflow": false}}))
        .await?;
    let list = workflow.recv_action("WorkflowList").await?;
    let workflows = list["content"]["workflows"].as_array().cloned().unwrap_or_default();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0]["name"], "Page P");
    assert!(workflows[0].get("body").is_none());

    let uri = server.workflow_path().display().to_string();
    workflow
        .send(json!({"action": "LoadLumyWorkflow", "content": {"workflow": uri}}))
        .await?;
    let first = workflow.recv().await?;
    assert_eq!(first["action"], "LumyWorkflowLoadProgress");
    assert_eq!(first["content"]["status"], "loading");

    let updated = workflow.recv_action("Updated").await?;
    assert_eq!(updated["content"]["workflow"]["meta"]["label"], "Page P");
    assert_eq!(updated["content"]["metadata"]["uri"], uri.as_str());
    Ok(())
}

#[tokio::test]
async fn test_bad_frames_report_errors_on_activity() -> Result<()> {
    let server = TestServer::start().await?;
    let mut module_io = server.connect("module_io").await?;
    let mut activity = server.connect("activity").await?;

    module_io.send_raw(Message::Text("{oops".into())).await?;
    let error = activity.recv().await?;
    assert_eq!(error["action"], "Error");
    let id = error["content"]["id"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty());
    assert!(
        error["content"]["message"]
            .as_str()
            .unwrap_or_default()
            .contains(&id)
    );

    // Unknown actions are dropped without an error.
    module_io.send(json!({"action": "NoSuchAction"})).await?;
    assert!(activity.recv_within(Duration::from_millis(200)).await?.is_none());
    assert!(module_io.recv_within(Duration::from_millis(200)).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_binary_utf8_frames_are_accepted() -> Result<()> {
    let server = TestServer::start().await?;
    let mut notes = server.connect("notes").await?;

    let frame = json!({"action": "GetNotes", "content": {"stepId": "P"}}).to_string();
    notes.send_raw(Message::Binary(frame.into_bytes().into())).await?;

    assert_eq!(notes.recv().await?["action"], "Notes");
    Ok(())
}

#[tokio::test]
async fn test_unknown_target_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    assert!(server.connect("nope").await.is_err());
    Ok(())
}
