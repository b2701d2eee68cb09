//! `module_io` target: page I/O values.
//!
//! Requests read or write values through the backend. Backend change events
//! are pushed to the client as `InputValuesUpdated` / `OutputValuesUpdated`.

use std::collections::BTreeMap;
use std::sync::Arc;

use lumy_pipeline::{Backend, IoValue, UpdatedIO};
use lumy_types::messages::{
    DataType, MsgModuleIOGetInputValue, MsgModuleIOGetOutputValue, MsgModuleIOInputValue,
    MsgModuleIOInputValuesUpdated, MsgModuleIOOutputValue, MsgModuleIOOutputValuesUpdated,
    MsgModuleIOUpdateInputValues,
};
use lumy_types::{Message, Target, TargetRegistry};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::HandlerResult;
use crate::handler::{Handler, Reply, reply};
use crate::publisher::Publisher;

pub struct ModuleIoContext {
    backend: Arc<dyn Backend>,
}

pub fn module_io_handler(
    backend: Arc<dyn Backend>,
    publisher: Publisher,
    registry: Arc<TargetRegistry>,
) -> Handler<ModuleIoContext> {
    let events = backend.events();
    let inputs_changed = {
        let publisher = publisher.clone();
        events.step_inputs_changed.subscribe(move |updated: &UpdatedIO| {
            push(
                &publisher,
                &MsgModuleIOInputValuesUpdated {
                    step_id: updated.step_id.clone(),
                    input_ids: updated.io_ids.clone(),
                },
            );
        })
    };
    let outputs_changed = {
        let publisher = publisher.clone();
        events.step_outputs_changed.subscribe(move |updated: &UpdatedIO| {
            push(
                &publisher,
                &MsgModuleIOOutputValuesUpdated {
                    step_id: updated.step_id.clone(),
                    output_ids: updated.io_ids.clone(),
                },
            );
        })
    };

    let context = Arc::new(ModuleIoContext { backend });
    Handler::builder(Target::ModuleIo, context, registry)
        .on::<MsgModuleIOGetInputValue, _, _>(|ctx, msg| async move {
            ctx.get_input_value(msg).await
        })
        .on::<MsgModuleIOGetOutputValue, _, _>(|ctx, msg| async move {
            ctx.get_output_value(msg).await
        })
        .on::<MsgModuleIOUpdateInputValues, _, _>(|ctx, msg| async move {
            ctx.update_input_values(msg).await
        })
        .subscription(inputs_changed)
        .subscription(outputs_changed)
        .build()
}

/// Publish from an event callback, where there is no caller to return to.
fn push<M: Message>(publisher: &Publisher, message: &M) {
    if let Err(e) = publisher.publish(message) {
        error!(schema = M::TYPE_NAME, "Failed to push update: {}", e);
    }
}

fn split(io: IoValue) -> (DataType, Value, Option<Value>) {
    let data_type = if io.stats.is_some() {
        DataType::Table
    } else {
        DataType::Simple
    };
    let stats = io
        .stats
        .map(|stats| serde_json::to_value(stats).unwrap_or(Value::Null));
    (data_type, io.value.unwrap_or(Value::Null), stats)
}

impl ModuleIoContext {
    async fn get_input_value(&self, msg: MsgModuleIOGetInputValue) -> HandlerResult<Reply> {
        let io = self
            .backend
            .get_step_input_value(&msg.step_id, &msg.input_id, msg.filter.as_ref())
            .await?;
        let (data_type, value, stats) = split(io);
        reply(&MsgModuleIOInputValue {
            step_id: msg.step_id,
            input_id: msg.input_id,
            data_type,
            value,
            filter: msg.filter,
            stats,
        })
    }

    async fn get_output_value(&self, msg: MsgModuleIOGetOutputValue) -> HandlerResult<Reply> {
        let io = self
            .backend
            .get_step_output_value(&msg.step_id, &msg.output_id, msg.filter.as_ref())
            .await?;
        let (data_type, value, stats) = split(io);
        reply(&MsgModuleIOOutputValue {
            step_id: msg.step_id,
            output_id: msg.output_id,
            data_type,
            value,
            filter: msg.filter,
            stats,
        })
    }

    /// Forward the update, then acknowledge every id the client sent.
    ///
    /// The acknowledgement may repeat ids the backend already announced
    /// through its change events.
    async fn update_input_values(&self, msg: MsgModuleIOUpdateInputValues) -> HandlerResult<Reply> {
        let values: BTreeMap<String, Value> = msg
            .input_values
            .unwrap_or_default()
            .into_iter()
            .map(|(id, container)| (id, container.value))
            .collect();
        let input_ids: Vec<String> = values.keys().cloned().collect();

        let accepted = self
            .backend
            .update_step_input_values(&msg.step_id, values)
            .await?;
        debug!(step = %msg.step_id, ?accepted, "Input values updated");

        if input_ids.is_empty() {
            return Ok(None);
        }
        reply(&MsgModuleIOInputValuesUpdated {
            step_id: msg.step_id,
            input_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::handler::MessageHandler;
    use crate::publisher::testing::RecordingTransport;
    use lumy_pipeline::MockBackend;
    use lumy_types::MessageEnvelope;
    use serde_json::json;

    fn setup() -> (
        Arc<MockBackend>,
        Arc<RecordingTransport>,
        Handler<ModuleIoContext>,
    ) {
        let backend = Arc::new(MockBackend::default());
        let transport = Arc::new(RecordingTransport::default());
        let publisher = Publisher::new(Arc::new(JsonCodec), transport.clone());
        let registry = Arc::new(TargetRegistry::standard().unwrap());
        let handler = module_io_handler(backend.clone(), publisher, registry);
        (backend, transport, handler)
    }

    #[tokio::test]
    async fn test_get_unknown_input_is_empty_simple_value() {
        let (_backend, _transport, handler) = setup();
        let reply = handler
            .handle(MessageEnvelope::new(
                "GetInputValue",
                Some(json!({"stepId": "P", "inputId": "nope"})),
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.action, "InputValue");
        let content = reply.content.unwrap();
        assert_eq!(content["type"], "simple");
        assert_eq!(content["value"], Value::Null);
        assert!(content.get("stats").is_none());
    }

    #[tokio::test]
    async fn test_output_change_is_pushed() {
        let (backend, transport, _handler) = setup();
        backend.set_output("P", "y", json!(3));
        assert_eq!(
            transport.on(Target::ModuleIo),
            vec![json!({
                "action": "OutputValuesUpdated",
                "content": {"stepId": "P", "outputIds": ["y"]}
            })]
        );
    }

    #[tokio::test]
    async fn test_pushes_stop_with_handler() {
        let (backend, transport, handler) = setup();
        drop(handler);
        backend.set_output("P", "y", json!(3));
        assert!(transport.on(Target::ModuleIo).is_empty());
    }

    #[tokio::test]
    async fn test_update_acknowledges_sent_ids() {
        let (_backend, transport, handler) = setup();
        let reply = handler
            .handle(MessageEnvelope::new(
                "UpdateInputValues",
                Some(json!({
                    "stepId": "P",
                    "inputValues": {
                        "b": {"dataType": "simple", "value": 1},
                        "a": {"dataType": "simple", "value": 2}
                    }
                })),
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.action, "InputValuesUpdated");
        assert_eq!(
            reply.content,
            Some(json!({"stepId": "P", "inputIds": ["a", "b"]}))
        );
        // No workflow loaded: nothing accepted, nothing pushed.
        assert!(transport.on(Target::ModuleIo).is_empty());
    }
}
