//! `activity` target: outbound only. Pushes the backend's processing state.

use std::sync::Arc;

use lumy_pipeline::Backend;
use lumy_types::messages::{MsgExecutionState, State};
use lumy_types::{Target, TargetRegistry};
use tracing::error;

use crate::handler::Handler;
use crate::publisher::Publisher;

pub struct ActivityContext;

pub fn activity_handler(
    backend: &dyn Backend,
    publisher: Publisher,
    registry: Arc<TargetRegistry>,
) -> Handler<ActivityContext> {
    let state_changed = backend
        .events()
        .processing_state_changed
        .subscribe(move |state: &State| {
            if let Err(e) = publisher.publish(&MsgExecutionState { state: *state }) {
                error!("Failed to push execution state: {}", e);
            }
        });

    Handler::builder(Target::Activity, Arc::new(ActivityContext), registry)
        .subscription(state_changed)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::handler::MessageHandler;
    use crate::publisher::testing::RecordingTransport;
    use lumy_pipeline::MockBackend;
    use lumy_types::MessageEnvelope;

    #[tokio::test]
    async fn test_processing_state_is_pushed() {
        let backend = MockBackend::default();
        let transport = Arc::new(RecordingTransport::default());
        let publisher = Publisher::new(Arc::new(JsonCodec), transport.clone());
        let handler = activity_handler(
            &backend,
            publisher,
            Arc::new(TargetRegistry::standard().unwrap()),
        );

        backend.run_processing(None).await.unwrap();

        assert_eq!(
            transport.actions(Target::Activity),
            vec!["ExecutionState", "ExecutionState"]
        );
        assert_eq!(transport.on(Target::Activity)[1]["content"]["state"], "idle");
        assert!(handler.actions().is_empty());
        assert!(
            handler
                .handle(MessageEnvelope::empty("Error"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
