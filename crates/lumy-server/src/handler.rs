//! Per-target message handlers with explicit action tables.
//!
//! A [`Handler`] owns a context `C` and a table `action → operation` built at
//! construction:
//!
//! ```text
//! Handler::builder(Target::Notes, ctx, registry)
//!     .on::<MsgNotesAdd, _, _>(|ctx, msg| async move { ... })   // typed content
//!     .on_unit("GetCurrent", |ctx| async move { ... })          // no content
//!     .subscription(sub)                                        // push side
//!     .build()
//! ```
//!
//! Typed operations resolve their schema through the [`TargetRegistry`]
//! before decoding; unknown actions and unregistered schemas are logged and
//! dropped. Backend subscriptions added with [`HandlerBuilder::subscription`]
//! live exactly as long as the handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use lumy_pipeline::Subscription;
use lumy_types::{Message, MessageEnvelope, Target, TargetRegistry};
use tracing::{debug, warn};

use crate::error::HandlerResult;

/// What an operation answers with.
pub type Reply = Option<MessageEnvelope>;

/// Wrap a typed response as a reply envelope.
///
/// The envelope carries the response's own action, which usually differs
/// from the request's.
pub fn reply<M: Message>(message: &M) -> HandlerResult<Reply> {
    Ok(Some(message.to_envelope()?))
}

/// Something that can answer envelopes of one target.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn target(&self) -> Target;

    /// Handle one inbound envelope; `Ok(None)` means nothing to send back.
    async fn handle(&self, envelope: MessageEnvelope) -> HandlerResult<Reply>;

    /// Actions this handler answers, sorted.
    fn actions(&self) -> Vec<&'static str>;
}

type Operation<C> =
    Arc<dyn Fn(Arc<C>, MessageEnvelope) -> BoxFuture<'static, HandlerResult<Reply>> + Send + Sync>;

struct ActionEntry<C> {
    /// Schema type name; `None` for operations that take no content.
    type_name: Option<&'static str>,
    operation: Operation<C>,
}

/// Handler over context `C`.
pub struct Handler<C> {
    target: Target,
    context: Arc<C>,
    registry: Arc<TargetRegistry>,
    actions: HashMap<&'static str, ActionEntry<C>>,
    _subscriptions: Vec<Subscription>,
}

impl<C: Send + Sync + 'static> Handler<C> {
    pub fn builder(
        target: Target,
        context: Arc<C>,
        registry: Arc<TargetRegistry>,
    ) -> HandlerBuilder<C> {
        HandlerBuilder {
            handler: Handler {
                target,
                context,
                registry,
                actions: HashMap::new(),
                _subscriptions: Vec::new(),
            },
        }
    }

    /// The handler's context.
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }
}

/// Builder for [`Handler`].
pub struct HandlerBuilder<C> {
    handler: Handler<C>,
}

impl<C: Send + Sync + 'static> HandlerBuilder<C> {
    /// Register an operation for request schema `M`, keyed by `M`'s action.
    pub fn on<M, F, Fut>(mut self, operation: F) -> Self
    where
        M: Message,
        F: Fn(Arc<C>, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Reply>> + Send + 'static,
    {
        debug_assert_eq!(M::target(), self.handler.target);
        let operation = Arc::new(operation);
        let wrapped: Operation<C> = Arc::new(move |context: Arc<C>, envelope: MessageEnvelope| {
            let operation = Arc::clone(&operation);
            async move {
                let message: M = envelope.parse_content()?;
                (*operation)(context, message).await
            }
            .boxed()
        });
        self.handler.actions.insert(
            M::action(),
            ActionEntry {
                type_name: Some(M::TYPE_NAME),
                operation: wrapped,
            },
        );
        self
    }

    /// Register an operation that takes no content.
    pub fn on_unit<F, Fut>(mut self, action: &'static str, operation: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Reply>> + Send + 'static,
    {
        let operation = Arc::new(operation);
        let wrapped: Operation<C> = Arc::new(move |context: Arc<C>, _envelope: MessageEnvelope| {
            let operation = Arc::clone(&operation);
            async move { (*operation)(context).await }.boxed()
        });
        self.handler.actions.insert(
            action,
            ActionEntry {
                type_name: None,
                operation: wrapped,
            },
        );
        self
    }

    /// Keep a backend subscription alive for the handler's lifetime.
    pub fn subscription(mut self, subscription: Subscription) -> Self {
        self.handler._subscriptions.push(subscription);
        self
    }

    pub fn build(self) -> Handler<C> {
        self.handler
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> MessageHandler for Handler<C> {
    fn target(&self) -> Target {
        self.target
    }

    async fn handle(&self, envelope: MessageEnvelope) -> HandlerResult<Reply> {
        let Some(entry) = self.actions.get(envelope.action.as_str()) else {
            warn!(
                target = %self.target,
                action = %envelope.action,
                "No operation for action, ignoring"
            );
            return Ok(None);
        };

        if let Some(type_name) = entry.type_name {
            let registered = self
                .registry
                .resolve(self.target, &envelope.action)
                .is_some_and(|schema| schema.type_name == type_name);
            if !registered {
                warn!(
                    target = %self.target,
                    action = %envelope.action,
                    "No registered schema for action, ignoring"
                );
                return Ok(None);
            }
        }

        debug!(target = %self.target, action = %envelope.action, "Handling message");
        (entry.operation)(Arc::clone(&self.context), envelope).await
    }

    fn actions(&self) -> Vec<&'static str> {
        let mut actions: Vec<_> = self.actions.keys().copied().collect();
        actions.sort_unstable();
        actions
    }
}

impl<C> std::fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("target", &self.target)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
