//! The `Message` trait and type-name based target/action derivation.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{MessageEnvelope, Result, Target};

/// Prefix shared by every message schema type name.
pub const MESSAGE_PREFIX: &str = "Msg";

/// Split a schema type name into its target and action.
///
/// The `Msg` prefix is stripped, then the first matching target token
/// (`ModuleIO`, `Workflow`, `DataRepository`, `Parameters`, `Notes`) is
/// stripped to produce the action. Names with no target token belong to
/// [`Target::Activity`]. Returns `None` when the name lacks the `Msg`
/// prefix or when nothing is left for the action.
pub fn classify(type_name: &str) -> Option<(Target, &str)> {
    let rest = type_name.strip_prefix(MESSAGE_PREFIX)?;

    let (target, action) = Target::PREFIXED
        .into_iter()
        .find_map(|target| {
            rest.strip_prefix(target.type_token())
                .map(|action| (target, action))
        })
        .unwrap_or((Target::Activity, rest));

    if action.is_empty() {
        None
    } else {
        Some((target, action))
    }
}

/// A typed message schema.
///
/// The target and action are never declared by hand; they are derived from
/// [`Message::TYPE_NAME`] with [`classify`].
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Schema type name, e.g. `MsgModuleIOInputValue`.
    const TYPE_NAME: &'static str;

    /// Target this schema travels on.
    fn target() -> Target {
        classify(Self::TYPE_NAME)
            .map(|(target, _)| target)
            .unwrap_or(Target::Activity)
    }

    /// Action name of this schema within its target.
    fn action() -> &'static str {
        classify(Self::TYPE_NAME)
            .map(|(_, action)| action)
            .unwrap_or(Self::TYPE_NAME)
    }

    /// Wrap this message into an envelope carrying its own action.
    fn to_envelope(&self) -> Result<MessageEnvelope> {
        MessageEnvelope::from_message(self)
    }
}

/// Implement [`Message`] for schema types, using the Rust type name as the
/// schema type name.
#[macro_export]
macro_rules! message_types {
    ($($ty:ident),* $(,)?) => {
        $(
            impl $crate::Message for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);
            }
        )*
    };
}
