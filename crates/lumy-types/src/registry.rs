//! The `(target, action) → schema` table.

use std::collections::HashMap;

use crate::messages::ALL_TYPE_NAMES;
use crate::{Message, ProtocolError, Result, Target, classify};

/// A registered message schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSchema {
    pub type_name: &'static str,
    pub target: Target,
    pub action: &'static str,
}

impl MessageSchema {
    /// Derive a schema entry from its type name.
    pub fn from_type_name(type_name: &'static str) -> Result<Self> {
        let (target, action) = classify(type_name)
            .ok_or_else(|| ProtocolError::InvalidTypeName(type_name.to_string()))?;
        Ok(Self {
            type_name,
            target,
            action,
        })
    }

    /// Schema entry for a [`Message`] type.
    pub fn of<M: Message>() -> Result<Self> {
        Self::from_type_name(M::TYPE_NAME)
    }
}

/// Read-only registry of message schemas.
///
/// Built with [`TargetRegistry::builder`] (or [`TargetRegistry::standard`])
/// before any message is processed, then shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    schemas: HashMap<Target, HashMap<&'static str, MessageSchema>>,
}

/// Builder that rejects duplicate `(target, action)` pairs.
#[derive(Debug, Default)]
pub struct TargetRegistryBuilder {
    schemas: HashMap<Target, HashMap<&'static str, MessageSchema>>,
}

impl TargetRegistryBuilder {
    /// Register a schema by type name.
    pub fn register_type_name(&mut self, type_name: &'static str) -> Result<&mut Self> {
        let schema = MessageSchema::from_type_name(type_name)?;
        let actions = self.schemas.entry(schema.target).or_default();
        if let Some(existing) = actions.get(schema.action) {
            return Err(ProtocolError::DuplicateAction {
                target: schema.target,
                action: schema.action.to_string(),
                existing: existing.type_name,
                duplicate: type_name,
            });
        }
        actions.insert(schema.action, schema);
        Ok(self)
    }

    /// Register a [`Message`] type.
    pub fn register<M: Message>(&mut self) -> Result<&mut Self> {
        self.register_type_name(M::TYPE_NAME)
    }

    /// Freeze the registry.
    pub fn build(self) -> TargetRegistry {
        TargetRegistry {
            schemas: self.schemas,
        }
    }
}

impl TargetRegistry {
    /// Start an empty registry.
    pub fn builder() -> TargetRegistryBuilder {
        TargetRegistryBuilder::default()
    }

    /// Registry holding every schema in [`crate::messages`].
    pub fn standard() -> Result<Self> {
        let mut builder = Self::builder();
        for &type_name in ALL_TYPE_NAMES {
            builder.register_type_name(type_name)?;
        }
        Ok(builder.build())
    }

    /// Look up the schema for an action on a target.
    pub fn resolve(&self, target: Target, action: &str) -> Option<&MessageSchema> {
        self.schemas.get(&target)?.get(action)
    }

    /// Registered actions of a target, sorted.
    pub fn actions(&self, target: Target) -> Vec<&'static str> {
        let mut actions: Vec<_> = self
            .schemas
            .get(&target)
            .map(|a| a.keys().copied().collect())
            .unwrap_or_default();
        actions.sort_unstable();
        actions
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.values().map(HashMap::len).sum()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
