//! I/O mapping between the page namespace and the engine namespace.
//!
//! A workflow declares, per page, which page I/O ids bind to which pipeline
//! I/O ids. The [`IoMappingEngine`] answers lookups in both directions and
//! turns engine-level change events into page-scoped [`UpdatedIO`]
//! notifications.
//!
//! ```text
//!             forward (first declared binding wins)
//!   (page, page_io) ───────────────────────────────▶ (step | __pipeline__, io)
//!                   ◀───────────────────────────────
//!             reverse (every binding, declaration order)
//! ```
//!
//! The reverse map is derived data. It is rebuilt in full on every workflow
//! load and published together with the workflow as one immutable
//! [`MappingSnapshot`], so a lookup never sees a half-built map.

use std::collections::HashMap;
use std::sync::Arc;

use lumy_types::{LumyWorkflow, WorkflowPageMapping};
use parking_lot::RwLock;
use serde::Serialize;

use crate::engine::EngineIoChanged;

/// Which side of a step a binding sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoDirection {
    Input,
    Output,
}

impl IoDirection {
    /// `Input` when `is_input` is set.
    pub fn from_is_input(is_input: bool) -> Self {
        if is_input {
            IoDirection::Input
        } else {
            IoDirection::Output
        }
    }
}

/// Page-scoped change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedIO {
    /// Page id.
    pub step_id: String,
    /// Page I/O ids whose values changed.
    pub io_ids: Vec<String>,
}

/// One reverse entry: a page I/O bound to some engine I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIoRef {
    pub page_id: String,
    pub io_id: String,
}

/// Reverse bindings of one engine step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReverseIoMappings {
    pub inputs: HashMap<String, Vec<PageIoRef>>,
    pub outputs: HashMap<String, Vec<PageIoRef>>,
}

impl ReverseIoMappings {
    fn side(&self, direction: IoDirection) -> &HashMap<String, Vec<PageIoRef>> {
        match direction {
            IoDirection::Input => &self.inputs,
            IoDirection::Output => &self.outputs,
        }
    }

    fn side_mut(&mut self, direction: IoDirection) -> &mut HashMap<String, Vec<PageIoRef>> {
        match direction {
            IoDirection::Input => &mut self.inputs,
            IoDirection::Output => &mut self.outputs,
        }
    }
}

/// Reverse bindings keyed by engine step id (or `__pipeline__`).
pub type ReverseMappings = HashMap<String, ReverseIoMappings>;

/// Build the reverse map of a workflow from scratch.
///
/// Duplicate bindings are kept as declared.
pub fn build_reverse_io_mappings(workflow: &LumyWorkflow) -> ReverseMappings {
    let mut lookup = ReverseMappings::new();

    for page in &workflow.ui.pages {
        let Some(mapping) = &page.mapping else {
            continue;
        };
        let sides = [
            (IoDirection::Input, &mapping.inputs),
            (IoDirection::Output, &mapping.outputs),
        ];
        for (direction, bindings) in sides {
            for binding in bindings {
                lookup
                    .entry(binding.engine_step_id().to_string())
                    .or_default()
                    .side_mut(direction)
                    .entry(binding.workflow_io_id.clone())
                    .or_default()
                    .push(PageIoRef {
                        page_id: page.id.clone(),
                        io_id: binding.page_io_id.clone(),
                    });
            }
        }
    }

    lookup
}

/// A loaded workflow together with its derived reverse map.
#[derive(Debug, Default)]
pub struct MappingSnapshot {
    workflow: Option<Arc<LumyWorkflow>>,
    reverse: ReverseMappings,
}

impl MappingSnapshot {
    /// Build a snapshot for a workflow.
    pub fn new(workflow: Arc<LumyWorkflow>) -> Self {
        let reverse = build_reverse_io_mappings(&workflow);
        Self {
            workflow: Some(workflow),
            reverse,
        }
    }

    /// The workflow this snapshot was built from.
    pub fn workflow(&self) -> Option<&Arc<LumyWorkflow>> {
        self.workflow.as_ref()
    }

    /// The reverse map.
    pub fn reverse(&self) -> &ReverseMappings {
        &self.reverse
    }

    /// Forward lookup: page I/O → `(engine step id, engine io id)`.
    pub fn resolve_engine_io(
        &self,
        page_id: &str,
        io_id: &str,
        direction: IoDirection,
    ) -> Option<(String, String)> {
        let page = self.workflow.as_ref()?.page(page_id)?;
        let mapping = page.mapping.as_ref()?;
        let bindings: &[WorkflowPageMapping] = match direction {
            IoDirection::Input => &mapping.inputs,
            IoDirection::Output => &mapping.outputs,
        };
        bindings
            .iter()
            .find(|binding| binding.page_io_id == io_id)
            .map(|binding| {
                (
                    binding.engine_step_id().to_string(),
                    binding.workflow_io_id.clone(),
                )
            })
    }

    /// Reverse lookup: engine I/O → every bound `(page id, page io id)`.
    pub fn resolve_page_ios(
        &self,
        step_id: &str,
        io_id: &str,
        direction: IoDirection,
    ) -> Vec<(String, String)> {
        self.reverse
            .get(step_id)
            .and_then(|mappings| mappings.side(direction).get(io_id))
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.page_id.clone(), entry.io_id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Translate an engine change event into one notification per page.
    ///
    /// Pages appear in the order they were first touched. All page I/O ids of
    /// one page are batched into a single notification, without dedup.
    pub fn fan_out(&self, changed: &EngineIoChanged, direction: IoDirection) -> Vec<UpdatedIO> {
        let mut updates: Vec<UpdatedIO> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (step_id, io_ids) in changed.iter() {
            for io_id in io_ids {
                for (page_id, page_io_id) in self.resolve_page_ios(step_id, io_id, direction) {
                    match positions.get(&page_id) {
                        Some(&index) => updates[index].io_ids.push(page_io_id),
                        None => {
                            positions.insert(page_id.clone(), updates.len());
                            updates.push(UpdatedIO {
                                step_id: page_id,
                                io_ids: vec![page_io_id],
                            });
                        }
                    }
                }
            }
        }

        updates
    }
}

/// Holder of the current [`MappingSnapshot`], swapped atomically on rebuild.
#[derive(Debug, Default)]
pub struct IoMappingEngine {
    current: RwLock<Arc<MappingSnapshot>>,
}

impl IoMappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild for a newly loaded workflow.
    ///
    /// The new snapshot is built off to the side; readers keep the old one
    /// until the swap.
    pub fn rebuild(&self, workflow: Arc<LumyWorkflow>) {
        let snapshot = Arc::new(MappingSnapshot::new(workflow));
        *self.current.write() = snapshot;
    }

    /// Forget the current workflow.
    pub fn clear(&self) {
        *self.current.write() = Arc::new(MappingSnapshot::default());
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// See [`MappingSnapshot::resolve_engine_io`].
    pub fn resolve_engine_io(
        &self,
        page_id: &str,
        io_id: &str,
        direction: IoDirection,
    ) -> Option<(String, String)> {
        self.snapshot().resolve_engine_io(page_id, io_id, direction)
    }

    /// See [`MappingSnapshot::resolve_page_ios`].
    pub fn resolve_page_ios(
        &self,
        step_id: &str,
        io_id: &str,
        direction: IoDirection,
    ) -> Vec<(String, String)> {
        self.snapshot().resolve_page_ios(step_id, io_id, direction)
    }

    /// See [`MappingSnapshot::fan_out`].
    pub fn fan_out(&self, changed: &EngineIoChanged, direction: IoDirection) -> Vec<UpdatedIO> {
        self.snapshot().fan_out(changed, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumy_types::PIPELINE_ID;
    use serde_json::json;

    fn workflow() -> Arc<LumyWorkflow> {
        Arc::new(
            serde_json::from_value(json!({
                "meta": {"label": "Mapping"},
                "processing": {"workflow": {"name": "mapping"}},
                "ui": {"pages": [
                    {"id": "P", "mapping": {
                        "inputs": [
                            {"pageIoId": "a", "workflowIoId": "x"},
                            {"pageIoId": "a", "workflowIoId": "shadowed"}
                        ],
                        "outputs": [
                            {"pageIoId": "out", "workflowIoId": "y", "workflowStepId": "s1"}
                        ]
                    }},
                    {"id": "Q"}
                ]}
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_forward_lookup_first_binding_wins() {
        let snapshot = MappingSnapshot::new(workflow());
        assert_eq!(
            snapshot.resolve_engine_io("P", "a", IoDirection::Input),
            Some((PIPELINE_ID.to_string(), "x".to_string()))
        );
        assert_eq!(
            snapshot.resolve_engine_io("P", "out", IoDirection::Output),
            Some(("s1".to_string(), "y".to_string()))
        );
    }

    #[test]
    fn test_forward_lookup_misses() {
        let snapshot = MappingSnapshot::new(workflow());
        assert_eq!(snapshot.resolve_engine_io("P", "a", IoDirection::Output), None);
        assert_eq!(snapshot.resolve_engine_io("Q", "a", IoDirection::Input), None);
        assert_eq!(snapshot.resolve_engine_io("nope", "a", IoDirection::Input), None);
        assert_eq!(
            MappingSnapshot::default().resolve_engine_io("P", "a", IoDirection::Input),
            None
        );
    }

    #[test]
    fn test_reverse_lookup_unbound_step_is_empty() {
        let snapshot = MappingSnapshot::new(workflow());
        assert!(snapshot.resolve_page_ios("s9", "y", IoDirection::Output).is_empty());
        assert!(snapshot.resolve_page_ios("s1", "y", IoDirection::Input).is_empty());
    }

    #[test]
    fn test_rebuild_swaps_snapshot() {
        let engine = IoMappingEngine::new();
        let before = engine.snapshot();
        assert!(before.workflow().is_none());

        engine.rebuild(workflow());
        assert!(before.workflow().is_none());
        assert_eq!(
            engine.resolve_page_ios(PIPELINE_ID, "x", IoDirection::Input),
            vec![("P".to_string(), "a".to_string())]
        );

        engine.clear();
        assert!(engine.snapshot().workflow().is_none());
    }

    #[test]
    fn test_fan_out_empty_event() {
        let engine = IoMappingEngine::new();
        engine.rebuild(workflow());
        assert!(engine
            .fan_out(&EngineIoChanged::new(), IoDirection::Input)
            .is_empty());
    }
}
