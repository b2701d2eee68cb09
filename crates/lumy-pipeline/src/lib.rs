//! Backend collaborator for the Lumy middleware.
//!
//! Message handlers talk to a [`Backend`] in page terms. The crate ships two
//! backends and everything they need:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  EngineBackend                                           │
//! │  - IoMappingEngine: page I/O  ⇄  pipeline step I/O       │
//! │  - ProcessingEngine (LocalEngine: ordered built-ins)     │
//! │  - fans engine change events out as page UpdatedIO       │
//! ├──────────────────────────────────────────────────────────┤
//! │  MockBackend                                             │
//! │  - page-level value store, no engine                     │
//! └──────────────────────────────────────────────────────────┘
//!      shared: WorkflowCatalog, DataRegistry, EventHub,
//!              table shaping, page component code
//! ```

pub mod backend;
pub mod catalog;
pub mod components;
pub mod data_registry;
pub mod engine;
pub mod engine_backend;
pub mod error;
pub mod events;
pub mod local;
pub mod mapping;
pub mod mock;
pub mod table;

pub use backend::{Backend, BackendEvents, ExecuteRequest, IoValue, LoadProgress, WorkflowSource};
pub use catalog::{WorkflowCatalog, load_workflow_file, parse_workflow};
pub use components::{content_hash, page_components_code};
pub use data_registry::{
    DataRegistry, DataRegistryItem, InMemoryDataRegistry, ItemQuery, QueryOp, StoredValue,
};
pub use engine::{EngineIoChanged, ProcessingEngine};
pub use engine_backend::EngineBackend;
pub use error::{BackendError, Result};
pub use events::{EventHub, Subscription};
pub use local::{BuiltinModule, LocalEngine};
pub use mapping::{
    IoDirection, IoMappingEngine, MappingSnapshot, PageIoRef, ReverseMappings, UpdatedIO,
    build_reverse_io_mappings,
};
pub use mock::MockBackend;
pub use table::shape_value;
