//! Protocol types shared by the Lumy middleware.
//!
//! Every message that crosses the client boundary is a [`MessageEnvelope`]
//! travelling on one [`Target`] channel. Concrete message schemas live in
//! [`messages`]; each one implements [`Message`], which derives its target
//! and action from the schema's type name:
//!
//! ```text
//! MsgModuleIOGetInputValue   →  (module_io, "GetInputValue")
//! MsgWorkflowUpdated         →  (workflow,  "Updated")
//! MsgExecutionState          →  (activity,  "ExecutionState")
//! ```
//!
//! The [`TargetRegistry`] is the read-only `(target, action) → schema` table
//! built once at start-up.

pub mod envelope;
pub mod error;
pub mod filter;
pub mod message;
pub mod messages;
pub mod registry;
pub mod target;
pub mod workflow;

pub use envelope::MessageEnvelope;
pub use error::{ProtocolError, Result};
pub use filter::{
    DataTabularDataFilter, DataTabularDataFilterCondition, DataTabularDataFilterItem,
    DataTabularDataSortingMethod, Direction, FilterOperator, TableStats,
};
pub use message::{MESSAGE_PREFIX, Message, classify};
pub use registry::{MessageSchema, TargetRegistry};
pub use target::Target;
pub use workflow::{
    LumyWorkflow, Metadata, PIPELINE_ID, PageMeta, PipelineDefinition, PipelineInput,
    ProcessingConfig, StepDefinition, UiConfig, WorkflowListItem, WorkflowMeta,
    WorkflowPageComponent, WorkflowPageDetails, WorkflowPageMapping, WorkflowPageMappings,
};
