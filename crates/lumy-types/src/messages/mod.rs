//! Message schemas, one module per target.
//!
//! Type names follow `Msg<TargetToken><Action>`; see [`crate::classify`].
//! All schemas use camelCase field names on the wire.

pub mod activity;
pub mod data_repository;
pub mod module_io;
pub mod notes;
pub mod parameters;
pub mod workflow;

pub use activity::*;
pub use data_repository::*;
pub use module_io::*;
pub use notes::*;
pub use parameters::*;
pub use workflow::*;

use crate::Message;

/// Type names of every known schema, in registration order.
pub const ALL_TYPE_NAMES: &[&str] = &[
    // activity
    MsgError::TYPE_NAME,
    MsgExecutionState::TYPE_NAME,
    MsgProgress::TYPE_NAME,
    // data_repository
    MsgDataRepositoryCreateSubset::TYPE_NAME,
    MsgDataRepositoryFindItems::TYPE_NAME,
    MsgDataRepositoryItems::TYPE_NAME,
    MsgDataRepositorySubset::TYPE_NAME,
    MsgDataRepositoryGetItemValue::TYPE_NAME,
    MsgDataRepositoryItemValue::TYPE_NAME,
    // module_io
    MsgModuleIOExecute::TYPE_NAME,
    MsgModuleIOGetInputValue::TYPE_NAME,
    MsgModuleIOGetOutputValue::TYPE_NAME,
    MsgModuleIOGetPreview::TYPE_NAME,
    MsgModuleIOInputValue::TYPE_NAME,
    MsgModuleIOInputValuesUpdated::TYPE_NAME,
    MsgModuleIOOutputValue::TYPE_NAME,
    MsgModuleIOOutputValuesUpdated::TYPE_NAME,
    MsgModuleIOPreviewUpdated::TYPE_NAME,
    MsgModuleIOUpdateInputValues::TYPE_NAME,
    MsgModuleIOUpdatePreviewParameters::TYPE_NAME,
    // notes
    MsgNotesAdd::TYPE_NAME,
    MsgNotesDelete::TYPE_NAME,
    MsgNotesGetNotes::TYPE_NAME,
    MsgNotesNotes::TYPE_NAME,
    MsgNotesUpdate::TYPE_NAME,
    // parameters
    MsgParametersCreateSnapshot::TYPE_NAME,
    MsgParametersSnapshots::TYPE_NAME,
    // workflow
    MsgWorkflowUpdated::TYPE_NAME,
    MsgWorkflowLoadLumyWorkflow::TYPE_NAME,
    MsgWorkflowLumyWorkflowLoadProgress::TYPE_NAME,
    MsgWorkflowGetWorkflowList::TYPE_NAME,
    MsgWorkflowWorkflowList::TYPE_NAME,
    MsgWorkflowExecute::TYPE_NAME,
    MsgWorkflowExecutionResult::TYPE_NAME,
    MsgWorkflowPageComponentsCode::TYPE_NAME,
];
