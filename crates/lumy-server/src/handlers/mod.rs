//! One handler per target.
//!
//! `parameters` has message schemas but no handler; its envelopes are
//! logged and dropped by the controller.

pub mod activity;
pub mod data_repository;
pub mod module_io;
pub mod notes;
pub mod workflow;

pub use activity::activity_handler;
pub use data_repository::data_repository_handler;
pub use module_io::module_io_handler;
pub use notes::notes_handler;
pub use workflow::workflow_handler;
