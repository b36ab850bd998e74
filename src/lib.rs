#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

uniffi::setup_scaffolding!();

pub mod actions;
pub mod backend;
pub mod error;
pub mod ffi;
pub mod migration;
pub mod models;
pub mod render;
pub mod store;
pub mod template;

// Re-export common types for convenience
pub use error::{
    ActionError, ActionResult, CopyFormatError, CopyFormatResult, StorageError, StorageResult,
    StoreError, StoreResult, UnknownFormatKind,
};
pub use models::{CopyRequest, FormatKind, PreferenceState, SelectedFormat, Templates};
pub use render::render;
pub use store::{PreferenceStore, Subscription, Update};
