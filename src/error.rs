//! Error types for copyfmt
//!
//! Storage, store and action failures each get their own enum; `CopyFormatError`
//! wraps them for the FFI surface.

use thiserror::Error;

/// Storage backend errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Reading or writing the underlying medium failed
    #[error("I/O error on record '{key}': {reason}")]
    Io { key: String, reason: String },

    /// Key cannot be mapped onto the backend's namespace
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend is not usable at all
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Create an I/O error for a record
    pub fn io(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Io {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }

    /// Create an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

/// Result type for backend operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Preference store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Durable state could not be read or written
    #[error("Preference storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Stored record exists but cannot be understood
    #[error("Corrupt preference record '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },

    /// State could not be encoded for storage
    #[error("Failed to serialize preference state: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Create a corrupt record error
    pub fn corrupt_record(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl ToString) -> Self {
        Self::Serialization(reason.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors caught at the action boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No usable active tab
    #[error("No active tab")]
    NoActiveTab,

    /// Active tab is missing its title, url or id
    #[error("Active tab has no {field}")]
    IncompleteTabData { field: &'static str },

    /// Clipboard collaborator reported a failure
    #[error("Failed to write to clipboard: {0}")]
    ClipboardWriteFailed(String),

    /// Search overlay could not be toggled in the tab
    #[error("Failed to toggle search overlay: {0}")]
    OverlayToggleFailed(String),
}

impl ActionError {
    /// Create an incomplete tab data error
    #[must_use]
    pub const fn incomplete(field: &'static str) -> Self {
        Self::IncompleteTabData { field }
    }
}

/// Result type for actions
pub type ActionResult<T> = Result<T, ActionError>;

/// A format name outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown format kind: {0}")]
pub struct UnknownFormatKind(pub String);

/// Main unified error type that can represent any copyfmt error
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum CopyFormatError {
    /// Backend error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Action error
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Format name error
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormatKind),
}

/// Result type for copyfmt operations
pub type CopyFormatResult<T> = Result<T, CopyFormatError>;
