//! Error types for the host model and the clone engine

use crate::host::TypeHandle;

/// Failures raised by the host object model
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// Type handle does not belong to the registry
    #[error("Unknown type handle: {0:?}")]
    UnknownType(TypeHandle),

    /// Field slot outside of the holder's storage
    #[error("Field slot {slot} out of range for {type_name} ({len} slots)")]
    SlotOutOfRange {
        /// Holder type name
        type_name: String,
        /// Requested slot
        slot: usize,
        /// Available slots
        len: usize,
    },

    /// Static and constant fields have no instance storage
    #[error("Field '{0}' has no instance storage")]
    NotAnInstanceField(String),

    /// Value cannot hold fields
    #[error("Value of kind '{0}' cannot hold fields")]
    NotAFieldHolder(&'static str),

    /// Dictionary already contains the key
    #[error("Duplicate dictionary key: {0}")]
    DuplicateKey(String),

    /// Dictionaries reject null keys
    #[error("Dictionary keys cannot be null")]
    NullKey,

    /// Type cannot be default-constructed
    #[error("Type '{0}' cannot be constructed")]
    NotConstructible(String),

    /// Fields can only be added before a type is used as a base
    #[error("Type '{0}' is already used as a base type")]
    TypeSealed(String),

    /// A lifecycle callback reported a failure
    #[error("Callback failed: {0}")]
    Callback(String),

    /// Only nodes and components can be instantiated
    #[error("Value of kind '{0}' cannot be instantiated")]
    NotInstantiable(&'static str),
}

/// Failures raised while capturing, converting or restoring state
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Host-level failure
    #[error(transparent)]
    Host(#[from] HostError),

    /// Called off the owning thread
    #[error("Clone engine invoked off its owning thread")]
    WrongThread,

    /// Source or result is not a graph node or component
    #[error("Value of kind '{0}' is not a graph node")]
    NotAGraphNode(&'static str),

    /// Context chain grew past the configured limit
    #[error("Conversion depth {0} exceeds the configured limit")]
    DepthExceeded(usize),

    /// A converter failed on its own terms
    #[error("Converter '{converter}' failed: {message}")]
    Converter {
        /// Converter name
        converter: String,
        /// Failure description
        message: String,
    },
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
