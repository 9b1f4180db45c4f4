//! Replica Clone Engine
//!
//! This crate extends a scene-graph runtime's native clone so that the copy
//! also carries the fields the host's serializer drops or shares:
//! - **Host**: the object-graph runtime being extended (`host` module)
//! - **Conversion**: converter chain with cycle handling (`convert` module)
//! - **Snapshots**: capture before the clone, restore after it (`snapshot` module)
//! - **Lifecycle**: callback suppression and deferred wake-up (`lifecycle` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use replica_engine::{EngineContext, EngineOptions, FieldDef, Host, NodeRef, TypeDef, Value};
//!
//! let host = Host::new();
//! let types = host.types().clone();
//! let inventory = types.dictionary_of(types.string(), types.int());
//! let bag = types.define(TypeDef::component("Bag").field(FieldDef::public("items", inventory)));
//!
//! let engine = Arc::new(EngineContext::new(types.clone(), EngineOptions::default()));
//! engine.install(&host);
//!
//! let root = NodeRef::new("player");
//! host.add_component(&root, bag).unwrap();
//! let clone = host.instantiate(&Value::Node(root)).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Host object-graph runtime
pub mod host;

/// Bounded metadata caches
pub mod cache;

/// Type classification predicates
pub mod classify;

/// Eligible-field registry
pub mod registry;

/// Converter chain
pub mod convert;

/// Capture and restore of node snapshots
pub mod snapshot;

/// Lifecycle suppression and deferred callbacks
pub mod lifecycle;

/// Host clone hook
pub mod hook;

/// Process-scoped engine context
pub mod engine;

/// Engine options
pub mod config;

/// Error types
pub mod error;

// ============================================================================
// Re-exports
// ============================================================================

pub use host::{
    // Types
    CallbackKind, FieldAttributes, FieldDef, FieldInfo, TypeDef, TypeHandle, TypeInfo, TypeKind,
    TypeOrigin, TypeRegistry,
    // Values
    ArrayRef, DictRef, ListRef, ObjectRef, StructValue, Value,
    // Graph
    ComponentRef, NodeRef,
    // Runtime
    CloneHook, Host, LifecycleGate,
};

pub use convert::{
    ConversionContext, ConversionEngine, ConversionSession, CycleGuard, FieldConverter,
    ReferenceRemap,
};

pub use snapshot::{
    CaptureContext, ComponentState, ContextPool, FieldSnapshot, RestoreSummary, StructuralPath,
};

pub use cache::{BoundedCache, FieldAccessor, MetadataCache};
pub use config::{ConfigError, EngineOptions};
pub use engine::{EngineContext, EngineStats, StatsSnapshot};
pub use error::{EngineError, EngineResult, HostError};
pub use hook::CloneInterceptor;
pub use lifecycle::LifecycleCoordinator;
pub use registry::FieldRegistry;
