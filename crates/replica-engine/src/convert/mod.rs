//! Conversion engine
//!
//! Values are deep-copied by a chain of [`FieldConverter`]s, one per value
//! shape. Converters registered later take precedence over earlier ones, and
//! converters named by a field's `use_converter` attribute are tried before
//! the chain. Converters recurse through the engine for nested values, using
//! the context chain and the session's cycle guard to terminate on cycles.
//!
//! Failures never escape: a converter error or a context chain deeper than
//! the configured limit is logged and yields `Null`, which callers treat as
//! "leave the destination untouched".
//!
//! Deep acyclic data recurses as deep as it is long. Every
//! [`STACK_SEGMENT_DEPTH`] levels the conversion continues on a scoped helper
//! thread with a fresh [`SEGMENT_STACK_SIZE`] stack while the caller waits,
//! so chain length is bounded by `max_conversion_depth` and not by the
//! caller's stack.

pub mod context;
pub mod converters;
pub mod guard;
pub mod remap;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::host::Value;

pub use context::{ConversionContext, ConversionSession};
pub use converters::{
    ArrayConverter, ClassConverter, DictionaryConverter, HostClassConverter, HostObjectConverter,
    ListConverter, StringConverter, StructConverter,
};
pub use guard::{CycleGuard, GuardScope};
pub use remap::ReferenceRemap;

/// Context levels converted on one stack before moving to a fresh one
pub const STACK_SEGMENT_DEPTH: usize = 128;

/// Stack size of the helper thread that continues a deep conversion
pub const SEGMENT_STACK_SIZE: usize = 16 * 1024 * 1024;

/// A pluggable converter for one value shape
pub trait FieldConverter: Send + Sync {
    /// Name used by `use_converter` field attributes
    fn name(&self) -> &str;

    /// Whether this converter handles the context's value
    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool;

    /// Produce the converted value
    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value>;
}

/// Prioritized converter chain
pub struct ConversionEngine {
    chain: RwLock<Vec<Arc<dyn FieldConverter>>>,
    named: RwLock<FxHashMap<Arc<str>, Arc<dyn FieldConverter>>>,
    invocations: AtomicU64,
}

impl ConversionEngine {
    /// Create an engine with no converters
    pub fn new() -> Self {
        Self {
            chain: RwLock::new(Vec::new()),
            named: RwLock::new(FxHashMap::default()),
            invocations: AtomicU64::new(0),
        }
    }

    /// Create an engine with the built-in converters
    pub fn with_builtins() -> Self {
        let engine = Self::new();
        engine.register_converter(Arc::new(ClassConverter));
        engine.register_converter(Arc::new(StringConverter));
        engine.register_converter(Arc::new(StructConverter));
        engine.register_converter(Arc::new(HostClassConverter));
        engine.register_converter(Arc::new(HostObjectConverter));
        engine.register_converter(Arc::new(ArrayConverter));
        engine.register_converter(Arc::new(ListConverter));
        engine.register_converter(Arc::new(DictionaryConverter));
        engine
    }

    /// Add a converter ahead of every converter registered so far
    pub fn register_converter(&self, converter: Arc<dyn FieldConverter>) {
        let name: Arc<str> = Arc::from(converter.name());
        self.named.write().insert(name, converter.clone());
        self.chain.write().push(converter);
    }

    /// Converter registered under `name`
    pub fn converter(&self, name: &str) -> Option<Arc<dyn FieldConverter>> {
        self.named.read().get(name).cloned()
    }

    /// Names of the chain, highest priority first
    pub fn converter_names(&self) -> Vec<String> {
        self.chain
            .read()
            .iter()
            .rev()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Number of converter runs since creation
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Convert the context's value with the first converter that accepts it
    ///
    /// Returns the original value when no converter matches and `Null` when
    /// conversion failed.
    pub fn convert_if_needed(&self, ctx: &ConversionContext<'_>) -> Value {
        let session = ctx.session();
        if ctx.depth() > session.max_depth() {
            let err = EngineError::DepthExceeded(ctx.depth());
            warn!(error = %err, "leaving value untouched");
            return Value::Null;
        }

        if ctx.depth() > 0 && ctx.depth() % STACK_SEGMENT_DEPTH == 0 {
            return self.convert_on_fresh_stack(ctx);
        }
        self.dispatch(ctx)
    }

    /// Continue a deep conversion on a helper thread with its own stack
    ///
    /// Falls back to the current stack when the thread cannot be spawned.
    fn convert_on_fresh_stack(&self, ctx: &ConversionContext<'_>) -> Value {
        thread::scope(|scope| {
            let spawned = thread::Builder::new()
                .name("replica-convert".into())
                .stack_size(SEGMENT_STACK_SIZE)
                .spawn_scoped(scope, || self.dispatch(ctx));
            match spawned {
                Ok(handle) => handle.join().unwrap_or_else(|_| {
                    warn!(depth = ctx.depth(), "conversion panicked on a helper stack");
                    Value::Null
                }),
                Err(err) => {
                    warn!(error = %err, "no helper stack; continuing in place");
                    self.dispatch(ctx)
                }
            }
        })
    }

    fn dispatch(&self, ctx: &ConversionContext<'_>) -> Value {
        for name in ctx.forced_converters() {
            match self.converter(name) {
                Some(converter) if converter.can_convert(ctx) => return self.run(converter.as_ref(), ctx),
                Some(_) => {}
                None => warn!(converter = %name, "field requests an unknown converter"),
            }
        }

        let chosen = self
            .chain
            .read_recursive()
            .iter()
            .rev()
            .find(|converter| converter.can_convert(ctx))
            .cloned();
        match chosen {
            Some(converter) => self.run(converter.as_ref(), ctx),
            None => ctx.value().clone(),
        }
    }

    fn run(&self, converter: &dyn FieldConverter, ctx: &ConversionContext<'_>) -> Value {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let verbose = ctx.session().is_verbose();
        if verbose {
            debug!(
                converter = converter.name(),
                ty = %ctx.session().types().name_of(ctx.value_type()),
                depth = ctx.depth(),
                "converting"
            );
        }
        match converter.convert(ctx) {
            Ok(value) => {
                if verbose {
                    debug!(converter = converter.name(), result = ?value, "converted");
                }
                value
            }
            Err(err) => {
                warn!(
                    converter = converter.name(),
                    field = ctx.field().map(|f| f.name.to_string()).unwrap_or_default(),
                    error = %err,
                    "conversion failed; leaving value untouched"
                );
                Value::Null
            }
        }
    }
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEngine")
            .field("chain", &self.converter_names())
            .field("invocations", &self.invocations())
            .finish()
    }
}
