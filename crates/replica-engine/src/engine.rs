//! Engine context
//!
//! [`EngineContext`] owns every piece of long-lived engine state: the
//! metadata caches, the field registry, the converter chain, the lifecycle
//! coordinator and the capture-context pool. It is built once at startup,
//! installed into a [`Host`], and cleared on teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::cache::MetadataCache;
use crate::config::EngineOptions;
use crate::convert::{ConversionEngine, ConversionSession, FieldConverter};
use crate::error::EngineResult;
use crate::hook::CloneInterceptor;
use crate::host::{Host, NodeRef, TypeRegistry};
use crate::lifecycle::LifecycleCoordinator;
use crate::registry::FieldRegistry;
use crate::snapshot::{self, CaptureContext, ContextPool, RestoreSummary};

/// Running counters
#[derive(Debug, Default)]
pub struct EngineStats {
    captures: AtomicU64,
    restores: AtomicU64,
    discarded: AtomicU64,
    off_thread_refusals: AtomicU64,
}

impl EngineStats {
    pub(crate) fn record_capture(&self) {
        self.captures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restore(&self) {
        self.restores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refusal(&self) {
        self.off_thread_refusals.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the engine counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Captures that produced a context
    pub captures: u64,
    /// Contexts restored into a clone
    pub restores: u64,
    /// Contexts dropped without a restore
    pub discarded: u64,
    /// Hook calls refused off the owning thread
    pub off_thread_refusals: u64,
    /// Converter invocations
    pub conversions: u64,
}

/// Process-scoped clone engine state
pub struct EngineContext {
    options: EngineOptions,
    types: Arc<TypeRegistry>,
    cache: MetadataCache,
    registry: FieldRegistry,
    converters: ConversionEngine,
    lifecycle: Arc<LifecycleCoordinator>,
    pool: ContextPool,
    owner: ThreadId,
    stats: EngineStats,
}

impl EngineContext {
    /// Build an engine over `types`, owned by the calling thread
    pub fn new(types: Arc<TypeRegistry>, options: EngineOptions) -> Self {
        let options = options.normalized();
        Self {
            cache: MetadataCache::new(types.clone(), &options),
            registry: FieldRegistry::new(types.clone(), options.derived_capacity(), options.verbose_logging),
            converters: ConversionEngine::with_builtins(),
            lifecycle: Arc::new(LifecycleCoordinator::new(types.clone(), options.type_cache_capacity)),
            pool: ContextPool::new(),
            owner: thread::current().id(),
            stats: EngineStats::default(),
            types,
            options,
        }
    }

    /// Hand ownership to another thread
    pub fn with_owner(mut self, owner: ThreadId) -> Self {
        self.owner = owner;
        self
    }

    /// Bind this engine to `host`
    ///
    /// Installs the lifecycle coordinator as the host's gate and a
    /// [`CloneInterceptor`] as a clone hook.
    pub fn install(self: &Arc<Self>, host: &Host) {
        host.set_gate(self.lifecycle.clone());
        host.install_hook(Arc::new(CloneInterceptor::new(self.clone())));
    }

    /// Normalized options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Host type table
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Metadata caches
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Eligible-field registry
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Converter chain
    pub fn converters(&self) -> &ConversionEngine {
        &self.converters
    }

    /// Lifecycle coordinator, also the host's gate
    pub fn lifecycle(&self) -> &Arc<LifecycleCoordinator> {
        &self.lifecycle
    }

    /// Pool of capture contexts
    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Thread allowed to capture and restore
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// Whether the caller runs on the owning thread
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Add a converter ahead of the built-ins
    pub fn register_converter(&self, converter: Arc<dyn FieldConverter>) {
        self.converters.register_converter(converter);
    }

    /// Fresh conversion session without a reference remap
    pub fn session(&self) -> ConversionSession<'_> {
        ConversionSession::new(
            &self.converters,
            &self.cache,
            &self.registry,
            self.options.max_conversion_depth,
        )
        .verbose(self.options.verbose_logging)
    }

    /// Capture the graph below `root`; see [`snapshot::begin_capture`]
    pub fn begin_capture(&self, root: &NodeRef) -> EngineResult<Box<CaptureContext>> {
        let context = snapshot::begin_capture(self, root)?;
        self.stats.record_capture();
        Ok(context)
    }

    /// Restore `context` into the clone at `clone_root`; see [`snapshot::restore`]
    ///
    /// The context stays with the caller, who returns it with
    /// [`EngineContext::finish`].
    pub fn restore(&self, context: &mut CaptureContext, clone_root: &NodeRef) -> EngineResult<RestoreSummary> {
        let summary = snapshot::restore(self, context, clone_root)?;
        self.stats.record_restore();
        Ok(summary)
    }

    /// Return a restored context to the pool
    pub fn finish(&self, context: Box<CaptureContext>) {
        self.recycle(context);
    }

    /// Drop a context that will not be restored
    pub fn discard(&self, context: Box<CaptureContext>) {
        self.stats.record_discard();
        self.recycle(context);
    }

    fn recycle(&self, mut context: Box<CaptureContext>) {
        for ty in context.suppressed.drain() {
            self.lifecycle.release(ty);
        }
        self.pool.release(context);
    }

    pub(crate) fn counters(&self) -> &EngineStats {
        &self.stats
    }

    /// Current counter values
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            captures: self.stats.captures.load(Ordering::Relaxed),
            restores: self.stats.restores.load(Ordering::Relaxed),
            discarded: self.stats.discarded.load(Ordering::Relaxed),
            off_thread_refusals: self.stats.off_thread_refusals.load(Ordering::Relaxed),
            conversions: self.converters.invocations(),
        }
    }

    /// Forget every cached type and field list
    pub fn clear(&self) {
        self.cache.clear();
        self.registry.clear();
        self.lifecycle.clear();
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("options", &self.options)
            .field("owner", &self.owner)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
