//! Clone interceptor
//!
//! Binds the engine to the host's clone hook points. Nothing raised inside
//! the engine, error or panic, reaches the host: failures are logged and the
//! clone keeps whatever the native copy produced.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::engine::EngineContext;
use crate::host::{CloneHook, Value};
use crate::snapshot::{graph_root, CaptureContext};

/// [`CloneHook`] that captures before and restores after every native clone
pub struct CloneInterceptor {
    engine: Arc<EngineContext>,
}

impl CloneInterceptor {
    /// Interceptor driving `engine`
    pub fn new(engine: Arc<EngineContext>) -> Self {
        Self { engine }
    }

    /// Engine this interceptor drives
    pub fn engine(&self) -> &Arc<EngineContext> {
        &self.engine
    }
}

impl CloneHook for CloneInterceptor {
    fn on_before_clone(&self, source: &Value) -> Option<Box<dyn Any + Send>> {
        if !self.engine.is_owner_thread() {
            self.engine.counters().record_refusal();
            if self.engine.options().verbose_logging {
                debug!(thread = ?std::thread::current().id(), "clone off the owning thread; native copy only");
            }
            return None;
        }
        let root = match graph_root(source) {
            Ok(root) => root,
            Err(err) => {
                warn!(error = %err, "clone source skipped");
                return None;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| self.engine.begin_capture(&root))) {
            Ok(Ok(context)) => Some(Box::new(context)),
            Ok(Err(err)) => {
                warn!(error = %err, node = %root.name(), "capture failed");
                None
            }
            Err(_) => {
                error!(node = %root.name(), "capture panicked");
                None
            }
        }
    }

    fn on_after_clone(&self, state: Box<dyn Any + Send>, result: Option<&Value>) {
        let mut context = match state.downcast::<Box<CaptureContext>>() {
            Ok(context) => *context,
            Err(_) => {
                error!("clone hook received a foreign state");
                return;
            }
        };
        let Some(result) = result else {
            warn!("native clone failed; discarding captured state");
            self.engine.discard(context);
            return;
        };
        let clone_root = match graph_root(result) {
            Ok(root) => root,
            Err(err) => {
                error!(error = %err, "clone result is not part of a graph");
                self.engine.discard(context);
                return;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| self.engine.restore(&mut context, &clone_root))) {
            Ok(Ok(summary)) => {
                if self.engine.options().verbose_logging {
                    debug!(?summary, node = %clone_root.name(), "clone restored");
                }
                self.engine.finish(context);
            }
            Ok(Err(err)) => {
                warn!(error = %err, "restore failed");
                self.engine.discard(context);
            }
            Err(_) => {
                error!(node = %clone_root.name(), "restore panicked");
                self.engine.discard(context);
            }
        }
    }
}
