//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use replica_engine::{
    CallbackKind, ComponentRef, EngineContext, EngineOptions, FieldDef, Host, NodeRef, TypeDef,
    TypeHandle, TypeRegistry, Value,
};

/// Install a test-writer subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A host with an installed engine
pub struct World {
    pub host: Host,
    pub types: Arc<TypeRegistry>,
    pub engine: Arc<EngineContext>,
}

impl World {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        init_tracing();
        let host = Host::new();
        let types = host.types().clone();
        let engine = Arc::new(EngineContext::new(types.clone(), options));
        engine.install(&host);
        Self { host, types, engine }
    }

    /// Clone `node` through the host and return the clone root
    pub fn instantiate(&self, node: &NodeRef) -> NodeRef {
        let clone = self.host.instantiate(&Value::Node(node.clone())).unwrap();
        clone.as_node().unwrap().clone()
    }

    /// Attach a component, running its activation callbacks
    pub fn add(&self, node: &NodeRef, ty: TypeHandle) -> ComponentRef {
        self.host.add_component(node, ty).unwrap()
    }

    /// Read a component field by name
    pub fn get(&self, component: &ComponentRef, name: &str) -> Value {
        self.types
            .get_field(&Value::Component(component.clone()), name)
            .unwrap()
    }

    /// Write a component field by name
    pub fn set(&self, component: &ComponentRef, name: &str, value: Value) {
        self.types
            .set_field(&mut Value::Component(component.clone()), name, value)
            .unwrap();
    }

    /// Construct a value of `ty`
    pub fn new_value(&self, ty: TypeHandle) -> Value {
        self.types.construct(ty).unwrap()
    }
}

// ============================================================================
// Animation fixture
// ============================================================================

/// Frame/animation types assembled by composition
pub struct Animation {
    pub frame: TypeHandle,
    pub clip: TypeHandle,
    pub animator: TypeHandle,
}

impl Animation {
    /// Define `Frame`, `Clip` and the `Animator` component
    ///
    /// A clip owns a list of frames and may point at the clip it loops to,
    /// which can be itself. The animator keeps its clips in a private
    /// dictionary opted into capture.
    pub fn define(types: &TypeRegistry) -> Self {
        let events = types.list_of(types.string());
        let frame = types.define(
            TypeDef::class("Frame")
                .field(FieldDef::public("sprite", types.string()))
                .field(FieldDef::public("duration", types.float()))
                .field(FieldDef::public("events", events)),
        );
        let frames = types.list_of(frame);
        let clip = types.define_with(|this| {
            TypeDef::class("Clip")
                .field(FieldDef::public("name", types.string()))
                .field(FieldDef::public("frames", frames))
                .field(FieldDef::public("loop_to", this))
        });
        let clips = types.dictionary_of(types.string(), clip);
        let animator = types.define(
            TypeDef::component("Animator")
                .field(FieldDef::private("clips", clips).serialize_field())
                .field(FieldDef::public("speed", types.float())),
        );
        Self { frame, clip, animator }
    }

    /// A clip of `count` frames that loops onto itself
    pub fn looping_clip(&self, types: &TypeRegistry, name: &str, count: usize) -> Value {
        let clip = types.construct(self.clip).unwrap();
        let mut holder = clip.clone();
        types.set_field(&mut holder, "name", Value::str(name)).unwrap();
        let frames = types.get_field(&clip, "frames").unwrap();
        let frames = match frames {
            Value::Null => {
                let list = types.construct(types.list_of(self.frame)).unwrap();
                types.set_field(&mut holder, "frames", list.clone()).unwrap();
                list
            }
            list => list,
        };
        for index in 0..count {
            let mut frame = types.construct(self.frame).unwrap();
            types
                .set_field(&mut frame, "sprite", Value::str(&format!("{name}_{index}")))
                .unwrap();
            types
                .set_field(&mut frame, "duration", Value::Float(0.1 * (index + 1) as f64))
                .unwrap();
            let events = types.construct(types.list_of(types.string())).unwrap();
            events.as_list().unwrap().push(Value::str("step"));
            types.set_field(&mut frame, "events", events).unwrap();
            frames.as_list().unwrap().push(frame);
        }
        types.set_field(&mut holder, "loop_to", clip.clone()).unwrap();
        clip
    }
}

// ============================================================================
// Lifecycle recorder
// ============================================================================

/// Counts lifecycle callbacks and records a field seen during `awake`
#[derive(Default)]
pub struct Recorder {
    pub awake: AtomicUsize,
    pub on_enable: AtomicUsize,
    pub before_serialize: AtomicUsize,
    pub after_deserialize: AtomicUsize,
    pub seen_on_awake: Mutex<Vec<Value>>,
}

impl Recorder {
    pub fn count(&self, kind: CallbackKind) -> usize {
        let counter = match kind {
            CallbackKind::Awake => &self.awake,
            CallbackKind::OnEnable => &self.on_enable,
            CallbackKind::BeforeSerialize => &self.before_serialize,
            CallbackKind::AfterDeserialize => &self.after_deserialize,
        };
        counter.load(Ordering::SeqCst)
    }

    /// `TypeDef` for a component named `name` wired to this recorder
    ///
    /// `awake` records the value in slot `watch`.
    pub fn component(self: &Arc<Self>, name: &str, watch: usize) -> TypeDef {
        let (a, e, b, d) = (self.clone(), self.clone(), self.clone(), self.clone());
        TypeDef::component(name)
            .on(CallbackKind::Awake, move |component| {
                a.awake.fetch_add(1, Ordering::SeqCst);
                a.seen_on_awake.lock().push(component.get(watch)?);
                Ok(())
            })
            .on(CallbackKind::OnEnable, move |_| {
                e.on_enable.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on(CallbackKind::BeforeSerialize, move |_| {
                b.before_serialize.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on(CallbackKind::AfterDeserialize, move |_| {
                d.after_deserialize.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
    }
}
