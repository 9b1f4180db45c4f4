//! Pairing of clone components with captured states

mod common;

use common::World;
use replica_engine::{FieldDef, NodeRef, TypeDef, TypeHandle, Value};

struct Tagged {
    payload: TypeHandle,
    tagged: TypeHandle,
}

impl Tagged {
    fn define(world: &World, name: &str) -> Self {
        let t = &world.types;
        let payload = t
            .by_name("Payload")
            .unwrap_or_else(|| t.define(TypeDef::class("Payload").field(FieldDef::public("id", t.int()))));
        let tagged = t.define(TypeDef::component(name).field(FieldDef::public("data", payload)));
        Self { payload, tagged }
    }

    fn attach(&self, world: &World, node: &NodeRef, id: i64) {
        let component = world.add(node, self.tagged);
        let data = world.new_value(self.payload);
        data.as_object().unwrap().set(0, Value::Int(id)).unwrap();
        world.set(&component, "data", data);
    }

    fn ids(&self, world: &World, node: &NodeRef) -> Vec<Option<i64>> {
        node.components()
            .iter()
            .filter(|component| component.ty() == self.tagged)
            .map(|component| {
                let data = world.get(component, "data");
                data.as_object().and_then(|object| object.get(0).ok()).and_then(|id| id.as_int())
            })
            .collect()
    }
}

/// A bare node carrying one component per entry of `layout`
fn bare_clone(world: &World, layout: &[TypeHandle]) -> NodeRef {
    let clone = NodeRef::new("clone");
    for &ty in layout {
        clone.add_component(&world.types, ty).unwrap();
    }
    clone
}

#[test]
fn test_same_type_components_pair_in_order() {
    let world = World::new();
    let tagged = Tagged::define(&world, "Tagged");
    let root = NodeRef::new("root");
    for id in 1..=3 {
        tagged.attach(&world, &root, id);
    }

    let clone = world.instantiate(&root);
    assert_eq!(tagged.ids(&world, &clone), vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn test_extra_clone_component_stays_unpaired() {
    let world = World::new();
    let tagged = Tagged::define(&world, "Tagged");
    let root = NodeRef::new("root");
    for id in 1..=3 {
        tagged.attach(&world, &root, id);
    }

    let mut context = world.engine.begin_capture(&root).unwrap();
    let clone = bare_clone(&world, &[tagged.tagged; 4]);
    let summary = world.engine.restore(&mut context, &clone).unwrap();
    world.engine.finish(context);

    assert_eq!((summary.paired, summary.unpaired), (3, 1));
    assert_eq!(tagged.ids(&world, &clone), vec![Some(1), Some(2), Some(3), None]);
}

#[test]
fn test_missing_clone_components_drop_trailing_states() {
    let world = World::new();
    let tagged = Tagged::define(&world, "Tagged");
    let root = NodeRef::new("root");
    for id in 1..=3 {
        tagged.attach(&world, &root, id);
    }

    let mut context = world.engine.begin_capture(&root).unwrap();
    let clone = bare_clone(&world, &[tagged.tagged; 2]);
    let summary = world.engine.restore(&mut context, &clone).unwrap();
    world.engine.finish(context);

    assert_eq!((summary.paired, summary.unpaired), (2, 0));
    assert_eq!(tagged.ids(&world, &clone), vec![Some(1), Some(2)]);
}

#[test]
fn test_interleaved_types_pair_by_occurrence() {
    let world = World::new();
    let a = Tagged::define(&world, "A");
    let b = Tagged::define(&world, "B");
    let root = NodeRef::new("root");
    a.attach(&world, &root, 1);
    b.attach(&world, &root, 10);
    a.attach(&world, &root, 2);

    let mut context = world.engine.begin_capture(&root).unwrap();
    let clone = bare_clone(&world, &[b.tagged, a.tagged, a.tagged]);
    let summary = world.engine.restore(&mut context, &clone).unwrap();
    world.engine.finish(context);

    assert_eq!(summary.paired, 3);
    assert_eq!(a.ids(&world, &clone), vec![Some(1), Some(2)]);
    assert_eq!(b.ids(&world, &clone), vec![Some(10)]);
}

#[test]
fn test_topology_drift_skips_unmatched_nodes() {
    let world = World::new();
    let tagged = Tagged::define(&world, "Tagged");
    let root = NodeRef::new("root");
    let left = root.create_child("left");
    tagged.attach(&world, &root, 1);
    tagged.attach(&world, &left, 2);

    let mut context = world.engine.begin_capture(&root).unwrap();
    let clone = bare_clone(&world, &[tagged.tagged]);
    let clone_left = clone.create_child("left");
    clone_left.add_component(&world.types, tagged.tagged).unwrap();
    let extra = clone.create_child("extra");
    extra.add_component(&world.types, tagged.tagged).unwrap();
    let summary = world.engine.restore(&mut context, &clone).unwrap();
    world.engine.finish(context);

    assert_eq!((summary.paired, summary.unpaired), (2, 1));
    assert_eq!(tagged.ids(&world, &clone), vec![Some(1)]);
    assert_eq!(tagged.ids(&world, &clone_left), vec![Some(2)]);
    assert_eq!(tagged.ids(&world, &extra), vec![None]);
}

#[test]
fn test_restored_values_are_copies() {
    let world = World::new();
    let tagged = Tagged::define(&world, "Tagged");
    let root = NodeRef::new("root");
    tagged.attach(&world, &root, 5);
    let source = world.get(&root.components()[0], "data");

    let clone = world.instantiate(&root);
    let copy = world.get(&clone.components()[0], "data");
    assert!(copy.structurally_eq(&source));
    assert!(!copy.same_ref(&source));

    source.as_object().unwrap().set(0, Value::Int(6)).unwrap();
    assert_eq!(copy.as_object().unwrap().get(0).unwrap().as_int(), Some(5));
}

#[test]
fn test_wide_and_deep_positions_keep_their_states() {
    let world = World::new();
    let tagged = Tagged::define(&world, "Tagged");
    let root = NodeRef::new("root");
    let children: Vec<_> = (0..30).map(|i| root.create_child(&format!("child_{i}"))).collect();
    let grand = children[0].create_child("grand");
    tagged.attach(&world, &children[29], 29);
    tagged.attach(&world, &grand, 100);

    let clone = world.instantiate(&root);
    let clone_children = clone.children();
    assert_eq!(clone_children.len(), 30);
    assert_eq!(tagged.ids(&world, &clone_children[29]), vec![Some(29)]);
    assert_eq!(tagged.ids(&world, &clone_children[0].children()[0]), vec![Some(100)]);
    assert!(tagged.ids(&world, &clone_children[0]).is_empty());
}
