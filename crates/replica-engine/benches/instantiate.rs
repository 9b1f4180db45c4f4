use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use replica_engine::{EngineContext, EngineOptions, FieldDef, Host, NodeRef, TypeDef, TypeHandle, TypeRegistry, Value};

struct Fixture {
    host: Host,
    root: NodeRef,
}

/// Returns the `Stats`, `Dictionary<string, Stats>` and `Inventory` handles
fn inventory_types(types: &TypeRegistry) -> (TypeHandle, TypeHandle, TypeHandle) {
    let tags = types.list_of(types.string());
    let stats = types.define(
        TypeDef::class("Stats")
            .field(FieldDef::public("hp", types.int()))
            .field(FieldDef::public("tags", tags)),
    );
    let items = types.dictionary_of(types.string(), stats);
    let inventory = types.define(
        TypeDef::component("Inventory")
            .field(FieldDef::private("items", items).serialize_field())
            .field(FieldDef::public("count", types.int())),
    );
    (stats, items, inventory)
}

fn fixture(children: usize, items: usize, engine: bool) -> Fixture {
    let host = Host::new();
    let types = host.types().clone();
    let (stats_type, items_type, inventory) = inventory_types(&types);
    if engine {
        let context = Arc::new(EngineContext::new(types.clone(), EngineOptions::default()));
        context.install(&host);
    }

    let root = NodeRef::new("root");
    for index in 0..children {
        let child = root.create_child(&format!("child_{index}"));
        let component = host.add_component(&child, inventory).unwrap();
        let mut holder = Value::Component(component);
        let dict = types.construct(items_type).unwrap();
        for item in 0..items {
            let mut stats = types.construct(stats_type).unwrap();
            types.set_field(&mut stats, "hp", Value::Int(item as i64)).unwrap();
            dict.as_dict()
                .unwrap()
                .insert(Value::str(&format!("item_{item}")), stats)
                .unwrap();
        }
        types.set_field(&mut holder, "items", dict).unwrap();
        types.set_field(&mut holder, "count", Value::Int(items as i64)).unwrap();
    }
    Fixture { host, root }
}

fn bench_instantiate(c: &mut Criterion) {
    let mut group = c.benchmark_group("instantiate");

    for &(children, items) in &[(1, 8), (16, 8), (64, 32)] {
        let label = format!("{children}x{items}");

        let native = fixture(children, items, false);
        group.bench_with_input(BenchmarkId::new("native", &label), &native, |b, fixture| {
            b.iter(|| fixture.host.instantiate(black_box(&Value::Node(fixture.root.clone()))).unwrap());
        });

        let extended = fixture(children, items, true);
        group.bench_with_input(BenchmarkId::new("engine", &label), &extended, |b, fixture| {
            b.iter(|| fixture.host.instantiate(black_box(&Value::Node(fixture.root.clone()))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_instantiate);
criterion_main!(benches);
