//! Benchmarks for the pattern compiler and the clone engine.
//!
//! These establish baselines for the three costs that dominate real usage:
//! pattern compilation (amortized away by the process-wide cache), the
//! repetition fixed point over deep chains, and filter-driven deep cloning
//! of wide graphs.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use marcotte::prelude::*;

/// A singly linked chain of `len` units.
fn chain_registry(len: u64) -> (Registry, NodeId) {
    let mut registry = Registry::new();
    registry.register(Metadata::new("unit").scalar("name").relation("next"));
    let nodes: Vec<NodeId> = (0..len)
        .map(|i| {
            let node = registry.create("unit");
            registry.put(node, "name", Value::text(format!("u{}", i)));
            node
        })
        .collect();
    for pair in nodes.windows(2) {
        registry.put(pair[0], "next", Value::Node(pair[1]));
    }
    (registry, nodes[0])
}

/// A company with `departments` departments of `employees` employees each.
fn company_registry(departments: u64, employees: u64) -> (Registry, NodeId) {
    let mut registry = Registry::new();
    registry.register(
        Metadata::new("company")
            .scalar("name")
            .owned_relation("departments", "company"),
    );
    registry.register(
        Metadata::new("department")
            .scalar("name")
            .owned_relation("employees", "department"),
    );
    registry.register(Metadata::new("employee").scalar("name"));

    let company = registry.create("company");
    registry.put(company, "name", Value::text("acme"));
    let mut department_refs = Vec::with_capacity(departments as usize);
    for d in 0..departments {
        let department = registry.create("department");
        registry.put(department, "name", Value::text(format!("d{}", d)));
        let mut employee_refs = Vec::with_capacity(employees as usize);
        for e in 0..employees {
            let employee = registry.create("employee");
            registry.put(employee, "name", Value::text(format!("e{}_{}", d, e)));
            employee_refs.push(Value::Node(employee));
        }
        registry.put(department, "employees", Value::Set(employee_refs));
        department_refs.push(Value::Node(department));
    }
    registry.put(company, "departments", Value::Seq(department_refs));
    (registry, company)
}

/// Measures raw pattern compilation, bypassing the cache.
fn bench_pattern_compile(c: &mut Criterion) {
    c.bench_function("pattern_compile", |b| {
        b.iter(|| {
            marcotte::pattern::compile(black_box("department+.(boss|employees).address.(country|city|street)"))
                .expect("pattern compiles")
        });
    });
}

/// Measures the repetition fixed point over a 1000-element chain.
///
/// Every round explores only the previous round's fresh nodes, so the work
/// is linear in chain length; this catches regressions to quadratic.
fn bench_repetition_chain_1k(c: &mut Criterion) {
    c.bench_function("repetition_chain_1k", |b| {
        b.iter_batched(
            || chain_registry(1000),
            |(mut registry, head)| {
                clone_node(black_box(&mut registry), head, &["next+"]).expect("clones")
            },
            BatchSize::SmallInput,
        );
    });
}

/// Measures filter-driven deep cloning of a 50x20 company tree.
fn bench_deep_clone_wide(c: &mut Criterion) {
    c.bench_function("deep_clone_wide_50x20", |b| {
        b.iter_batched(
            || company_registry(50, 20),
            |(mut registry, company)| {
                deep_clone_node(black_box(&mut registry), company, AllowAll).expect("clones")
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_pattern_compile,
    bench_repetition_chain_1k,
    bench_deep_clone_wide
);
criterion_main!(benches);
