//! Benchmark for namespace resolution hot paths.

use std::fs::{self, File};
use std::hint::black_box;
use std::io::Write;

use criterion::{criterion_group, criterion_main, Criterion};
use nestload::{open_package, LayoutConvention, NamespacePath, NamespaceRef};

fn benchmark_relative_resolve(c: &mut Criterion) {
    let caller: NamespacePath = "App.Sub.Deep.Leaf".parse().unwrap();
    let reference: NamespaceRef = "..Other.Tools".parse().unwrap();

    c.bench_function("resolve ..Other.Tools from App.Sub.Deep.Leaf", |b| {
        b.iter(|| black_box(reference.resolve(black_box(&caller)).unwrap()));
    });
}

fn benchmark_parse_path(c: &mut Criterion) {
    c.bench_function("parse App.Sub.Deep.Leaf", |b| {
        b.iter(|| black_box("App.Sub.Deep.Leaf".parse::<NamespacePath>().unwrap()));
    });
}

fn benchmark_already_loaded(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("Sub")).unwrap();
    let root = src.join("App.ns");
    File::create(&root)
        .unwrap()
        .write_all(b"module App\nend\n")
        .unwrap();
    File::create(src.join("Sub").join("Sub.ns"))
        .unwrap()
        .write_all(b"module Sub\nend\n")
        .unwrap();
    File::create(src.join("Sub").join("Helper.ns"))
        .unwrap()
        .write_all(b"module Helper\nend\n")
        .unwrap();

    let (mut session, mut host) = open_package(&root, LayoutConvention::default()).unwrap();
    let caller = session.root().clone();
    let reference: NamespaceRef = "App.Sub.Helper".parse().unwrap();

    c.bench_function("ensure_loaded no-op App.Sub.Helper", |b| {
        b.iter(|| {
            black_box(
                session
                    .ensure_loaded(&mut host, &reference, &caller)
                    .unwrap(),
            )
        });
    });
}

criterion_group!(
    benches,
    benchmark_relative_resolve,
    benchmark_parse_path,
    benchmark_already_loaded
);
criterion_main!(benches);
