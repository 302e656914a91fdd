use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skimflow_columnar::{
    ColumnSchema, FilteredView, ScalarExpr, Schema, TableBuilder, TableStore, Value,
};
use skimflow_pipeline::{FnTransform, NullSink, Pipeline, Stage};

fn bench_rows() -> usize {
    std::env::var("SKIMFLOW_PRODUCE_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| (10_000..=5_000_000).contains(&v))
        .unwrap_or(200_000)
}

fn build_store(rows: usize) -> TableStore {
    let schema = Schema::new(
        "Candidates",
        vec![ColumnSchema::float("px"), ColumnSchema::float("py")],
    )
    .unwrap();
    let mut builder = TableBuilder::with_capacity(schema, rows);
    for i in 0..rows {
        // Cheap deterministic spread over roughly [-10, 10).
        let px = ((i * 7_919) % 2_000) as f64 / 100.0 - 10.0;
        let py = ((i * 104_729) % 2_000) as f64 / 100.0 - 10.0;
        builder
            .append(&[Value::Float(px), Value::Float(py)])
            .unwrap();
    }
    let mut store = TableStore::new();
    store.insert(builder.finalize().unwrap()).unwrap();
    store
}

fn pt_expr() -> ScalarExpr {
    (ScalarExpr::col("px") * ScalarExpr::col("px") + ScalarExpr::col("py") * ScalarExpr::col("py"))
        .sqrt()
}

fn bench_filter(c: &mut Criterion) {
    let rows = bench_rows();
    let store = build_store(rows);
    let table = store.get("Candidates").unwrap().clone();

    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Elements(rows as u64));
    for pt_min in [1.0, 4.0, 9.0] {
        let predicate = pt_expr().gt(pt_min);
        group.bench_with_input(BenchmarkId::new("pt_gt", pt_min), &predicate, |b, p| {
            b.iter(|| black_box(FilteredView::new(&table, p).unwrap().len()))
        });
    }
    group.finish();
}

fn bench_produce(c: &mut Criterion) {
    let rows = bench_rows();
    let store = build_store(rows);

    let schema = Schema::new(
        "Derived",
        vec![ColumnSchema::float("pt"), ColumnSchema::float("phi")],
    )
    .unwrap();
    let transform = FnTransform::new(schema, |row, _store| {
        let (px, py) = (row.f64("px")?, row.f64("py")?);
        Ok(vec![Value::Float(px.hypot(py)), Value::Float(py.atan2(px))])
    });
    let pipeline = Pipeline::builder()
        .source("Candidates")
        .stage(Stage::produce("derive", "Candidates", transform).filter(pt_expr().gt(4.0)))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("produce");
    group.throughput(Throughput::Elements(rows as u64));
    group.bench_function("filter_then_derive", |b| {
        b.iter(|| {
            let mut run_store = store.clone();
            let report = pipeline.run(&mut run_store, &mut NullSink).unwrap();
            black_box(report.stages[0].output_rows)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_filter, bench_produce);
criterion_main!(benches);
