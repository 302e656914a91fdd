use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use skimflow_columnar::{
    ColumnSchema, ColumnarError, ColumnarResult, FilterExpr, RowView, ScalarExpr, Schema,
    TableBuilder, TableId, TableStore, Value,
};
use skimflow_pipeline::{
    FnConsumer, FnTransform, HistogramSink, NullSink, Pipeline, PipelineError, RecordingSink,
    Stage, StageReport,
};

fn store_with_tracks(pts: &[f64]) -> TableStore {
    let collisions = Schema::new("Collisions", vec![ColumnSchema::float("pos_z")]).unwrap();
    let tracks = Schema::new(
        "Tracks",
        vec![
            ColumnSchema::index("collision_id", "Collisions"),
            ColumnSchema::float("pt"),
        ],
    )
    .unwrap();

    let mut store = TableStore::new();
    store
        .insert(
            TableBuilder::build_from_rows(
                collisions,
                [vec![Value::Float(-1.5)], vec![Value::Float(2.5)]],
            )
            .unwrap(),
        )
        .unwrap();
    store
        .insert(
            TableBuilder::build_from_rows(
                tracks,
                pts.iter()
                    .enumerate()
                    .map(|(i, &pt)| vec![Value::Int((i % 2) as i64), Value::Float(pt)]),
            )
            .unwrap(),
        )
        .unwrap();
    store
}

fn skim_schema() -> Schema {
    Schema::new(
        "Skim",
        vec![
            ColumnSchema::float("pt"),
            ColumnSchema::float("pos_z"),
            ColumnSchema::index("collision_id", "Collisions"),
        ],
    )
    .unwrap()
}

fn skim_stage(calls: Arc<AtomicUsize>) -> Stage {
    let transform = FnTransform::new(skim_schema(), move |row, store| {
        calls.fetch_add(1, Ordering::SeqCst);
        let collision = row.follow("collision_id", store)?;
        Ok(vec![
            Value::Float(row.f64("pt")?),
            Value::Float(collision.f64("pos_z")?),
            Value::Int(collision.position() as i64),
        ])
    });
    Stage::produce("skim", "Tracks", transform)
        .filter(ScalarExpr::col("pt").gt(4.0))
        .reads("Collisions")
}

fn histogram_stage(name: &'static str) -> Stage {
    Stage::consume(
        "fill",
        "Skim",
        FnConsumer::new(move |row, _store, sink| {
            sink.fill(name, row.f64("pt")?);
            Ok(())
        }),
    )
}

#[test]
fn filter_runs_before_transform() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(calls.clone()))
        .build()
        .unwrap();

    let mut store = store_with_tracks(&[1.0, 5.0, 9.0]);
    let report = pipeline.run(&mut store, &mut NullSink).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        report.stages,
        vec![StageReport {
            stage: "skim".to_owned(),
            input: TableId::from("Tracks"),
            input_rows: 3,
            selected_rows: 2,
            output: Some(TableId::from("Skim")),
            output_rows: 2,
        }]
    );

    let skim = store.get("Skim").unwrap();
    assert_eq!(skim.row_count(), 2);
    assert_eq!(
        skim.row_values(0).unwrap(),
        vec![Value::Float(5.0), Value::Float(2.5), Value::Int(1)]
    );
    assert_eq!(
        skim.row_values(1).unwrap(),
        vec![Value::Float(9.0), Value::Float(-1.5), Value::Int(0)]
    );
}

#[test]
fn runs_are_idempotent() {
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap();

    let raw = store_with_tracks(&[0.5, 4.5, 7.0, f64::NAN, 12.0, 3.9]);
    let mut first = raw.clone();
    let mut second = raw.clone();
    let first_report = pipeline.run(&mut first, &mut NullSink).unwrap();
    let second_report = pipeline.run(&mut second, &mut NullSink).unwrap();

    assert_eq!(first_report, second_report);
    assert_eq!(first.get("Skim").unwrap(), second.get("Skim").unwrap());
    assert!(!raw.contains("Skim"));
}

#[test]
fn running_again_on_the_same_store_is_rejected_up_front() {
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap();

    let mut store = store_with_tracks(&[5.0]);
    pipeline.run(&mut store, &mut NullSink).unwrap();
    let err = pipeline.run(&mut store, &mut NullSink).unwrap_err();
    assert_eq!(
        err.columnar(),
        Some(&ColumnarError::DuplicateTable {
            table: TableId::from("Skim")
        })
    );
}

#[test]
fn duplicate_producers_fail_at_build_time() {
    let err = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::DuplicateTable {
            table: TableId::from("Skim"),
            stage: "skim".to_owned(),
        }
    );

    let shadowing = FnTransform::new(
        Schema::new("Tracks", vec![ColumnSchema::float("pt")]).unwrap(),
        |row, _store| Ok(vec![Value::Float(row.f64("pt")?)]),
    );
    let err = Pipeline::builder()
        .source("Tracks")
        .stage(Stage::produce("shadow", "Tracks", shadowing))
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateTable { .. }));
}

#[test]
fn inputs_must_come_from_sources_or_earlier_stages() {
    // Consumer declared before its producer.
    let err = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(histogram_stage("hPt"))
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::UnknownTable {
            table: TableId::from("Skim"),
            stage: "fill".to_owned(),
        }
    );

    // Undeclared reference target.
    let err = Pipeline::builder()
        .source("Tracks")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::UnknownTable { ref table, .. } if table.as_str() == "Collisions"
    ));
}

#[test]
fn repeated_terminal_stages_each_run() {
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .stage(histogram_stage("hPt"))
        .stage(histogram_stage("hPt"))
        .build()
        .unwrap();

    let mut store = store_with_tracks(&[1.0, 5.0, 9.0]);
    let mut sink = RecordingSink::new();
    let report = pipeline.run(&mut store, &mut sink).unwrap();

    assert_eq!(report.stages.len(), 3);
    assert_eq!(sink.values("hPt"), &[5.0, 9.0, 5.0, 9.0]);
    assert_eq!(report.outputs().collect::<Vec<_>>(), vec![&TableId::from("Skim")]);
}

#[test]
fn missing_source_is_reported_before_any_stage_runs() {
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap();

    let mut store = TableStore::new();
    let err = pipeline.run(&mut store, &mut NullSink).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSource { .. }));
    assert!(store.is_empty());
}

#[test]
fn outputs_of_earlier_stages_survive_a_failure() {
    let broken = FnTransform::new(
        Schema::new("Broken", vec![ColumnSchema::float("x")]).unwrap(),
        |row, store| {
            // Collision index 7 does not exist.
            let missing = skimflow_columnar::RowRef {
                table: TableId::from("Collisions"),
                row: 7,
            };
            let collision = store.resolve(&missing)?;
            Ok(vec![Value::Float(row.f64("pt")? + collision.f64("pos_z")?)])
        },
    );
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .stage(Stage::produce("broken", "Skim", broken).reads("Collisions"))
        .build()
        .unwrap();

    let mut store = store_with_tracks(&[5.0, 9.0]);
    let err = pipeline.run(&mut store, &mut NullSink).unwrap_err();

    assert_eq!(
        err,
        PipelineError::Stage {
            stage: "broken".to_owned(),
            source: ColumnarError::DanglingReference {
                table: TableId::from("Collisions"),
                row: 7,
                row_count: 2,
            },
        }
    );
    assert!(store.contains("Skim"));
    assert!(!store.contains("Broken"));
}

#[test]
fn undeclared_reference_is_not_visible_at_run_time() {
    let sneaky = FnTransform::new(skim_schema(), |row, store| {
        let collision = row.follow("collision_id", store)?;
        Ok(vec![
            Value::Float(row.f64("pt")?),
            Value::Float(collision.f64("pos_z")?),
            Value::Int(collision.position() as i64),
        ])
    });
    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(Stage::produce("skim", "Tracks", sneaky))
        .build()
        .unwrap();

    let mut store = store_with_tracks(&[5.0]);
    assert_eq!(
        pipeline.run(&mut store, &mut NullSink).unwrap_err(),
        PipelineError::Stage {
            stage: "skim".to_owned(),
            source: ColumnarError::UnknownTable {
                table: TableId::from("Collisions"),
            },
        }
    );
    assert!(!store.contains("Skim"));
}

#[test]
fn dangling_index_aborts_the_stage() {
    let schema = Schema::new(
        "Tracks",
        vec![
            ColumnSchema::index("collision_id", "Collisions"),
            ColumnSchema::float("pt"),
        ],
    )
    .unwrap();
    let mut store = store_with_tracks(&[]);
    let mut rebuilt = TableStore::new();
    rebuilt
        .insert(store.get("Collisions").unwrap().clone())
        .unwrap();
    rebuilt
        .insert(
            TableBuilder::build_from_rows(
                schema,
                [
                    vec![Value::Int(0), Value::Float(6.0)],
                    vec![Value::Int(-3), Value::Float(7.0)],
                ],
            )
            .unwrap(),
        )
        .unwrap();
    store = rebuilt;

    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .build()
        .unwrap();
    let err = pipeline.run(&mut store, &mut NullSink).unwrap_err();
    assert!(matches!(
        err.columnar(),
        Some(ColumnarError::DanglingReference { row: -3, .. })
    ));
    assert!(!store.contains("Skim"));
}

#[test]
fn filters_combine_in_declaration_order() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let stage = Stage::consume(
        "count",
        "Tracks",
        FnConsumer::new(|_row, _store, _sink| Ok(())),
    )
    .filter(ScalarExpr::col("pt").gt(4.0))
    .filter(move |row: &RowView<'_>| -> ColumnarResult<bool> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(row.f64("pt")? < 9.0)
    })
    .filter(FilterExpr::is_null("pt").or(ScalarExpr::col("pt").gt(0.0)));

    let pipeline = Pipeline::builder().source("Tracks").stage(stage).build().unwrap();
    let mut store = store_with_tracks(&[1.0, 5.0, 9.0, 2.0]);
    let report = pipeline.run(&mut store, &mut NullSink).unwrap();

    // Only rows passing the first filter reach the second.
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(report.stage("count").map(|s| s.selected_rows), Some(1));
}

#[test]
fn sink_is_a_trait_object() {
    struct Sum(f64);
    impl HistogramSink for Sum {
        fn fill(&mut self, _name: &str, value: f64) {
            self.0 += value;
        }
    }

    let pipeline = Pipeline::builder()
        .source("Tracks")
        .source("Collisions")
        .stage(skim_stage(Arc::new(AtomicUsize::new(0))))
        .stage(histogram_stage("hPt"))
        .build()
        .unwrap();
    let mut store = store_with_tracks(&[1.0, 5.0, 9.0]);
    let mut sum = Sum(0.0);
    pipeline.run(&mut store, &mut sum).unwrap();
    assert_eq!(sum.0, 14.0);
}

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;
    use skimflow_columnar::FilteredView;
    use skimflow_pipeline::{materialize, RowTransform};

    const ROWS: usize = 4_096;

    fn many_tracks() -> TableStore {
        let pts: Vec<f64> = (0..ROWS).map(|i| (i % 10) as f64 + 0.25).collect();
        store_with_tracks(&pts)
    }

    #[test]
    fn parallel_materialize_matches_sequential_order() {
        let store = many_tracks();
        let tracks = store.get("Tracks").unwrap();
        let view = FilteredView::new(tracks, &ScalarExpr::col("pt").gt(4.0)).unwrap();
        assert!(view.len() >= 1_024);

        let transform = FnTransform::new(skim_schema(), |row, store| {
            let collision = row.follow("collision_id", store)?;
            Ok(vec![
                Value::Float(row.f64("pt")?),
                Value::Float(collision.f64("pos_z")?),
                Value::Int(collision.position() as i64),
            ])
        });
        let out = materialize(&view, &transform, &store).unwrap();

        let mut sequential = TableBuilder::new(skim_schema());
        for row in view.iter() {
            sequential
                .append(&transform.compute_row(&row, &store).unwrap())
                .unwrap();
        }
        assert_eq!(*out, *sequential.finalize().unwrap());
        assert_eq!(out.row_count(), view.len());
    }

    #[test]
    fn parallel_materialize_reports_first_failure_in_view_order() {
        let store = many_tracks();
        let tracks = store.get("Tracks").unwrap();
        let view = FilteredView::all(tracks);

        // Rows 1_500 and 3_000 both fail; the earlier one must win whatever the scheduling.
        let transform = FnTransform::new(skim_schema(), |row, _store| {
            if row.position() == 1_500 || row.position() == 3_000 {
                return Err(ColumnarError::Eval(format!("bad row {}", row.position())));
            }
            Ok(vec![
                Value::Float(row.f64("pt")?),
                Value::Float(0.0),
                Value::Int(0),
            ])
        });
        for _ in 0..8 {
            assert_eq!(
                materialize(&view, &transform, &store).unwrap_err(),
                ColumnarError::Eval("bad row 1500".to_owned())
            );
        }
    }
}
