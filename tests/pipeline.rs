use std::{fs, path::Path, sync::Arc};

use promptore::{
    config::Settings,
    nlp::embeddings::HashingEmbedder,
    pipeline::{
        batch::{self, BatchJob},
        ClusteringMode, OutputShape, Pipeline, PipelineOptions, PipelineOutcome,
    },
    ModelFamily, PromptOreError, PromptSet,
};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample_tei.xml");

fn pipeline(clustering: ClusteringMode, output: OutputShape) -> Pipeline {
    let embedder = HashingEmbedder::new(ModelFamily::Bert, 32).unwrap();
    let options = PipelineOptions {
        clustering,
        output,
        ..PipelineOptions::from_settings(&Settings::default())
    };
    Pipeline::new(Arc::new(embedder), options)
}

#[test]
fn fixed_k_run_writes_one_row_per_mask() {
    let outcome = pipeline(ClusteringMode::FixedK(3), OutputShape::WithoutEmbeddings)
        .run(Some(Path::new(FIXTURE)))
        .unwrap();
    let PipelineOutcome::Clustered(table) = outcome else {
        panic!("expected a clustered table");
    };
    assert_eq!(table.len(), 33);
    assert!(table.rows().iter().all(|row| row.predicted_label < 3));
    assert!(table.rows().iter().all(|row| row.mask_embedding.is_none()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bert_clustering.csv");
    table.write_csv(&path).unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["predicted_token_candidates", "predicted_phrase", "predicted_label"]
    );
    assert_eq!(reader.records().count(), 33);
}

#[test]
fn elbow_mode_defers_the_choice_of_k() {
    let outcome = pipeline(ClusteringMode::ElbowThenPrompt(4), OutputShape::WithEmbeddings)
        .run(Some(Path::new(FIXTURE)))
        .unwrap();
    let PipelineOutcome::AwaitingK { run, elbow } = outcome else {
        panic!("expected elbow diagnostics");
    };
    assert_eq!(elbow.iter().map(|p| p.k).collect::<Vec<_>>(), vec![1, 2, 3]);

    let table = run.cluster_with_k(2, OutputShape::WithEmbeddings).unwrap();
    assert_eq!(table.len(), run.len());
    assert!(table
        .rows()
        .iter()
        .all(|row| row.mask_embedding.as_ref().map(Vec::len) == Some(32)));
}

#[test]
fn missing_document_path_is_input_required() {
    let err = pipeline(ClusteringMode::FixedK(2), OutputShape::WithoutEmbeddings)
        .prepare(None)
        .unwrap_err();
    assert!(matches!(err, PromptOreError::InputRequired("document path")));
}

#[test]
fn snapshot_is_written_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("prompts.json");
    let embedder = HashingEmbedder::new(ModelFamily::Roberta, 16).unwrap();
    let options = PipelineOptions {
        snapshot: Some(snapshot.clone()),
        ..PipelineOptions::from_settings(&Settings::default())
    };
    let run = Pipeline::new(Arc::new(embedder), options)
        .prepare(Some(Path::new(FIXTURE)))
        .unwrap();

    let saved = PromptSet::load(&snapshot).unwrap();
    assert_eq!(saved, run.prompts);
    assert!(saved.flatten().iter().all(|p| p.starts_with("<s> ")));
}

#[cfg(not(feature = "onx"))]
#[tokio::test]
async fn batch_runs_every_discovered_model() {
    let models = tempfile::tempdir().unwrap();
    for name in ["beto", "roberta-base", "__pycache__"] {
        fs::create_dir(models.path().join(name)).unwrap();
    }
    let output = tempfile::tempdir().unwrap();
    let output_dir = output.path().join("results");
    let settings = Settings::default();

    let summary = batch::run_models(
        &settings,
        BatchJob {
            document: Some(FIXTURE.into()),
            models_dir: models.path().to_path_buf(),
            output_dir: output_dir.clone(),
            family: ModelFamily::Bert,
            clusters: 4,
            options: PipelineOptions::from_settings(&settings),
        },
    )
    .await
    .unwrap();

    assert!(summary.failed.is_empty());
    assert_eq!(
        summary.completed,
        vec![
            output_dir.join("beto_clustering.csv"),
            output_dir.join("roberta-base_clustering.csv"),
        ]
    );
    assert!(summary.completed.iter().all(|path| fs::metadata(path).is_ok()));
}

#[tokio::test]
async fn batch_failures_do_not_abort_other_models() {
    let models = tempfile::tempdir().unwrap();
    fs::create_dir(models.path().join("tiny")).unwrap();
    let output = tempfile::tempdir().unwrap();
    let settings = Settings::default();

    // More clusters than masks fails every model but still yields a summary.
    let summary = batch::run_models(
        &settings,
        BatchJob {
            document: Some(FIXTURE.into()),
            models_dir: models.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            family: ModelFamily::Bert,
            clusters: 1000,
            options: PipelineOptions::from_settings(&settings),
        },
    )
    .await
    .unwrap();
    assert!(summary.completed.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].model, "tiny");
}
