use promptore::{
    config::Settings,
    nlp::embeddings::{load_embedder, HashingEmbedder, MaskEmbedder},
    ModelFamily, PromptOreError,
};

fn prompts() -> Vec<String> {
    vec![
        "[CLS] Juan visitó Madrid. Juan [MASK] Madrid. [SEP]".to_string(),
        "[CLS] Ana y Luis. La relación entre Ana y Luis es de carácter [MASK] [SEP]".to_string(),
        "[CLS] Juan visitó Madrid. Juan [MASK] Madrid. [SEP]".to_string(),
    ]
}

#[test]
fn hashing_embedder_returns_one_prediction_per_prompt() {
    let embedder = HashingEmbedder::new(ModelFamily::Bert, 64).unwrap();
    let predictions = embedder.embed(&prompts(), 2).unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0], predictions[2]);
    assert_ne!(predictions[0].embedding, predictions[1].embedding);
    assert_eq!(
        predictions[0].predicted_phrase,
        "Juan visitó Madrid. Juan [MASK] Madrid."
    );
    assert!(predictions.iter().all(|p| p.embedding.len() == 64));
}

#[test]
fn zero_batch_size_is_rejected() {
    let embedder = HashingEmbedder::new(ModelFamily::Bert, 8).unwrap();
    assert!(matches!(
        embedder.embed(&prompts(), 0),
        Err(PromptOreError::Configuration(_))
    ));
}

#[test]
fn loader_falls_back_to_hashing_without_a_model() {
    let settings = Settings::default();
    let embedder = load_embedder(&settings, None, ModelFamily::Roberta).unwrap();
    assert_eq!(embedder.family(), ModelFamily::Roberta);
    let predictions = embedder
        .embed(&["<s> hola <mask>. </s>".to_string()], 1)
        .unwrap();
    assert_eq!(predictions[0].embedding.len(), settings.embedding_dim);
    assert!(predictions[0].candidates.is_empty());
}
