//! End-to-end scoring through the real LSTM fixture artifact.

use eventsentry::config::Config;
use eventsentry::detect::{ErrorClass, PipelineError, PipelineInput, PredictRequest};
use eventsentry::model::{load_artifact, ReconstructionModel};
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/autoencoder_tiny.json")
}

fn pipeline() -> eventsentry::detect::Pipeline {
    let mut config = Config::default();
    config.model.path = fixture();
    eventsentry::build_pipeline(&config).unwrap()
}

#[test]
fn test_fixture_declares_six_timesteps() {
    let model = load_artifact(&fixture(), Some(6)).unwrap();
    assert_eq!(model.timesteps(), 6);
}

#[tokio::test]
async fn test_full_sequence_scores() {
    let p = pipeline();
    let det = p
        .handle(PredictRequest::from_sequence(&[10, 25, 10, 3, 18, 5]))
        .await
        .unwrap();
    assert!(det.reconstruction_error.is_finite());
    assert!(det.reconstruction_error >= 0.0);
    assert_eq!(det.is_anomaly, det.reconstruction_error > 0.015);
    assert!(det.extracted_sequence.is_none());
}

#[tokio::test]
async fn test_short_sequence_pads_to_model_length() {
    let p = pipeline();
    let prepared = p.prepare(PipelineInput::Sequence(vec![10, 25])).unwrap();
    assert_eq!(prepared.normalized.as_slice(), &[10, 25, 0, 0, 0, 0]);
    assert!(p.analyze(PipelineInput::Sequence(vec![10, 25])).await.is_ok());
}

#[tokio::test]
async fn test_windows_log_text() {
    let p = pipeline();
    let det = p
        .handle(PredictRequest::from_log_text(
            "Information   8/13/2025 1:25:51 PM    Netwtw14    7021    None",
        ))
        .await
        .unwrap();
    assert_eq!(det.extracted_sequence, Some(vec![7021]));
}

#[tokio::test]
async fn test_user_errors() {
    let p = pipeline();
    let err = p
        .handle(PredictRequest::from_log_text("no timestamps here"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoEventIds));
    assert_eq!(err.class(), ErrorClass::UserInput);

    let err = p.handle(PredictRequest::default()).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingInput));
}

#[tokio::test]
async fn test_scores_are_deterministic_under_concurrency() {
    let p = std::sync::Arc::new(pipeline());
    let mut handles = Vec::new();
    for _ in 0..16 {
        let p = p.clone();
        handles.push(tokio::spawn(async move {
            p.analyze(PipelineInput::Sequence(vec![3, 1, 4, 1, 5, 9, 2, 6]))
                .await
                .unwrap()
                .reconstruction_error
        }));
    }
    let mut errors = Vec::new();
    for h in handles {
        errors.push(h.await.unwrap());
    }
    assert!(errors.windows(2).all(|w| w[0] == w[1]));
}
